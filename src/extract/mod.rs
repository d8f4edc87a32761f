//! Extraction stage: workbook sheets to validated staging record-sets

pub mod workbook;

use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::area::DataArea;
use crate::error::Result;
use crate::parser::{date_from_serial, format_number, is_missing, parse_date, RecordSet, ISO_DATE};
use crate::schema::{contract_for, SheetContract};

pub use workbook::{Cell, MemoryWorkbook, Sheet, Workbook, XlsxWorkbook};

/// Columns whose normalized name contains this marker hold dates
pub const DATE_MARKER: &str = "data";

/// What happened to one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    Exported {
        table: String,
        rows: usize,
        extra_columns: Vec<String>,
    },
    Rejected {
        missing: Vec<String>,
    },
    Unrecognized,
    Unreadable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    #[serde(flatten)]
    pub outcome: SheetOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractReport {
    pub sheets: Vec<SheetReport>,
}

impl ExtractReport {
    /// Staging tables written in this run
    pub fn exported_tables(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .filter_map(|s| match &s.outcome {
                SheetOutcome::Exported { table, .. } => Some(table.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self, sheet: &str) -> Option<&SheetOutcome> {
        self.sheets
            .iter()
            .find(|s| s.sheet == sheet)
            .map(|s| &s.outcome)
    }
}

/// Trim, lower-case and underscore a column header
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Extract a workbook file into the staging area. The area is purged before
/// the source is opened, so an unreadable source leaves it empty.
pub fn extract_file(source: &Path, staging: &DataArea) -> Result<ExtractReport> {
    let removed = staging.purge()?;
    info!("Cleared {} file(s) from {:?}", removed, staging.root());

    info!("Reading workbook {:?}", source);
    let mut workbook = XlsxWorkbook::open(source)?;
    export_sheets(&mut workbook, staging)
}

/// Extract any workbook into a freshly purged staging area
pub fn extract_workbook(workbook: &mut impl Workbook, staging: &DataArea) -> Result<ExtractReport> {
    let removed = staging.purge()?;
    info!("Cleared {} file(s) from {:?}", removed, staging.root());

    export_sheets(workbook, staging)
}

fn export_sheets(workbook: &mut impl Workbook, staging: &DataArea) -> Result<ExtractReport> {
    let names = workbook.sheet_names();
    info!("{} sheet(s) found", names.len());

    let mut report = ExtractReport::default();

    for name in names {
        let outcome = match contract_for(&name) {
            None => {
                warn!("Sheet '{}' has no contract, ignored", name);
                SheetOutcome::Unrecognized
            }
            Some(contract) => match workbook.read_sheet(&name) {
                Err(e) => {
                    warn!("Sheet '{}' could not be read, skipped: {}", name, e);
                    SheetOutcome::Unreadable {
                        reason: e.to_string(),
                    }
                }
                Ok(sheet) => export_sheet(&sheet, contract, staging)?,
            },
        };

        report.sheets.push(SheetReport {
            sheet: name,
            outcome,
        });
    }

    Ok(report)
}

fn export_sheet(sheet: &Sheet, contract: &SheetContract, staging: &DataArea) -> Result<SheetOutcome> {
    let columns = normalize_header(sheet.header());

    let missing = contract.missing_columns(&columns);
    if !missing.is_empty() {
        warn!(
            "Sheet '{}' is missing columns: {}; export cancelled",
            sheet.name,
            missing.join(", ")
        );
        return Ok(SheetOutcome::Rejected {
            missing: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let extra_columns: Vec<String> = contract
        .extra_columns(&columns)
        .into_iter()
        .map(str::to_string)
        .collect();
    if !extra_columns.is_empty() {
        warn!(
            "Sheet '{}' has extra columns: {}; they are kept",
            sheet.name,
            extra_columns.join(", ")
        );
    }

    let date_columns: Vec<bool> = columns.iter().map(|c| c.contains(DATE_MARKER)).collect();
    let mut records = RecordSet::new(columns);

    for row in sheet.data_rows() {
        if row.iter().all(|c| cell_text(c).is_none()) {
            continue;
        }
        let values = date_columns
            .iter()
            .enumerate()
            .map(|(idx, is_date)| {
                let cell = row.get(idx).unwrap_or(&Cell::Empty);
                if *is_date {
                    cell_date(cell)
                } else {
                    cell_text(cell)
                }
            })
            .collect();
        records.push_row(values);
    }

    let path = staging.write_table(contract.name, &records)?;
    info!("Sheet '{}' exported to {:?} ({} rows)", sheet.name, path, records.len());

    Ok(SheetOutcome::Exported {
        table: contract.name.to_string(),
        rows: records.len(),
        extra_columns,
    })
}

/// Normalized header names; blanks become `unnamed_<idx>` and repeats get a suffix
fn normalize_header(header: &[Cell]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = cell_text(cell)
                .map(|t| normalize_column(&t))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("unnamed_{}", idx));

            let n = seen.entry(name.clone()).or_insert(0);
            let unique = if *n > 0 {
                format!("{}_{}", name, n)
            } else {
                name
            };
            *n += 1;
            unique
        })
        .collect()
}

/// Text for a non-date cell; sentinels and blanks are missing
fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) if is_missing(s) => None,
        Cell::Text(s) => Some(s.clone()),
        Cell::Int(i) => Some(i.to_string()),
        Cell::Float(f) if f.is_nan() => None,
        Cell::Float(f) => Some(format_number(*f)),
        Cell::Bool(b) => Some(b.to_string()),
        Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

/// ISO date for a date-column cell; anything unparseable is missing
fn cell_date(cell: &Cell) -> Option<String> {
    let date = match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date(s),
        Cell::Int(i) => date_from_serial(*i as f64),
        Cell::Float(f) => date_from_serial(*f),
        Cell::Empty | Cell::Bool(_) => None,
    };
    date.map(|d| d.format(ISO_DATE).to_string())
}
