use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

/// One spreadsheet cell, independent of the workbook backend
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Empty),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// A worksheet as a grid of cells; the first row is the header
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Source of named worksheets
pub trait Workbook {
    fn sheet_names(&self) -> Vec<String>;
    fn read_sheet(&mut self, name: &str) -> Result<Sheet>;
}

/// Workbook file on disk (xlsx, xls, xlsb or ods)
pub struct XlsxWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EtlError::SourceUnreadable {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        let sheets = open_workbook_auto(path).map_err(|e| EtlError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| EtlError::SourceUnreadable {
                path: self.path.clone(),
                reason: format!("sheet '{}': {}", name, e),
            })?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        Ok(Sheet {
            name: name.to_string(),
            rows,
        })
    }
}

/// Workbook held in memory, in sheet order
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<Sheet>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet from a header and data rows
    pub fn with_sheet(mut self, name: &str, header: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        let mut all = vec![header.iter().map(|h| Cell::from(*h)).collect()];
        all.extend(rows);
        self.sheets.push(Sheet {
            name: name.to_string(),
            rows: all,
        });
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| EtlError::SourceUnreadable {
                path: PathBuf::from("<memory>"),
                reason: format!("no sheet named '{}'", name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_calamine_data() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(Cell::from(&Data::Int(3)), Cell::Int(3));
        assert_eq!(
            Cell::from(&Data::String("Rosa".to_string())),
            Cell::Text("Rosa".to_string())
        );
        assert_eq!(
            Cell::from(&Data::DateTimeIso("2025-10-14T00:00:00".to_string())),
            Cell::Text("2025-10-14T00:00:00".to_string())
        );
    }

    #[test]
    fn test_open_missing_workbook_is_unreadable() {
        let result = XlsxWorkbook::open(Path::new("/nonexistent/ciranda_kids.xlsx"));
        assert!(matches!(result, Err(EtlError::SourceUnreadable { .. })));
    }

    #[test]
    fn test_open_corrupt_workbook_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ciranda_kids.xlsx");
        std::fs::write(&path, b"not a spreadsheet").unwrap();

        let result = XlsxWorkbook::open(&path);
        assert!(matches!(result, Err(EtlError::SourceUnreadable { .. })));
    }

    #[test]
    fn test_memory_workbook_keeps_sheet_order() {
        let mut wb = MemoryWorkbook::new()
            .with_sheet("venda", &["cod_produto"], vec![vec!["P1".into()]])
            .with_sheet("brinde", &["item"], vec![]);

        assert_eq!(wb.sheet_names(), vec!["venda", "brinde"]);
        let sheet = wb.read_sheet("venda").unwrap();
        assert_eq!(sheet.header(), &[Cell::from("cod_produto")]);
        assert_eq!(sheet.data_rows().len(), 1);
    }
}
