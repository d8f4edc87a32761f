//! Transformation stage: staging record-sets to warehouse-named processed record-sets

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::area::DataArea;
use crate::error::{EtlError, Result};
use crate::parser::{normalize_date, present, RecordSet};
use crate::schema::{ColumnType, TableSchema, ALL_TABLES};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformReport {
    pub tables: Vec<TableSummary>,
    /// Sale totals computed from quantity and product price
    pub derived_totals: usize,
    /// Sale totals left missing because the product price could not be resolved
    pub lookup_misses: usize,
    /// Date cells that did not parse and became missing
    pub unparsed_dates: usize,
}

/// Run the transformation: purge `processed`, read every staging record-set,
/// normalize dates, backfill sale totals, and write the warehouse-named files.
pub fn transform(staging: &DataArea, processed: &DataArea) -> Result<TransformReport> {
    let removed = processed.purge()?;
    info!("Cleared {} file(s) from {:?}", removed, processed.root());

    let mut sets: Vec<(&TableSchema, RecordSet)> = Vec::with_capacity(ALL_TABLES.len());
    for schema in ALL_TABLES {
        let records = staging.read_table(schema.source_table)?;
        debug!("Read {} rows from staging {}", records.len(), schema.source_table);
        sets.push((schema, records));
    }

    let mut report = TransformReport::default();

    for (schema, records) in sets.iter_mut() {
        report.unparsed_dates += normalize_dates(schema, records);
    }

    let products = sets
        .iter()
        .find(|(s, _)| s.source_table == "produto")
        .map(|(_, r)| price_lookup(r))
        .transpose()?
        .unwrap_or_default();

    if let Some((_, sales)) = sets.iter_mut().find(|(s, _)| s.source_table == "venda") {
        let (derived, misses) = backfill_totals(sales, &products)?;
        report.derived_totals = derived;
        report.lookup_misses = misses;
    }

    for (schema, records) in &sets {
        let path = processed.write_table(schema.name, records)?;
        info!("Wrote {} rows to {:?}", records.len(), path);
        report.tables.push(TableSummary {
            table: schema.name.to_string(),
            rows: records.len(),
        });
    }

    info!(
        "Transformation done: {} totals derived, {} unresolved",
        report.derived_totals, report.lookup_misses
    );

    Ok(report)
}

/// Re-parse the date-typed columns of a table, returning how many cells
/// held a value that could not be parsed
fn normalize_dates(schema: &TableSchema, records: &mut RecordSet) -> usize {
    let mut unparsed = 0;

    for col in schema.columns.iter().filter(|c| c.col_type == ColumnType::Date) {
        if let Some(idx) = records.column_index(col.name) {
            records.map_column(idx, |value| {
                let normalized = normalize_date(value);
                if normalized.is_none() && present(value).is_some() {
                    unparsed += 1;
                }
                normalized
            });
        }
    }

    unparsed
}

fn require_column(records: &RecordSet, table: &str, column: &str) -> Result<usize> {
    records
        .column_index(column)
        .ok_or_else(|| EtlError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    present(value).and_then(|v| Decimal::from_str(v.trim()).ok())
}

/// Map of trimmed product code to unit sale price; later rows win
pub fn price_lookup(products: &RecordSet) -> Result<HashMap<String, Decimal>> {
    let code_idx = require_column(products, "produto", "cod_produto")?;
    let price_idx = require_column(products, "produto", "preco_venda")?;

    let mut prices = HashMap::new();
    for row in 0..products.len() {
        let code = present(products.value(row, code_idx));
        let price = parse_decimal(products.value(row, price_idx));
        if let (Some(code), Some(price)) = (code, price) {
            prices.insert(code.trim().to_string(), price);
        }
    }

    Ok(prices)
}

/// Fill missing `valor_total` with `quantidade × preco_venda`. Returns
/// (derived, unresolved) counts; an unresolved total stays missing.
pub fn backfill_totals(
    sales: &mut RecordSet,
    prices: &HashMap<String, Decimal>,
) -> Result<(usize, usize)> {
    let code_idx = require_column(sales, "venda", "cod_produto")?;
    let qty_idx = require_column(sales, "venda", "quantidade")?;
    let total_idx = require_column(sales, "venda", "valor_total")?;

    let mut derived = 0;
    let mut misses = 0;

    for row in sales.rows.iter_mut() {
        if present(row[total_idx].as_deref()).is_some() {
            continue;
        }

        let code = present(row[code_idx].as_deref());
        let quantity = parse_decimal(row[qty_idx].as_deref());
        let price = code.and_then(|c| prices.get(c.trim()));

        match (quantity, price) {
            (Some(quantity), Some(price)) => match quantity.checked_mul(*price) {
                Some(total) => {
                    row[total_idx] = Some(total.to_string());
                    derived += 1;
                }
                None => {
                    warn!("Total for product {:?} overflows, left missing", code);
                    row[total_idx] = None;
                    misses += 1;
                }
            },
            _ => {
                debug!("No total derivable for product {:?}", code);
                row[total_idx] = None;
                misses += 1;
            }
        }
    }

    Ok((derived, misses))
}
