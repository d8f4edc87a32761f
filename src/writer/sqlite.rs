use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use super::schema_gen::{generate_create_table, generate_indexes, generate_upsert};
use crate::area::DataArea;
use crate::error::{EtlError, Result};
use crate::parser::{RecordSet, SqlValue};
use crate::schema::{Column, DependencyResolver, TableSchema, ALL_TABLES, SURROGATE_PREFIX};

/// Row counts for one table load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableLoad {
    pub table: String,
    pub rows_read: usize,
    /// Rows inserted, or updated under an overwrite policy
    pub applied: usize,
    /// Rows whose key already existed under an ignore policy
    pub ignored: usize,
    /// Rows skipped because part of the natural key was missing
    pub rejected: usize,
    /// Inbound columns the table does not declare
    pub dropped_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Loaded(TableLoad),
    Failed { table: String, error: String },
}

impl TableOutcome {
    pub fn table(&self) -> &str {
        match self {
            TableOutcome::Loaded(load) => &load.table,
            TableOutcome::Failed { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableOutcome>,
}

impl LoadReport {
    pub fn failed_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| matches!(t, TableOutcome::Failed { .. }))
            .map(|t| t.table().to_string())
            .collect()
    }

    pub fn get(&self, table: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|t| t.table() == table)
    }
}

/// Owns the warehouse connection for one loading run
pub struct WarehouseWriter {
    conn: Connection,
}

impl WarehouseWriter {
    pub fn open(db_path: &Path) -> Result<Self> {
        let cannot_open = |reason: String| EtlError::ConnectionFailure {
            path: db_path.to_path_buf(),
            reason,
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| cannot_open(e.to_string()))?;
        }

        let conn = Connection::open(db_path).map_err(|e| cannot_open(e.to_string()))?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| cannot_open(e.to_string()))?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the given tables if they do not exist yet
    pub fn create_tables(&self, schemas: &[&TableSchema]) -> Result<()> {
        info!("Ensuring {} warehouse tables exist", schemas.len());

        for schema in schemas {
            self.conn.execute(&generate_create_table(schema), [])?;

            for index_sql in generate_indexes(schema) {
                self.conn.execute(&index_sql, [])?;
            }
        }

        Ok(())
    }

    /// Upsert every row of `records` into one table inside a single
    /// transaction. Any statement failure rolls the whole table back.
    pub fn load_table(&mut self, schema: &TableSchema, records: &RecordSet) -> Result<TableLoad> {
        let mut load = TableLoad {
            table: schema.name.to_string(),
            rows_read: records.len(),
            ..TableLoad::default()
        };

        let mut plan: Vec<(usize, &Column)> = Vec::new();
        for (idx, name) in records.columns.iter().enumerate() {
            if name.starts_with(SURROGATE_PREFIX) {
                continue;
            }
            match schema.column(name) {
                Some(col) => plan.push((idx, col)),
                None => load.dropped_columns.push(name.clone()),
            }
        }
        if !load.dropped_columns.is_empty() {
            warn!(
                "{}: columns not in the warehouse table are dropped: {}",
                schema.name,
                load.dropped_columns.join(", ")
            );
        }

        for key in schema.natural_key {
            if !plan.iter().any(|(_, col)| col.name == *key) {
                return Err(EtlError::MissingColumn {
                    table: schema.name.to_string(),
                    column: key.to_string(),
                });
            }
        }

        let columns: Vec<&str> = plan.iter().map(|(_, col)| col.name).collect();
        let insert_sql = generate_upsert(schema, &columns);

        let violation = |source| EtlError::ConstraintViolation {
            table: schema.name.to_string(),
            source,
        };

        let tx = self.conn.transaction().map_err(violation)?;
        {
            let mut stmt = tx.prepare_cached(&insert_sql).map_err(violation)?;

            for (row_idx, row) in records.rows.iter().enumerate() {
                let values: Vec<SqlValue> = plan
                    .iter()
                    .map(|(idx, col)| {
                        SqlValue::from_field(row.get(*idx).and_then(|v| v.as_deref()), col.col_type)
                    })
                    .collect();

                let key_missing = plan
                    .iter()
                    .zip(&values)
                    .any(|((_, col), value)| schema.is_key_column(col.name) && value.is_null());
                if key_missing {
                    warn!("{}: row {} has an incomplete key, skipped", schema.name, row_idx + 1);
                    load.rejected += 1;
                    continue;
                }

                for (idx, value) in values.iter().enumerate() {
                    value.bind_to(idx + 1, &mut stmt).map_err(violation)?;
                }
                match stmt.raw_execute().map_err(violation)? {
                    0 => load.ignored += 1,
                    _ => load.applied += 1,
                }
            }
        }
        tx.commit().map_err(violation)?;

        info!(
            "{}: {} applied, {} ignored, {} rejected",
            schema.name, load.applied, load.ignored, load.rejected
        );

        Ok(load)
    }
}

/// Load every processed record-set into the warehouse in the fixed order.
/// A table that fails is rolled back and reported; later tables still run.
pub fn load_processed(processed: &DataArea, writer: &mut WarehouseWriter) -> Result<LoadReport> {
    DependencyResolver::new().check_order(ALL_TABLES)?;

    let mut inputs = Vec::with_capacity(ALL_TABLES.len());
    for schema in ALL_TABLES {
        inputs.push((*schema, processed.read_table(schema.name)?));
    }

    writer.create_tables(ALL_TABLES)?;

    let mut report = LoadReport::default();
    for (schema, records) in &inputs {
        let outcome = match writer.load_table(schema, records) {
            Ok(load) => TableOutcome::Loaded(load),
            Err(e) => {
                warn!("{}", e);
                TableOutcome::Failed {
                    table: schema.name.to_string(),
                    error: e.to_string(),
                }
            }
        };
        report.tables.push(outcome);
    }

    Ok(report)
}

/// Open the warehouse, load the processed area, and release the connection
pub fn load_to_sqlite(processed: &DataArea, db_path: &Path) -> Result<LoadReport> {
    let mut writer = WarehouseWriter::open(db_path)?;
    load_processed(processed, &mut writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{DIM_FORNECEDOR, DIM_PRODUTO, FATO_VENDA};

    fn records(columns: &[&str], rows: &[&[&str]]) -> RecordSet {
        let mut set = RecordSet::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            set.push_row(row.iter().map(|v| Some(v.to_string())).collect());
        }
        set
    }

    fn writer() -> (tempfile::TempDir, WarehouseWriter) {
        let dir = tempfile::tempdir().unwrap();
        let writer = WarehouseWriter::open(&dir.path().join("warehouse.db")).unwrap();
        writer.create_tables(ALL_TABLES).unwrap();
        (dir, writer)
    }

    fn count(writer: &WarehouseWriter, table: &str) -> i64 {
        writer
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    fn suppliers() -> RecordSet {
        records(
            &["id_fornecedor", "cod_fornecedor", "nome_fornecedor", "telefone", "email", "cod_ibge_cidade"],
            &[&["7", "F1", "Malharia Sol", "1133334444", "sol@exemplo.com", "3550308"]],
        )
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let (_dir, writer) = writer();
        writer.create_tables(ALL_TABLES).unwrap();
        assert_eq!(count(&writer, "dim_fornecedor"), 0);
    }

    #[test]
    fn test_surrogate_columns_are_store_assigned() {
        let (_dir, mut writer) = writer();
        writer.load_table(&DIM_FORNECEDOR, &suppliers()).unwrap();

        let id: i64 = writer
            .connection()
            .query_row("SELECT id_fornecedor FROM dim_fornecedor", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_sentinels_are_stored_as_null() {
        let (_dir, mut writer) = writer();
        let set = records(
            &["cod_fornecedor", "nome_fornecedor", "telefone", "email", "cod_ibge_cidade"],
            &[&["F1", "Malharia Sol", "--", "None", "NaN"]],
        );
        writer.load_table(&DIM_FORNECEDOR, &set).unwrap();

        let nulls: i64 = writer
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM dim_fornecedor
                 WHERE telefone IS NULL AND email IS NULL AND cod_ibge_cidade IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_unknown_columns_are_dropped() {
        let (_dir, mut writer) = writer();
        let set = records(
            &["cod_fornecedor", "nome_fornecedor", "observacao"],
            &[&["F1", "Malharia Sol", "cliente antigo"]],
        );
        let load = writer.load_table(&DIM_FORNECEDOR, &set).unwrap();

        assert_eq!(load.dropped_columns, vec!["observacao"]);
        assert_eq!(load.applied, 1);
    }

    #[test]
    fn test_incomplete_key_rows_are_rejected() {
        let (_dir, mut writer) = writer();
        writer.load_table(&DIM_FORNECEDOR, &suppliers()).unwrap();
        writer
            .load_table(
                &DIM_PRODUTO,
                &records(&["cod_produto", "cod_fornecedor"], &[&["P1", "F1"]]),
            )
            .unwrap();

        let sales = records(
            &["cod_produto", "data_venda", "quantidade", "valor_total"],
            &[&["P1", "", "1", "10"], &["P1", "2025-10-14", "1", "10"]],
        );
        let load = writer.load_table(&FATO_VENDA, &sales).unwrap();

        assert_eq!((load.applied, load.rejected), (1, 1));
    }

    #[test]
    fn test_missing_parent_rolls_back_whole_table() {
        let (_dir, mut writer) = writer();
        writer.load_table(&DIM_FORNECEDOR, &suppliers()).unwrap();
        writer
            .load_table(
                &DIM_PRODUTO,
                &records(&["cod_produto", "cod_fornecedor"], &[&["P1", "F1"]]),
            )
            .unwrap();

        let sales = records(
            &["cod_produto", "data_venda", "quantidade", "valor_total"],
            &[&["P1", "2025-10-14", "1", "10"], &["P404", "2025-10-14", "1", "10"]],
        );
        let result = writer.load_table(&FATO_VENDA, &sales);

        assert!(matches!(
            result,
            Err(EtlError::ConstraintViolation { ref table, .. }) if table == "fato_venda"
        ));
        assert_eq!(count(&writer, "fato_venda"), 0);
    }

    #[test]
    fn test_non_numeric_value_violates_strict_column() {
        let (_dir, mut writer) = writer();
        let set = records(
            &["cod_fornecedor", "cod_ibge_cidade"],
            &[&["F1", "3550308"], &["F2", "São Paulo"]],
        );
        let result = writer.load_table(&DIM_FORNECEDOR, &set);

        assert!(matches!(result, Err(EtlError::ConstraintViolation { .. })));
        assert_eq!(count(&writer, "dim_fornecedor"), 0);
    }

    #[test]
    fn test_missing_key_column_is_an_error() {
        let (_dir, mut writer) = writer();
        let set = records(&["nome_fornecedor"], &[&["Malharia Sol"]]);
        let result = writer.load_table(&DIM_FORNECEDOR, &set);
        assert!(matches!(result, Err(EtlError::MissingColumn { .. })));
    }

    #[test]
    fn test_unusable_database_path_is_connection_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        for path in [dir.path().to_path_buf(), blocker.join("warehouse.db")] {
            let result = WarehouseWriter::open(&path);
            assert!(
                matches!(result, Err(EtlError::ConnectionFailure { .. })),
                "{:?}",
                path
            );
        }
    }
}
