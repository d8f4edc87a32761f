use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{EtlError, Result};

/// A flat, column-named table of optional text cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|v| v.as_deref())
    }

    /// Rewrite every cell of one column in place
    pub fn map_column<F>(&mut self, col: usize, mut f: F)
    where
        F: FnMut(Option<&str>) -> Option<String>,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell.as_deref());
            }
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = RecordSet::new(columns);

        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            records.push_row(row);
        }

        Ok(records)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().from_writer(writer);

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
        }
        writer
            .flush()
            .map_err(|e| EtlError::io("Failed to flush CSV output", e))?;

        Ok(())
    }

    /// Read a CSV file; a missing file is a `DependencyMissing` error
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EtlError::DependencyMissing {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)
            .map_err(|e| EtlError::io(format!("Failed to open {:?}", path), e))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| EtlError::io(format!("Failed to create {:?}", path), e))?;
        self.to_writer(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_read_as_missing() {
        let input = "cod_produto,valor_total\nP1,\nP2,10.5\n";
        let records = RecordSet::from_reader(input.as_bytes()).unwrap();

        assert_eq!(records.columns, vec!["cod_produto", "valor_total"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records.value(0, 1), None);
        assert_eq!(records.value(1, 1), Some("10.5"));
    }

    #[test]
    fn test_write_quotes_only_when_needed() {
        let mut records = RecordSet::new(vec!["nome".to_string(), "cor".to_string()]);
        records.push_row(vec![Some("Vestido, floral".to_string()), None]);

        let mut out = Vec::new();
        records.to_writer(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "nome,cor\n\"Vestido, floral\",\n"
        );
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut records = RecordSet::new(vec!["a".to_string(), "b".to_string()]);
        records.push_row(vec![Some("1".to_string())]);
        assert_eq!(records.rows[0], vec![Some("1".to_string()), None]);
    }

    #[test]
    fn test_read_missing_file_is_dependency_missing() {
        let result = RecordSet::read_csv(Path::new("/nonexistent/venda.csv"));
        assert!(matches!(result, Err(EtlError::DependencyMissing { .. })));
    }
}
