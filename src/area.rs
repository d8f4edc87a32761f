use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};
use crate::parser::RecordSet;

/// An intermediate directory of `<table>.csv` record-sets (staging or processed)
pub struct DataArea {
    root: PathBuf,
}

impl DataArea {
    /// Open the area, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| EtlError::io(format!("Failed to create directory {:?}", root), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record-set for a table
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.csv", table))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    /// Remove every file in the area, returning how many were removed
    pub fn purge(&self) -> Result<usize> {
        let mut removed = 0;
        let entries = fs::read_dir(&self.root)
            .map_err(|e| EtlError::io(format!("Failed to list {:?}", self.root), e))?;

        for entry in entries {
            let path = entry
                .map_err(|e| EtlError::io(format!("Failed to list {:?}", self.root), e))?
                .path();

            if path.is_file() {
                fs::remove_file(&path)
                    .map_err(|e| EtlError::io(format!("Failed to remove {:?}", path), e))?;
                debug!("Removed {:?}", path);
                removed += 1;
            }
        }

        Ok(removed)
    }

    pub fn read_table(&self, table: &str) -> Result<RecordSet> {
        RecordSet::read_csv(&self.table_path(table))
    }

    pub fn write_table(&self, table: &str, records: &RecordSet) -> Result<PathBuf> {
        let path = self.table_path(table);
        records.write_csv(&path)?;
        Ok(path)
    }

    /// Names of the record-sets currently in the area, sorted
    pub fn tables(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| EtlError::io(format!("Failed to list {:?}", self.root), e))?;

        let mut tables = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| EtlError::io(format!("Failed to list {:?}", self.root), e))?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();

        Ok(tables)
    }
}
