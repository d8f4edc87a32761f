use std::collections::HashSet;

/// Columns starting with this prefix are store-assigned identities.
pub const SURROGATE_PREFIX: &str = "id_";

/// Column data type in the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// ISO `YYYY-MM-DD` calendar date stored as text
    Date,
}

impl ColumnType {
    /// SQLite STRICT storage type
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text | ColumnType::Date => "TEXT",
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
        }
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    /// Reference a natural key column of the same name in the parent table
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: column,
        }
    }
}

/// What happens when an inbound row collides with the natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Last write wins: every non-key attribute takes the incoming value
    Overwrite,
    /// First write wins: the stored row is left untouched
    Ignore,
}

/// Required-column contract for one sheet of the source workbook
#[derive(Debug, Clone)]
pub struct SheetContract {
    pub name: &'static str,
    pub required: &'static [&'static str],
}

impl SheetContract {
    /// Required columns absent from `present`, in contract order
    pub fn missing_columns(&self, present: &[String]) -> Vec<&'static str> {
        let present: HashSet<&str> = present.iter().map(String::as_str).collect();
        self.required
            .iter()
            .copied()
            .filter(|c| !present.contains(c))
            .collect()
    }

    /// Present columns the contract does not ask for
    pub fn extra_columns<'a>(&self, present: &'a [String]) -> Vec<&'a str> {
        present
            .iter()
            .map(String::as_str)
            .filter(|c| !self.required.contains(c))
            .collect()
    }
}

/// Warehouse table definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    /// Staging record-set this table is built from
    pub source_table: &'static str,
    /// Store-assigned identity column
    pub surrogate_key: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    /// Columns of the uniqueness constraint
    pub natural_key: &'static [&'static str],
    pub conflict: ConflictPolicy,
}

impl TableSchema {
    /// Get all tables this table depends on (FK parents)
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.natural_key.contains(&name)
    }

    /// Name of the uniqueness constraint
    pub fn unique_constraint(&self) -> String {
        match self.natural_key {
            [single] => format!("{}_{}_unique", self.name, single),
            _ => format!("{}_unique", self.name),
        }
    }
}
