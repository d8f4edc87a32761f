use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::schema::ColumnType;

/// Cell contents that stand for "no value". Shared by extraction and loading.
pub const MISSING_SENTINELS: &[&str] = &["", " ", "NaN", "nan", "NULL", "None", "-", "--"];

/// Output format for every normalized date
pub const ISO_DATE: &str = "%Y-%m-%d";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Last day representable as a spreadsheet serial number (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

/// True for sentinel tokens and whitespace-only text
pub fn is_missing(value: &str) -> bool {
    MISSING_SENTINELS.contains(&value) || value.trim().is_empty()
}

/// Drop sentinel values, keeping everything else untouched
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !is_missing(v))
}

/// Parse a calendar date from the textual forms found in the workbook
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if is_missing(text) {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Convert a spreadsheet serial day number (1900 date system)
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Normalize a date value to ISO text, `None` when it cannot be parsed
pub fn normalize_date(value: Option<&str>) -> Option<String> {
    value
        .and_then(parse_date)
        .map(|d| d.format(ISO_DATE).to_string())
}

/// Render a number the way it should appear in a CSV cell
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// A typed value ready for binding
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Convert a CSV field to the declared column type. Sentinels become
    /// `Null`; values that do not convert are kept as text so the STRICT
    /// table rejects them.
    pub fn from_field(value: Option<&str>, col_type: ColumnType) -> Self {
        let Some(raw) = present(value) else {
            return SqlValue::Null;
        };
        let text = raw.trim();

        match col_type {
            ColumnType::Integer => text
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .map(SqlValue::Integer)
                .unwrap_or_else(|| SqlValue::Text(raw.to_string())),
            ColumnType::Real => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(SqlValue::Real)
                .unwrap_or_else(|| SqlValue::Text(raw.to_string())),
            ColumnType::Date => match parse_date(text) {
                Some(date) => SqlValue::Text(date.format(ISO_DATE).to_string()),
                None => SqlValue::Text(raw.to_string()),
            },
            ColumnType::Text => SqlValue::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}
