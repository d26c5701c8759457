//! Row value types and literal serialization.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::error;
use uuid::Uuid;

use crate::error::{ExportError, Result};
use crate::schema::ColumnSchema;
use crate::typemap::redshift_to_postgres;

/// A single decoded row value.
///
/// Variants beyond the serializable set (`Bool`, `Uuid`, `Bytes`) exist so
/// unmapped catalog values can still be decoded and shown in the
/// unsupported-type diagnostic instead of failing opaquely at the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (integer).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (double precision).
    F64(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Text/string data.
    Text(String),

    /// Date without time component.
    Date(NaiveDate),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// UUID value.
    Uuid(Uuid),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// One fetch batch of rows.
#[derive(Debug)]
pub struct RowPage {
    /// Rows in this page, positionally aligned with the column schema.
    pub rows: Vec<Vec<SqlValue>>,

    /// Number of rows in this page (not the table total). Drives the
    /// trailing-comma tie-break in DML assembly.
    pub row_count: usize,
}

impl RowPage {
    /// Create a page; `row_count` is derived from the rows themselves.
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    /// Get the number of rows in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialize one value into a VALUES-tuple literal, or `NULL`.
///
/// Dispatch is on the column's *mapped* PostgreSQL type. Empty strings in
/// text columns serialize to `NULL`, not to `''`. A mapped type with no
/// rule here aborts the export: passing an unknown type through could emit
/// syntactically valid but unescaped (corrupt) SQL, so the failure is loud
/// on purpose.
pub fn literal(value: &SqlValue, column: &ColumnSchema) -> Result<String> {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    let pg_type = redshift_to_postgres(
        &column.data_type,
        column.numeric_precision,
        column.numeric_scale,
    );

    let rendered = match pg_type.as_str() {
        "text" => match value {
            SqlValue::Text(s) if s.is_empty() => Some("NULL".to_string()),
            SqlValue::Text(s) => Some(quote_text(s)),
            _ => None,
        },
        "date" => match value {
            SqlValue::Date(d) => Some(format!("'{}'", d.format("%Y-%m-%d"))),
            _ => None,
        },
        "timestamp without time zone" => match value {
            SqlValue::DateTime(ts) => Some(format!("'{}'", ts.format("%Y-%m-%dT%H:%M:%S%.f"))),
            _ => None,
        },
        "timestamp with time zone" => match value {
            SqlValue::DateTimeOffset(ts) => Some(format!("'{}'", ts.to_rfc3339())),
            _ => None,
        },
        "integer" | "real" | "double precision" | "smallint" | "bigint" => numeric_literal(value),
        t if t.starts_with("numeric") => numeric_literal(value),
        _ => None,
    };

    match rendered {
        Some(sql) => Ok(sql),
        None => {
            error!(
                column = %column.name,
                data_type = %column.data_type,
                mapped_type = %pg_type,
                value = ?value,
                "no serialization rule for value; aborting export"
            );
            Err(ExportError::UnsupportedType {
                column: column.name.clone(),
                data_type: pg_type,
                value: format!("{:?}", value),
            })
        }
    }
}

/// Render a numeric-family value as its canonical decimal string, unquoted.
fn numeric_literal(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::I16(v) => Some(v.to_string()),
        SqlValue::I32(v) => Some(v.to_string()),
        SqlValue::I64(v) => Some(v.to_string()),
        SqlValue::F32(v) => Some(v.to_string()),
        SqlValue::F64(v) => Some(v.to_string()),
        SqlValue::Decimal(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Quote a non-empty string as a PostgreSQL literal.
///
/// Single quotes are doubled. Strings containing backslashes use the
/// `E'...'` escape form with backslashes doubled, so the literal survives
/// regardless of `standard_conforming_strings`.
fn quote_text(s: &str) -> String {
    let escaped = s.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}
