//! Dynamically-typed SQL values.
//!
//! Rows read from the source are decoded into [`SqlValue`] cells without any
//! compile-time knowledge of the table layout. Drivers disagree on how they
//! surface a column (a MySQL `INT` may come back as an integer while a legacy
//! driver hands over ASCII bytes), so every consumer branches on the tag
//! explicitly instead of relying on implicit coercion.

use std::fmt;

/// Half-open range of reals that convert to `i64` without saturating.
const I64_LOWER: f64 = i64::MIN as f64;
const I64_UPPER: f64 = -(i64::MIN as f64);

/// A single scanned cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer width, widened to 64 bits.
    I64(i64),

    /// Any floating point width, widened to 64 bits.
    F64(f64),

    /// Text data. Temporal, decimal and JSON columns are rendered to text on read.
    Text(String),

    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Name of the tag, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::I64(_) => "integer",
            SqlValue::F64(_) => "real",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
        }
    }

    /// Integer view of the value.
    ///
    /// Booleans map to 0/1 and text or ASCII bytes are parsed. Reals are
    /// accepted only when they carry no fractional part.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            // `as` saturates, so reals outside the i64 range are rejected first.
            SqlValue::F64(f) if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(f) => {
                Some(*f as i64)
            }
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value. NULL yields `None`.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// A decoded row, positionally aligned to the source table's column list.
pub type Row = Vec<SqlValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::I64(42).is_null());
    }

    #[test]
    fn test_as_i64_branches_on_tag() {
        assert_eq!(SqlValue::I64(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Bool(true).as_i64(), Some(1));
        assert_eq!(SqlValue::Bytes(b"42".to_vec()).as_i64(), Some(42));
        assert_eq!(SqlValue::Text(" 9 ".into()).as_i64(), Some(9));
        assert_eq!(SqlValue::F64(3.0).as_i64(), Some(3));
        assert_eq!(SqlValue::F64(3.5).as_i64(), None);
        assert_eq!(SqlValue::F64(1e30).as_i64(), None);
        assert_eq!(SqlValue::F64(-1e30).as_i64(), None);
        assert_eq!(SqlValue::F64(9.223372036854775807e18).as_i64(), None);
        assert_eq!(SqlValue::F64(-9.223372036854775808e18).as_i64(), Some(i64::MIN));
        assert_eq!(SqlValue::F64(f64::NAN).as_i64(), None);
        assert_eq!(SqlValue::F64(f64::INFINITY).as_i64(), None);
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(SqlValue::Null.as_text(), None);
        assert_eq!(SqlValue::Bytes(b"gpt-4".to_vec()).as_text().as_deref(), Some("gpt-4"));
        assert_eq!(SqlValue::I64(5).as_text().as_deref(), Some("5"));
    }

    #[test]
    fn test_from_implementations() {
        let v: SqlValue = 42i32.into();
        assert_eq!(v, SqlValue::I64(42));

        let v: SqlValue = None::<i64>.into();
        assert_eq!(v, SqlValue::Null);

        let v: SqlValue = "default".into();
        assert_eq!(v, SqlValue::Text("default".to_string()));
    }
}
