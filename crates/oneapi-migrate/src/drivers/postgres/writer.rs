//! PostgreSQL writes inside a single transaction.
//!
//! PostgreSQL checks parameter types strictly, while source rows carry
//! whatever the source driver produced (a MySQL `tinyint` status may need to
//! land in a `boolean`, a `DATETIME` string in a `timestamptz`). Each value is
//! coerced to the type the prepared statement reports for its slot.

use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};
use tokio_postgres::Statement;

use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// A PostgreSQL write transaction.
///
/// Prepared statements are cached by SQL text for the life of the
/// transaction. Dropping it without [`commit`](Self::commit) rolls back.
pub struct PostgresTransaction<'c> {
    tx: tokio_postgres::Transaction<'c>,
    statements: HashMap<String, Statement>,
}

impl<'c> PostgresTransaction<'c> {
    pub(super) fn new(tx: tokio_postgres::Transaction<'c>) -> Self {
        Self {
            tx,
            statements: HashMap::new(),
        }
    }

    /// Execute one statement with positional parameters.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let stmt = match self.statements.get(sql) {
            Some(stmt) => stmt.clone(),
            None => {
                let stmt = self.tx.prepare(sql).await?;
                self.statements.insert(sql.to_string(), stmt.clone());
                stmt
            }
        };

        let types = stmt.params();
        if types.len() != params.len() {
            return Err(MigrateError::Coercion {
                value: format!("{} parameters", params.len()),
                target_type: format!("statement expecting {}", types.len()),
            });
        }

        let bound = params
            .iter()
            .zip(types)
            .map(|(value, ty)| PgParam::coerce(value, ty))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        Ok(self.tx.execute(&stmt, &refs).await?)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// A value already converted to its destination parameter type.
#[derive(Debug)]
enum PgParam<'a> {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Numeric(Decimal),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
}

impl<'a> PgParam<'a> {
    fn coerce(value: &'a SqlValue, ty: &Type) -> Result<Self> {
        if value.is_null() {
            return Ok(PgParam::Null);
        }

        let param = match ty.name() {
            "bool" => PgParam::Bool(to_bool(value, ty)?),
            "int2" => PgParam::I16(narrow(to_int(value, ty)?, value, ty)?),
            "int4" => PgParam::I32(narrow(to_int(value, ty)?, value, ty)?),
            "int8" => PgParam::I64(to_int(value, ty)?),
            "float4" => PgParam::F32(to_float(value, ty)? as f32),
            "float8" => PgParam::F64(to_float(value, ty)?),
            "numeric" => PgParam::Numeric(to_decimal(value, ty)?),
            "bytea" => PgParam::Bytes(match value {
                SqlValue::Bytes(b) => Cow::Borrowed(b.as_slice()),
                SqlValue::Text(s) => Cow::Borrowed(s.as_bytes()),
                other => Cow::Owned(other.to_string().into_bytes()),
            }),
            "timestamp" => PgParam::Timestamp(to_timestamp(value, ty)?),
            "timestamptz" => PgParam::TimestampTz(to_timestamp(value, ty)?.and_utc()),
            "date" => PgParam::Date(parse_text(value, ty, |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
            })?),
            "time" => PgParam::Time(parse_text(value, ty, |s| {
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok()
            })?),
            "json" | "jsonb" => {
                let text = to_text(value);
                PgParam::Json(
                    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text.into_owned())),
                )
            }
            "text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => {
                PgParam::Text(to_text(value))
            }
            _ if matches!(ty.kind(), Kind::Enum(_)) => PgParam::Text(to_text(value)),
            _ => return Err(coercion_error(value, ty)),
        };
        Ok(param)
    }
}

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgParam::Null => Ok(IsNull::Yes),
            PgParam::Bool(v) => v.to_sql(ty, out),
            PgParam::I16(v) => v.to_sql(ty, out),
            PgParam::I32(v) => v.to_sql(ty, out),
            PgParam::I64(v) => v.to_sql(ty, out),
            PgParam::F32(v) => v.to_sql(ty, out),
            PgParam::F64(v) => v.to_sql(ty, out),
            PgParam::Numeric(v) => v.to_sql(ty, out),
            PgParam::Text(v) => {
                let s: &str = v;
                s.to_sql(ty, out)
            }
            PgParam::Bytes(v) => {
                let b: &[u8] = v;
                b.to_sql(ty, out)
            }
            PgParam::Timestamp(v) => v.to_sql(ty, out),
            PgParam::TimestampTz(v) => v.to_sql(ty, out),
            PgParam::Date(v) => v.to_sql(ty, out),
            PgParam::Time(v) => v.to_sql(ty, out),
            PgParam::Json(v) => v.to_sql(ty, out),
        }
    }

    // Values are coerced against the statement's own parameter types.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn coercion_error(value: &SqlValue, ty: &Type) -> MigrateError {
    let shown = match value {
        SqlValue::Bytes(b) => format!("{} bytes", b.len()),
        other => {
            let s = other.to_string();
            let head: String = s.chars().take(64).collect();
            let ellipsis = if head.len() < s.len() { "..." } else { "" };
            format!("{} '{}{}'", other.kind(), head, ellipsis)
        }
    };
    MigrateError::Coercion {
        value: shown,
        target_type: ty.name().to_string(),
    }
}

fn to_text(value: &SqlValue) -> Cow<'_, str> {
    match value {
        SqlValue::Text(s) => Cow::Borrowed(s.as_str()),
        SqlValue::Bytes(b) => String::from_utf8_lossy(b),
        other => Cow::Owned(other.to_string()),
    }
}

fn to_bool(value: &SqlValue, ty: &Type) -> Result<bool> {
    match value {
        SqlValue::Bool(b) => Ok(*b),
        SqlValue::I64(v) => Ok(*v != 0),
        SqlValue::Text(_) | SqlValue::Bytes(_) => {
            match to_text(value).trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "y" | "yes" | "on" => Ok(true),
                "0" | "f" | "false" | "n" | "no" | "off" => Ok(false),
                _ => Err(coercion_error(value, ty)),
            }
        }
        _ => Err(coercion_error(value, ty)),
    }
}

fn to_int(value: &SqlValue, ty: &Type) -> Result<i64> {
    value.as_i64().ok_or_else(|| coercion_error(value, ty))
}

fn narrow<T: TryFrom<i64>>(v: i64, value: &SqlValue, ty: &Type) -> Result<T> {
    T::try_from(v).map_err(|_| coercion_error(value, ty))
}

fn to_float(value: &SqlValue, ty: &Type) -> Result<f64> {
    match value {
        SqlValue::F64(v) => Ok(*v),
        SqlValue::I64(v) => Ok(*v as f64),
        SqlValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => to_text(value)
            .trim()
            .parse()
            .map_err(|_| coercion_error(value, ty)),
    }
}

fn to_decimal(value: &SqlValue, ty: &Type) -> Result<Decimal> {
    match value {
        SqlValue::I64(v) => Ok(Decimal::from(*v)),
        SqlValue::F64(v) => Decimal::try_from(*v).map_err(|_| coercion_error(value, ty)),
        _ => Decimal::from_str(to_text(value).trim()).map_err(|_| coercion_error(value, ty)),
    }
}

/// Accepts naive `YYYY-MM-DD HH:MM:SS[.f]` (assumed UTC), RFC 3339, a bare
/// date, or an integer count of Unix seconds.
fn to_timestamp(value: &SqlValue, ty: &Type) -> Result<NaiveDateTime> {
    if let SqlValue::I64(secs) = value {
        return DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| coercion_error(value, ty));
    }
    parse_text(value, ty, |s| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

fn parse_text<T>(value: &SqlValue, ty: &Type, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    match value {
        SqlValue::Text(_) | SqlValue::Bytes(_) => {
            parse(to_text(value).trim()).ok_or_else(|| coercion_error(value, ty))
        }
        _ => Err(coercion_error(value, ty)),
    }
}
