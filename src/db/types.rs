//! Database-agnostic type mappings.
//!
//! This module decodes backend-specific rows into [`DbValue`]s.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! SQLite is dynamically typed, so its decoder looks at the storage class of
//! each value and only uses the declared column type as a hint.

use crate::db::cursor::RowCursor;
use crate::models::{DbValue, ProviderKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    DateTime,
    Date,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, provider: ProviderKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if provider == ProviderKind::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.starts_with("timestamp") || lower == "datetime" {
        return TypeCategory::DateTime;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    // Binary types
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row to Values Trait
// =============================================================================

/// Trait for converting database rows into driver-neutral values.
pub trait RowToValues {
    fn column_names(&self) -> Vec<String>;
    fn to_values(&self) -> Vec<DbValue>;
}

impl RowToValues for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_values(&self) -> Vec<DbValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, ProviderKind::MySQL);
                mysql::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToValues for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_values(&self) -> Vec<DbValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), ProviderKind::PostgreSQL);
                postgres::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl RowToValues for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_values(&self) -> Vec<DbValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| sqlite::decode_column(self, idx, col.type_info().name()))
            .collect()
    }
}

/// Collect fetched rows into a forward-only cursor.
///
/// Column names come from the first row; an empty result has no columns.
pub fn rows_to_cursor<R: RowToValues>(rows: &[R]) -> RowCursor {
    let columns = rows.first().map(|r| r.column_names()).unwrap_or_default();
    RowCursor::new(columns, rows.iter().map(RowToValues::to_values).collect())
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> DbValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::DateTime => decode_datetime(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            _ => decode_text(row, idx, type_name),
        }
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> DbValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => DbValue::Text(v.0),
            Ok(None) => DbValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                DbValue::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> DbValue {
        // Check NULL first
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Null;
        }
        // Try signed types
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Int(v);
        }
        // Try unsigned types
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            // Beyond i64 range keep the exact digits
            return i64::try_from(v)
                .map(DbValue::Int)
                .unwrap_or_else(|_| DbValue::Text(v.to_string()));
        }
        DbValue::Null
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bool)
            .unwrap_or(DbValue::Null)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return DbValue::Float(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return DbValue::Float(v.into());
        }
        DbValue::Null
    }

    fn decode_binary(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bytes)
            .unwrap_or(DbValue::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Json)
            .unwrap_or(DbValue::Null)
    }

    fn decode_datetime(row: &MySqlRow, idx: usize) -> DbValue {
        // DATETIME decodes naive, TIMESTAMP decodes as UTC
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return DbValue::DateTime(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return DbValue::DateTime(v.naive_utc());
        }
        DbValue::Null
    }

    fn decode_date(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Date)
            .unwrap_or(DbValue::Null)
    }

    fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
            // Check if this might be JSON
            if type_name.to_lowercase().contains("json") {
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(&v) {
                    return DbValue::Json(json);
                }
            }
            return DbValue::Text(v);
        }
        DbValue::Null
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> DbValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::DateTime => decode_datetime(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            _ => decode_text(row, idx),
        }
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> DbValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => DbValue::Text(v.0),
            Ok(None) => DbValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode NUMERIC: {:?}", e);
                DbValue::Null
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> DbValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Int(v);
        }
        DbValue::Null
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bool)
            .unwrap_or(DbValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return DbValue::Float(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return DbValue::Float(v.into());
        }
        DbValue::Null
    }

    fn decode_binary(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bytes)
            .unwrap_or(DbValue::Null)
    }

    fn decode_json(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Json)
            .unwrap_or(DbValue::Null)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Uuid)
            .unwrap_or(DbValue::Null)
    }

    fn decode_datetime(row: &PgRow, idx: usize) -> DbValue {
        // timestamp decodes naive, timestamptz decodes as UTC
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return DbValue::DateTime(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return DbValue::DateTime(v.naive_utc());
        }
        DbValue::Null
    }

    fn decode_date(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Date)
            .unwrap_or(DbValue::Null)
    }

    fn decode_text(row: &PgRow, idx: usize) -> DbValue {
        row.try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Text)
            .unwrap_or(DbValue::Null)
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, declared_type: &str) -> DbValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return DbValue::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(e) => {
                tracing::error!("Failed to read SQLite column {}: {:?}", idx, e);
                return DbValue::Null;
            }
        };

        // Declared affinity first, where SQLite stores the value in a generic class
        match categorize_type(declared_type, ProviderKind::SQLite) {
            TypeCategory::Boolean => {
                if let Ok(v) = row.try_get::<bool, _>(idx) {
                    return DbValue::Bool(v);
                }
            }
            TypeCategory::DateTime if storage == "TEXT" => {
                if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
                    return DbValue::DateTime(v);
                }
            }
            TypeCategory::Date if storage == "TEXT" => {
                if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
                    return DbValue::Date(v);
                }
            }
            _ => {}
        }

        match storage.as_str() {
            "INTEGER" => decode_integer(row, idx),
            "REAL" => decode_float(row, idx),
            "BLOB" => decode_binary(row, idx),
            _ => decode_text(row, idx, declared_type),
        }
    }

    fn decode_integer(row: &SqliteRow, idx: usize) -> DbValue {
        row.try_get::<i64, _>(idx)
            .map(DbValue::Int)
            .unwrap_or(DbValue::Null)
    }

    fn decode_float(row: &SqliteRow, idx: usize) -> DbValue {
        row.try_get::<f64, _>(idx)
            .map(DbValue::Float)
            .unwrap_or(DbValue::Null)
    }

    fn decode_binary(row: &SqliteRow, idx: usize) -> DbValue {
        row.try_get::<Vec<u8>, _>(idx)
            .map(DbValue::Bytes)
            .unwrap_or(DbValue::Null)
    }

    fn decode_text(row: &SqliteRow, idx: usize, declared_type: &str) -> DbValue {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            if declared_type.to_lowercase().contains("json") {
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(&v) {
                    return DbValue::Json(json);
                }
            }
            return DbValue::Text(v);
        }
        DbValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", ProviderKind::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", ProviderKind::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("SERIAL", ProviderKind::PostgreSQL),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("DECIMAL", ProviderKind::MySQL),
            TypeCategory::Decimal
        );
        // SQLite NUMERIC is a float
        assert_eq!(
            categorize_type("numeric", ProviderKind::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", ProviderKind::PostgreSQL),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("DATETIME", ProviderKind::SQLite),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("DATE", ProviderKind::MySQL),
            TypeCategory::Date
        );
    }

    #[test]
    fn test_categorize_type_other() {
        assert_eq!(
            categorize_type("jsonb", ProviderKind::PostgreSQL),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("uuid", ProviderKind::PostgreSQL),
            TypeCategory::Uuid
        );
        assert_eq!(
            categorize_type("VARCHAR", ProviderKind::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("BOOLEAN", ProviderKind::SQLite),
            TypeCategory::Boolean
        );
    }

    #[test]
    fn test_rows_to_cursor_empty() {
        let rows: Vec<SqliteRow> = Vec::new();
        let cursor = rows_to_cursor(&rows);
        assert!(cursor.columns().is_empty());
        assert_eq!(cursor.remaining(), 0);
    }
}
