//! Parameter binding utilities for database queries.
//!
//! This module binds `DbValue` parameters to database-specific query objects.

use crate::models::DbValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q DbValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        DbValue::Null => query.bind(None::<String>),
        DbValue::Bool(v) => query.bind(*v),
        DbValue::Int(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::Text(v) => query.bind(v.as_str()),
        DbValue::Bytes(v) => query.bind(v.as_slice()),
        // Stored as CHAR(36) by convention
        DbValue::Uuid(v) => query.bind(v.hyphenated().to_string()),
        DbValue::DateTime(v) => query.bind(*v),
        DbValue::Date(v) => query.bind(*v),
        DbValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q DbValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        DbValue::Null => query.bind(None::<String>),
        DbValue::Bool(v) => query.bind(*v),
        DbValue::Int(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::Text(v) => query.bind(v.as_str()),
        DbValue::Bytes(v) => query.bind(v.as_slice()),
        DbValue::Uuid(v) => query.bind(*v),
        DbValue::DateTime(v) => query.bind(*v),
        DbValue::Date(v) => query.bind(*v),
        DbValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q DbValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        DbValue::Null => query.bind(None::<String>),
        DbValue::Bool(v) => query.bind(*v),
        DbValue::Int(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::Text(v) => query.bind(v.as_str()),
        DbValue::Bytes(v) => query.bind(v.as_slice()),
        // SQLite has no native UUID or JSON type, store as text
        DbValue::Uuid(v) => query.bind(v.hyphenated().to_string()),
        DbValue::DateTime(v) => query.bind(*v),
        DbValue::Date(v) => query.bind(*v),
        DbValue::Json(v) => query.bind(v.to_string()),
    }
}
