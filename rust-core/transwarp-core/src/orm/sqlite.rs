//! # SQLite Backend
//!
//! [`Db`] implementation over an SQLx SQLite pool.
//!
//! `sqlite::memory:` gives every pooled connection its own database, so
//! in-memory pools should be opened with a single connection.

use super::db::Db;
use super::value::{DbValue, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::debug;

type Query<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    /// Connect to a SQLite database
    ///
    /// # Arguments
    ///
    /// * `url` - Database URL (e.g., "sqlite:mydb.db" or "sqlite::memory:")
    /// * `max_connections` - Maximum pool size (default: 10)
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` when the connection fails.
    pub async fn connect(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.unwrap_or(10))
            .connect(url)
            .await
            .map_err(|e| Error::Database {
                message: format!("SQLite connection failed: {e}"),
            })?;
        Ok(Self { pool })
    }

    /// Run a statement without arguments, e.g. DDL
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on query failure.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        self.update(sql, &[]).await
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind<'q>(sql: &'q str, args: &'q [DbValue]) -> Query<'q> {
    args.iter().fold(sqlx::query::<Sqlite>(sql), |query, arg| match arg {
        DbValue::Null => query.bind(None::<i64>),
        DbValue::Int(v) => query.bind(*v),
        DbValue::Float(v) => query.bind(*v),
        DbValue::String(v) => query.bind(v.as_str()),
        DbValue::Bool(v) => query.bind(*v),
        DbValue::Bytes(v) => query.bind(v.as_slice()),
    })
}

fn query_error(e: sqlx::Error) -> Error {
    Error::Database {
        message: format!("Query error: {e}"),
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn select(&self, sql: &str, args: &[DbValue]) -> Result<Vec<Row>> {
        debug!(sql = %sql, args = args.len(), "select");
        let rows: Vec<SqliteRow> = bind(sql, args)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn update(&self, sql: &str, args: &[DbValue]) -> Result<u64> {
        debug!(sql = %sql, args = args.len(), "update");
        let result = bind(sql, args)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }
}

/// Decode by declared type first, then by whatever the value can be read as
fn decode(row: &SqliteRow, i: usize, type_name: &str) -> DbValue {
    // SQLite hands NULL to any Rust type as its default value
    if row.try_get_raw(i).map_or(true, |raw| raw.is_null()) {
        return DbValue::Null;
    }
    let declared = match type_name {
        "INTEGER" => row.try_get::<i64, _>(i).map(DbValue::Int).ok(),
        "REAL" => row.try_get::<f64, _>(i).map(DbValue::Float).ok(),
        "BOOLEAN" => row.try_get::<bool, _>(i).map(DbValue::Bool).ok(),
        "TEXT" => row.try_get::<String, _>(i).map(DbValue::String).ok(),
        "BLOB" => row.try_get::<Vec<u8>, _>(i).map(DbValue::Bytes).ok(),
        _ => None,
    };
    declared
        .or_else(|| row.try_get::<i64, _>(i).map(DbValue::Int).ok())
        .or_else(|| row.try_get::<f64, _>(i).map(DbValue::Float).ok())
        .or_else(|| row.try_get::<String, _>(i).map(DbValue::String).ok())
        .or_else(|| row.try_get::<Vec<u8>, _>(i).map(DbValue::Bytes).ok())
        .unwrap_or(DbValue::Null)
}

fn row_to_map(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = decode(row, i, column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}
