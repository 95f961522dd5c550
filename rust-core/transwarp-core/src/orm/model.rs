//! # Active Record
//!
//! [`Model`] ties a Rust struct to its [`Mapping`]; [`ActiveRecord`] adds the
//! query and persistence operations to every model.
//!
//! | operation       | SQL                                              |
//! |-----------------|--------------------------------------------------|
//! | `get`           | ``select * from `t` where `pk`=?``               |
//! | `find_first`    | ``select * from `t` <where>``  (first row)       |
//! | `find_all`      | ``select * from `t` ``                           |
//! | `find_by`       | ``select * from `t` <where>``                    |
//! | `count_all`     | ``select count(`pk`) from `t` ``                 |
//! | `count_by`      | ``select count(`pk`) from `t` <where>``          |
//! | `insert`        | ``insert into `t` (`a`,...) values (?,...)``     |
//! | `update`        | ``update `t` set `a`=?,... where `pk`=?``        |
//! | `delete`        | ``delete from `t` where `pk`=?``                 |
//!
//! `<where>` is passed verbatim and includes the `where` keyword.

use super::db::Db;
use super::mapping::Mapping;
use super::value::{DbValue, FromValue, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// A struct persisted through a [`Mapping`]
pub trait Model: Sized + Send + Sync + 'static {
    /// Validated mapping, built once per model
    fn mapping() -> &'static Mapping;

    /// Current values keyed by column name
    fn to_row(&self) -> Row;

    /// Build a model from a database row
    ///
    /// # Errors
    ///
    /// Returns `Error::ValueType` when a column cannot be converted.
    fn from_row(row: &Row) -> Result<Self>;

    /// Runs before `insert`
    fn pre_insert(&mut self) {}

    /// Runs before `update`
    fn pre_update(&mut self) {}

    /// Runs before `delete`
    fn pre_delete(&mut self) {}
}

/// Read `column` from `row`, falling back to the field default when the row lacks it
///
/// # Errors
///
/// Returns `Error::MissingColumn` when the column is neither in the row nor
/// in the mapping, and `Error::ValueType` when conversion fails.
pub fn read_column<T: FromValue>(mapping: &Mapping, row: &Row, column: &str) -> Result<T> {
    match row.get(column) {
        Some(value) => T::from_value(value),
        None => {
            let field = mapping.field(column).ok_or_else(|| Error::MissingColumn {
                column: column.to_string(),
            })?;
            T::from_value(&field.default_value())
        }
    }
}

fn value_of(mapping: &Mapping, row: &mut Row, column: &str) -> DbValue {
    row.remove(column)
        .or_else(|| mapping.field(column).map(super::field::Field::default_value))
        .unwrap_or(DbValue::Null)
}

/// Query and persistence operations, available on every [`Model`]
#[async_trait]
pub trait ActiveRecord: Model {
    /// Fetch by primary key
    async fn get<K>(db: &dyn Db, pk: K) -> Result<Option<Self>>
    where
        K: Into<DbValue> + Send;

    /// First row matching `where_clause`
    async fn find_first(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<Option<Self>>;

    /// Every row of the table
    async fn find_all(db: &dyn Db) -> Result<Vec<Self>>;

    /// Every row matching `where_clause`
    async fn find_by(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<Vec<Self>>;

    /// Number of rows in the table
    async fn count_all(db: &dyn Db) -> Result<i64>;

    /// Number of rows matching `where_clause`
    async fn count_by(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<i64>;

    /// Insert the insertable fields, after `pre_insert`
    async fn insert(&mut self, db: &dyn Db) -> Result<()>;

    /// Update the updatable fields by primary key, after `pre_update`
    async fn update(&mut self, db: &dyn Db) -> Result<u64>;

    /// Delete by primary key, after `pre_delete`
    async fn delete(&mut self, db: &dyn Db) -> Result<u64>;
}

#[async_trait]
impl<M: Model> ActiveRecord for M {
    async fn get<K>(db: &dyn Db, pk: K) -> Result<Option<Self>>
    where
        K: Into<DbValue> + Send,
    {
        let m = Self::mapping();
        let sql = format!(
            "select * from `{}` where `{}`=?",
            m.table(),
            m.primary_key().column()
        );
        db.select_one(&sql, &[pk.into()])
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    async fn find_first(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<Option<Self>> {
        let sql = format!("select * from `{}` {where_clause}", Self::mapping().table());
        db.select_one(&sql, args)
            .await?
            .map(|row| Self::from_row(&row))
            .transpose()
    }

    async fn find_all(db: &dyn Db) -> Result<Vec<Self>> {
        let sql = format!("select * from `{}`", Self::mapping().table());
        db.select(&sql, &[])
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    async fn find_by(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<Vec<Self>> {
        let sql = format!("select * from `{}` {where_clause}", Self::mapping().table());
        db.select(&sql, args)
            .await?
            .iter()
            .map(Self::from_row)
            .collect()
    }

    async fn count_all(db: &dyn Db) -> Result<i64> {
        let m = Self::mapping();
        let sql = format!(
            "select count(`{}`) from `{}`",
            m.primary_key().column(),
            m.table()
        );
        db.select_int(&sql, &[]).await
    }

    async fn count_by(db: &dyn Db, where_clause: &str, args: &[DbValue]) -> Result<i64> {
        let m = Self::mapping();
        let sql = format!(
            "select count(`{}`) from `{}` {where_clause}",
            m.primary_key().column(),
            m.table()
        );
        db.select_int(&sql, args).await
    }

    async fn insert(&mut self, db: &dyn Db) -> Result<()> {
        self.pre_insert();
        let m = Self::mapping();
        let mut row = self.to_row();
        let columns: Vec<(String, DbValue)> = m
            .fields()
            .iter()
            .filter(|f| f.is_insertable())
            .map(|f| (f.column().to_string(), value_of(m, &mut row, f.column())))
            .collect();
        db.insert(m.table(), &columns).await?;
        Ok(())
    }

    async fn update(&mut self, db: &dyn Db) -> Result<u64> {
        self.pre_update();
        let m = Self::mapping();
        let pk = m.primary_key().column();
        let mut row = self.to_row();

        let (assignments, mut args): (Vec<String>, Vec<DbValue>) = m
            .fields()
            .iter()
            .filter(|f| f.is_updatable())
            .map(|f| (format!("`{}`=?", f.column()), value_of(m, &mut row, f.column())))
            .unzip();
        if assignments.is_empty() {
            return Ok(0);
        }
        args.push(value_of(m, &mut row, pk));

        let sql = format!(
            "update `{}` set {} where `{pk}`=?",
            m.table(),
            assignments.join(",")
        );
        db.update(&sql, &args).await
    }

    async fn delete(&mut self, db: &dyn Db) -> Result<u64> {
        self.pre_delete();
        let m = Self::mapping();
        let pk = m.primary_key().column();
        let mut row = self.to_row();
        let sql = format!("delete from `{}` where `{pk}`=?", m.table());
        db.update(&sql, &[value_of(m, &mut row, pk)]).await
    }
}
