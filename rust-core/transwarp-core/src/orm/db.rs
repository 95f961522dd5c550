//! # Database Access
//!
//! The ORM only builds SQL and marshals rows. Executing statements is the job
//! of a [`Db`] implementation; [`SqliteDb`](super::sqlite::SqliteDb) is the
//! bundled one. Statements use `?` placeholders and backtick-quoted names.

use super::value::{DbValue, FromValue, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Build ``insert into `t` (`a`,`b`) values (?,?)``
#[must_use]
pub fn insert_sql(table: &str, columns: &[(String, DbValue)]) -> String {
    let names = columns
        .iter()
        .map(|(name, _)| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(",");
    let marks = vec!["?"; columns.len()].join(",");
    format!("insert into `{table}` ({names}) values ({marks})")
}

/// Database-access collaborator
#[async_trait]
pub trait Db: Send + Sync {
    /// Run a query and return every row
    async fn select(&self, sql: &str, args: &[DbValue]) -> Result<Vec<Row>>;

    /// Run a statement and return the number of affected rows
    async fn update(&self, sql: &str, args: &[DbValue]) -> Result<u64>;

    /// First row of a query, if any
    async fn select_one(&self, sql: &str, args: &[DbValue]) -> Result<Option<Row>> {
        Ok(self.select(sql, args).await?.into_iter().next())
    }

    /// Single integer result, e.g. a `count(...)`
    async fn select_int(&self, sql: &str, args: &[DbValue]) -> Result<i64> {
        let row = self
            .select_one(sql, args)
            .await?
            .ok_or_else(|| Error::Database {
                message: format!("no row returned by: {sql}"),
            })?;
        let value = row.values().next().ok_or_else(|| Error::Database {
            message: format!("no column returned by: {sql}"),
        })?;
        i64::from_value(value)
    }

    /// Insert one row into `table`
    async fn insert(&self, table: &str, columns: &[(String, DbValue)]) -> Result<u64> {
        let args: Vec<DbValue> = columns.iter().map(|(_, v)| v.clone()).collect();
        self.update(&insert_sql(table, columns), &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<DbValue>)>>,
    }

    #[async_trait]
    impl Db for Recorder {
        async fn select(&self, sql: &str, args: &[DbValue]) -> Result<Vec<Row>> {
            self.calls.lock().unwrap().push((sql.to_string(), args.to_vec()));
            Ok(vec![HashMap::from([("n".to_string(), DbValue::Int(3))])])
        }

        async fn update(&self, sql: &str, args: &[DbValue]) -> Result<u64> {
            self.calls.lock().unwrap().push((sql.to_string(), args.to_vec()));
            Ok(1)
        }
    }

    #[test]
    fn test_insert_sql() {
        let cols = vec![
            ("id".to_string(), DbValue::Int(1)),
            ("name".to_string(), DbValue::from("a")),
        ];
        assert_eq!(
            insert_sql("user", &cols),
            "insert into `user` (`id`,`name`) values (?,?)"
        );
    }

    #[tokio::test]
    async fn test_default_insert_goes_through_update() {
        let db = Recorder::default();
        let cols = vec![("id".to_string(), DbValue::Int(1))];
        assert_eq!(db.insert("t", &cols).await.unwrap(), 1);
        let calls = db.calls.lock().unwrap();
        assert_eq!(calls[0].0, "insert into `t` (`id`) values (?)");
        assert_eq!(calls[0].1, vec![DbValue::Int(1)]);
    }

    #[test]
    fn test_select_int_reads_first_column() {
        let db = Recorder::default();
        let n = tokio_test::block_on(db.select_int("select count(*) from t", &[])).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_select_one_takes_first_row() {
        let db = Recorder::default();
        let row = tokio_test::block_on(db.select_one("select 1", &[])).unwrap();
        assert_eq!(row.unwrap()["n"], DbValue::Int(3));
    }
}
