//! # ORM
//!
//! Active-record mapping between Rust structs and SQL tables.
//!
//! - [`Field`] / [`Mapping`]: declarative column metadata and generated DDL
//! - [`Model`] / [`ActiveRecord`]: row marshalling and CRUD statements
//! - [`Db`]: the database collaborator executing them ([`SqliteDb`] bundled)

pub mod db;
pub mod field;
pub mod mapping;
pub mod model;
pub mod sqlite;
pub mod value;

pub use db::Db;
pub use field::{Field, FieldDefault, FieldType};
pub use mapping::{gen_sql, Mapping, MappingBuilder};
pub use model::{read_column, ActiveRecord, Model};
pub use sqlite::SqliteDb;
pub use value::{DbValue, FromValue, Row};
