//! # Entity Mapping
//!
//! A [`Mapping`] is the validated description of one model: table name,
//! fields in declaration order, the primary key and the generated DDL.
//!
//! Built once per model, usually by `#[derive(Model)]`:
//!
//! ```
//! use transwarp_core::orm::{Field, Mapping};
//!
//! let mapping = Mapping::builder("User")
//!     .field("id", Field::integer().primary_key())
//!     .field("name", Field::string())
//!     .build()
//!     .unwrap();
//! assert_eq!(mapping.table(), "user");
//! assert_eq!(mapping.primary_key().column(), "id");
//! ```

use super::field::Field;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{info, warn};

fn registry() -> &'static Mutex<HashSet<String>> {
    static MODELS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    MODELS.get_or_init(Mutex::default)
}

/// Builder for [`Mapping`]
#[derive(Debug)]
pub struct MappingBuilder {
    model: String,
    table: Option<String>,
    fields: Vec<(String, Field)>,
}

impl MappingBuilder {
    /// Override the table name
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add a field; unnamed fields take the attribute name
    #[must_use]
    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.fields.push((attr.into(), field));
        self
    }

    /// Validate and freeze the mapping
    ///
    /// # Errors
    ///
    /// - `Error::DuplicatePrimaryKey` when more than one field is a primary key
    /// - `Error::MissingPrimaryKey` when none is
    /// - `Error::MissingDdl` when a field has empty DDL
    pub fn build(self) -> Result<Mapping> {
        let Self {
            model,
            table,
            fields,
        } = self;

        let first = registry()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model.clone());
        if !first {
            warn!("Redefine class: {}", model);
        }
        info!("Scan ORMapping {}...", model);

        let mut primary_key = None;
        let mut mapped = Vec::with_capacity(fields.len());
        for (index, (attr, mut field)) in fields.into_iter().enumerate() {
            field.set_name_if_empty(&attr);
            info!("[MAPPING] Found mapping: {} => {}", attr, field);
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(Error::DuplicatePrimaryKey { model });
                }
                if field.is_updatable() {
                    warn!("NOTE: change primary key to non-updatable.");
                    field.set_updatable(false);
                }
                if field.is_nullable() {
                    warn!("NOTE: change primary key to non-nullable.");
                    field.set_nullable(false);
                }
                primary_key = Some(index);
            }
            mapped.push(field);
        }
        let primary_key = primary_key.ok_or_else(|| Error::MissingPrimaryKey {
            model: model.clone(),
        })?;

        let table = table.unwrap_or_else(|| model.to_lowercase());
        let sql = gen_sql(&table, &mapped)?;
        Ok(Mapping {
            model,
            table,
            fields: mapped,
            primary_key,
            sql,
        })
    }
}

/// Validated model description
#[derive(Debug, Clone)]
pub struct Mapping {
    model: String,
    table: String,
    fields: Vec<Field>,
    primary_key: usize,
    sql: String,
}

impl Mapping {
    /// Start a mapping for `model`
    #[must_use]
    pub fn builder(model: impl Into<String>) -> MappingBuilder {
        MappingBuilder {
            model: model.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Table name
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by column name
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column() == column)
    }

    /// The primary key field
    #[must_use]
    pub fn primary_key(&self) -> &Field {
        &self.fields[self.primary_key]
    }

    /// `create table` statement
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Generate the `create table` DDL for `table`
///
/// # Errors
///
/// Returns `Error::MissingDdl` for a field without DDL.
pub fn gen_sql(table: &str, fields: &[Field]) -> Result<String> {
    let mut pk = "";
    let mut sql = vec![
        format!("-- generating SQL for {table}:"),
        format!("create table `{table}` ("),
    ];
    for field in fields {
        if field.column_ddl().is_empty() {
            return Err(Error::MissingDdl {
                field: field.column().to_string(),
            });
        }
        if field.is_primary_key() {
            pk = field.column();
        }
        if field.is_nullable() {
            sql.push(format!("  `{}` {},", field.column(), field.column_ddl()));
        } else {
            sql.push(format!("  `{}` {} not null,", field.column(), field.column_ddl()));
        }
    }
    sql.push(format!("  primary key(`{pk}`)"));
    sql.push(");".to_string());
    Ok(sql.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> MappingBuilder {
        Mapping::builder("User")
            .field("id", Field::integer().primary_key())
            .field("name", Field::string())
            .field("email", Field::string().ddl("varchar(50)").nullable())
            .field("last_modified", Field::float())
    }

    #[test]
    fn test_generated_sql() {
        let mapping = user().table("users").build().unwrap();
        assert_eq!(
            mapping.sql(),
            "-- generating SQL for users:\n\
             create table `users` (\n  \
             `id` bigint not null,\n  \
             `name` varchar(255) not null,\n  \
             `email` varchar(50),\n  \
             `last_modified` real not null,\n  \
             primary key(`id`)\n\
             );"
        );
    }

    #[test]
    fn test_table_defaults_to_lowercase_model() {
        let mapping = user().build().unwrap();
        assert_eq!(mapping.model(), "User");
        assert_eq!(mapping.table(), "user");
        assert_eq!(mapping.fields().len(), 4);
        assert!(mapping.field("email").is_some());
    }

    #[test]
    fn test_primary_key_is_coerced() {
        let mapping = Mapping::builder("Coerced")
            .field("id", Field::string().primary_key().nullable().updatable(true))
            .build()
            .unwrap();
        let pk = mapping.primary_key();
        assert!(!pk.is_updatable());
        assert!(!pk.is_nullable());
        assert!(mapping.sql().contains("`id` varchar(255) not null,"));
    }

    #[test]
    fn test_explicit_column_name_wins() {
        let mapping = Mapping::builder("Named")
            .field("id", Field::integer().primary_key().name("user_id"))
            .build()
            .unwrap();
        assert_eq!(mapping.primary_key().column(), "user_id");
        assert!(mapping.sql().contains("primary key(`user_id`)"));
    }

    #[test]
    fn test_missing_primary_key() {
        let err = Mapping::builder("NoKey")
            .field("name", Field::string())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Primary key not defined in class: NoKey");
    }

    #[test]
    fn test_duplicate_primary_key() {
        let err = Mapping::builder("TwoKeys")
            .field("a", Field::integer().primary_key())
            .field("b", Field::integer().primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePrimaryKey { .. }));
    }

    #[test]
    fn test_missing_ddl() {
        let err = Mapping::builder("NoDdl")
            .field("id", Field::integer().primary_key())
            .field("raw", Field::new())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "no ddl in field \"raw\".");
    }

    #[test]
    fn test_redefinition_still_builds() {
        assert!(user().build().is_ok());
        assert!(user().build().is_ok());
    }
}
