//! Field metadata: column name, default, flags and DDL.

use super::value::DbValue;
use std::fmt;

/// Default value of a field, either fixed or computed on each read
#[derive(Debug, Clone)]
pub enum FieldDefault {
    /// Fixed value
    Value(DbValue),
    /// Function evaluated every time the default is read
    Computed(fn() -> DbValue),
}

/// Column metadata for one model attribute
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    default: FieldDefault,
    primary_key: bool,
    nullable: bool,
    updatable: bool,
    insertable: bool,
    ddl: String,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            name: String::new(),
            default: FieldDefault::Value(DbValue::Null),
            primary_key: false,
            nullable: false,
            updatable: true,
            insertable: true,
            ddl: String::new(),
        }
    }
}

impl Field {
    /// Untyped field: `NULL` default, no DDL
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn typed(default: DbValue, ddl: &str) -> Self {
        Self {
            default: FieldDefault::Value(default),
            ddl: ddl.to_string(),
            ..Self::default()
        }
    }

    /// `varchar(255)`, default `''`
    #[must_use]
    pub fn string() -> Self {
        Self::typed(DbValue::String(String::new()), "varchar(255)")
    }

    /// `bigint`, default `0`
    #[must_use]
    pub fn integer() -> Self {
        Self::typed(DbValue::Int(0), "bigint")
    }

    /// `real`, default `0.0`
    #[must_use]
    pub fn float() -> Self {
        Self::typed(DbValue::Float(0.0), "real")
    }

    /// `bool`, default `false`
    #[must_use]
    pub fn boolean() -> Self {
        Self::typed(DbValue::Bool(false), "bool")
    }

    /// `text`, default `''`
    #[must_use]
    pub fn text() -> Self {
        Self::typed(DbValue::String(String::new()), "text")
    }

    /// `blob`, default empty
    #[must_use]
    pub fn blob() -> Self {
        Self::typed(DbValue::Bytes(Vec::new()), "blob")
    }

    /// Set the column name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fixed default value
    #[must_use]
    pub fn with_default(mut self, value: impl Into<DbValue>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Default computed on each read, e.g. a timestamp
    #[must_use]
    pub fn with_default_fn(mut self, f: fn() -> DbValue) -> Self {
        self.default = FieldDefault::Computed(f);
        self
    }

    /// Mark as the primary key
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allow `NULL`
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether updates write this column
    #[must_use]
    pub fn updatable(mut self, updatable: bool) -> Self {
        self.updatable = updatable;
        self
    }

    /// Whether inserts write this column
    #[must_use]
    pub fn insertable(mut self, insertable: bool) -> Self {
        self.insertable = insertable;
        self
    }

    /// Column DDL, e.g. `varchar(50)`
    #[must_use]
    pub fn ddl(mut self, ddl: impl Into<String>) -> Self {
        self.ddl = ddl.into();
        self
    }

    /// Column name
    #[must_use]
    pub fn column(&self) -> &str {
        &self.name
    }

    /// Evaluate the default
    #[must_use]
    pub fn default_value(&self) -> DbValue {
        match &self.default {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Computed(f) => f(),
        }
    }

    /// Primary key flag
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Nullable flag
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Updatable flag
    #[must_use]
    pub const fn is_updatable(&self) -> bool {
        self.updatable
    }

    /// Insertable flag
    #[must_use]
    pub const fn is_insertable(&self) -> bool {
        self.insertable
    }

    /// Column DDL
    #[must_use]
    pub fn column_ddl(&self) -> &str {
        &self.ddl
    }

    pub(crate) fn set_updatable(&mut self, updatable: bool) {
        self.updatable = updatable;
    }

    pub(crate) fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    pub(crate) fn set_name_if_empty(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = String::new();
        if self.nullable {
            flags.push('N');
        }
        if self.updatable {
            flags.push('U');
        }
        if self.insertable {
            flags.push('I');
        }
        let default = match &self.default {
            FieldDefault::Value(v) => format!("{v:?}"),
            FieldDefault::Computed(_) => "fn".to_string(),
        };
        write!(f, "<Field:{},{},default({default}),{flags}>", self.name, self.ddl)
    }
}

/// Rust types with a natural column mapping
///
/// `Option<T>` maps to the nullable variant of `T`'s field with a `NULL` default.
pub trait FieldType {
    /// Field metadata for the type
    fn field() -> Field;
}

impl FieldType for String {
    fn field() -> Field {
        Field::string()
    }
}

impl FieldType for i64 {
    fn field() -> Field {
        Field::integer()
    }
}

impl FieldType for i32 {
    fn field() -> Field {
        Field::integer()
    }
}

impl FieldType for f64 {
    fn field() -> Field {
        Field::float()
    }
}

impl FieldType for bool {
    fn field() -> Field {
        Field::boolean()
    }
}

impl FieldType for Vec<u8> {
    fn field() -> Field {
        Field::blob()
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn field() -> Field {
        T::field().nullable().with_default(DbValue::Null)
    }
}
