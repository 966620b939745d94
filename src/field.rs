//! Field introspection - the static attribute descriptor table
//!
//! Every record type owns one [`Schema`], built once and cached for the life
//! of the process. A schema lists the persistable attributes in declaration
//! order, each with its storage classification and an encode/decode accessor
//! pair. `#[derive(Model)]` generates the table; hand-written impls can build
//! one with [`Schema::build`].

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::types::{Value, ValueRef};

use crate::codec::Reject;
use crate::storage::{Row, Values, ID_COLUMN};
use crate::{Error, Result};

/// Column type a persistable attribute is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Text,
    Boolean,
    Integer,
    Real,
}

impl StorageType {
    /// Type token used in generated DDL
    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageType::Text => "TEXT",
            StorageType::Boolean => "BOOLEAN",
            StorageType::Integer => "INTEGER",
            StorageType::Real => "REAL",
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Static metadata for one declared attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    /// Attribute name, used verbatim as the column name
    pub name: &'static str,
    /// Rust type of the attribute, for error reports
    pub declared_type: &'static str,
    pub storage: StorageType,
    /// Declared `pub`
    pub public: bool,
    /// Explicitly marked for saving
    pub save: bool,
    /// Explicitly excluded; wins over everything else
    pub exclude: bool,
}

impl FieldMeta {
    /// A private, unmarked attribute.
    pub fn new(name: &'static str, declared_type: &'static str, storage: StorageType) -> Self {
        Self {
            name,
            declared_type,
            storage,
            public: false,
            save: false,
            exclude: false,
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn save(mut self) -> Self {
        self.save = true;
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Inclusion policy: saved if marked `save`, or if public while the type
    /// is not in whitelist mode. `exclude` always wins.
    pub fn is_persistable(&self, exclude_by_default: bool) -> bool {
        (self.save || (!exclude_by_default && self.public)) && !self.exclude
    }
}

/// Type-level metadata of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMeta {
    /// Simple type name, used in error messages
    pub type_name: &'static str,
    pub table: &'static str,
    /// Database the type lives in; `None` uses the context default
    pub database: Option<&'static str>,
    /// Whitelist mode: only `save`-marked attributes are persisted
    pub exclude_by_default: bool,
}

impl ModelMeta {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: type_name,
            database: None,
            exclude_by_default: false,
        }
    }
}

pub type Encoder<T> = fn(&T) -> std::result::Result<Option<Value>, Reject>;
pub type Decoder<T> = fn(&mut T, ValueRef<'_>) -> std::result::Result<(), Reject>;

/// One entry of the descriptor table.
pub struct Field<T> {
    meta: FieldMeta,
    accessors: Option<(Encoder<T>, Decoder<T>)>,
}

impl<T> Field<T> {
    pub fn new(meta: FieldMeta, encode: Encoder<T>, decode: Decoder<T>) -> Self {
        Self {
            meta,
            accessors: Some((encode, decode)),
        }
    }

    /// A declared attribute the inclusion policy never selects.
    pub fn skipped(meta: FieldMeta) -> Self {
        Self {
            meta,
            accessors: None,
        }
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub fn name(&self) -> &'static str {
        self.meta.name
    }

    /// Lower the attribute of `record` to a storage primitive.
    /// `None` means the attribute is omitted from the written values.
    pub fn encode(&self, record: &T) -> Result<Option<Value>> {
        let (encode, _) = self.accessors()?;
        encode(record).map_err(|source| self.codec_error(source))
    }

    /// Assign the attribute of `record` from a stored primitive.
    pub fn decode(&self, record: &mut T, value: ValueRef<'_>) -> Result<()> {
        let (_, decode) = self.accessors()?;
        decode(record, value).map_err(|source| self.codec_error(source))
    }

    fn accessors(&self) -> Result<(Encoder<T>, Decoder<T>)> {
        self.accessors.ok_or_else(|| {
            Error::Configuration(format!("field {} has no codec accessors", self.meta.name))
        })
    }

    fn codec_error(&self, source: Reject) -> Error {
        Error::Codec {
            field: self.meta.name.to_string(),
            declared_type: self.meta.declared_type.to_string(),
            source,
        }
    }
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("meta", &self.meta)
            .field("codec", &self.accessors.is_some())
            .finish()
    }
}

/// The persistable attributes of a record type, in declaration order.
#[derive(Debug)]
pub struct Schema<T> {
    meta: ModelMeta,
    fields: Vec<Field<T>>,
    columns: Vec<FieldMeta>,
}

impl<T> Schema<T> {
    /// Applies the inclusion policy to `declared` and validates the result.
    ///
    /// Fails with [`Error::Configuration`] on an empty table name, names that
    /// collide case-insensitively, a persisted attribute named like the
    /// identity column, or a selected attribute without accessors. Table and
    /// column names go into SQL unquoted, so they must be plain identifiers
    /// and not reserved words.
    pub fn build(meta: ModelMeta, declared: Vec<Field<T>>) -> Result<Self> {
        if meta.table.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "{} has an empty table name",
                meta.type_name
            )));
        }
        check_identifier(meta.type_name, "table", meta.table)?;

        let mut seen = HashSet::new();
        for field in &declared {
            if !seen.insert(field.name().to_lowercase()) {
                return Err(Error::Configuration(format!(
                    "{} declares attribute {} more than once (names are case-insensitive)",
                    meta.type_name,
                    field.name()
                )));
            }
        }

        let fields: Vec<Field<T>> = declared
            .into_iter()
            .filter(|field| field.meta.is_persistable(meta.exclude_by_default))
            .collect();

        for field in &fields {
            if field.name().eq_ignore_ascii_case(ID_COLUMN) {
                return Err(Error::Configuration(format!(
                    "{}.{} collides with the identity column",
                    meta.type_name,
                    field.name()
                )));
            }
            check_identifier(meta.type_name, "column", field.name())?;
            if field.accessors.is_none() {
                return Err(Error::Configuration(format!(
                    "{}.{} is persistable but has no codec accessors",
                    meta.type_name,
                    field.name()
                )));
            }
        }

        let columns = fields.iter().map(|field| field.meta.clone()).collect();
        Ok(Self {
            meta,
            fields,
            columns,
        })
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn type_name(&self) -> &'static str {
        self.meta.type_name
    }

    pub fn table(&self) -> &'static str {
        self.meta.table
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// Metadata of the persistable attributes, as the reconciler wants them.
    pub fn columns(&self) -> &[FieldMeta] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(Field::name)
    }

    /// Case-insensitive lookup, matching how the store resolves columns.
    pub fn field(&self, column: &str) -> Option<&Field<T>> {
        self.fields
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(column))
    }

    /// Encode every persistable attribute into a name to value map.
    pub fn encode(&self, record: &T) -> Result<Values> {
        let mut values = Values::with_capacity(self.fields.len());
        for field in &self.fields {
            if let Some(value) = field.encode(record)? {
                values.put(field.name(), value);
            }
        }
        Ok(values)
    }

    /// Decode every known column of `row` into `record`, skipping the identity.
    pub fn decode_row(&self, record: &mut T, row: &Row) -> Result<()> {
        for (column, value) in row.iter() {
            if column.eq_ignore_ascii_case(ID_COLUMN) {
                continue;
            }
            match self.field(column) {
                Some(field) => field.decode(record, value.into())?,
                None => tracing::trace!(
                    table = self.meta.table,
                    column,
                    "column has no matching attribute"
                ),
            }
        }
        Ok(())
    }
}

/// A record type whose instances can be persisted.
pub trait Model: Default + 'static {
    /// The cached descriptor table of this type.
    fn schema() -> Result<&'static Schema<Self>>;
}

/// Process-wide cache for one type's schema. A failed build is cached too.
pub struct SchemaCell<T> {
    cell: OnceLock<std::result::Result<Schema<T>, String>>,
}

impl<T> SchemaCell<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_build(
        &'static self,
        build: impl FnOnce() -> Result<Schema<T>>,
    ) -> Result<&'static Schema<T>> {
        self.cell
            .get_or_init(|| {
                build().map_err(|e| match e {
                    Error::Configuration(message) => message,
                    other => other.to_string(),
                })
            })
            .as_ref()
            .map_err(|message| Error::Configuration(message.clone()))
    }
}

impl<T> Default for SchemaCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Words SQLite never accepts as a bare name.
const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "AUTOINCREMENT", "BETWEEN", "CASE", "CHECK",
    "COLLATE", "COMMIT", "CONSTRAINT", "CREATE", "DEFAULT", "DEFERRABLE", "DELETE",
    "DISTINCT", "DROP", "ELSE", "ESCAPE", "EXCEPT", "EXISTS", "FOREIGN", "FROM", "GROUP",
    "HAVING", "IN", "INDEX", "INDEXED", "INSERT", "INTERSECT", "INTO", "IS", "ISNULL",
    "JOIN", "LIMIT", "NOT", "NOTHING", "NOTNULL", "NULL", "ON", "OR", "ORDER", "PRIMARY",
    "REFERENCES", "RETURNING", "SELECT", "SET", "TABLE", "THEN", "TO", "TRANSACTION",
    "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WINDOW",
];

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

fn check_identifier(type_name: &str, kind: &str, name: &str) -> Result<()> {
    if !identifier_pattern().is_some_and(|pattern| pattern.is_match(name)) {
        return Err(Error::Configuration(format!(
            "{}: {} name {:?} is not a plain identifier",
            type_name, kind, name
        )));
    }
    if RESERVED_WORDS
        .iter()
        .any(|word| word.eq_ignore_ascii_case(name))
    {
        return Err(Error::Configuration(format!(
            "{}: {} name {} is an SQL keyword",
            type_name, kind, name
        )));
    }
    Ok(())
}
