//! # Robomodel - schema-reconciling record persistence
//!
//! Save plain Rust structs into SQLite without writing SQL or migrations.
//!
//! Robomodel provides:
//! - A static attribute descriptor table per record type (`#[derive(Model)]`)
//! - A field codec lowering typed attributes to SQLite primitives and back,
//!   with a JSON text fallback for opaque values
//! - A schema reconciler that creates tables lazily and widens them with
//!   new columns when a record type grows
//! - Record lifecycle (save/delete/load/reload) and a per-type query manager,
//!   both repairing a missing table or column once and retrying
//!
//! ```no_run
//! use robomodel::{Context, Manager, Model};
//!
//! #[derive(Debug, Default, Model, serde::Serialize, serde::Deserialize)]
//! pub struct Note {
//!     pub title: String,
//!     pub pinned: bool,
//! }
//!
//! let context = Context::in_memory();
//! let notes = Manager::<Note>::new(&context);
//! let mut note = notes.create();
//! note.title = "Groceries".to_string();
//! note.save()?;
//! assert_eq!(notes.count()?, 1);
//! # Ok::<(), robomodel::Error>(())
//! ```

// Lets the derive macros refer to `::robomodel` from inside this crate too.
extern crate self as robomodel;

pub mod codec;
pub mod collection;
pub mod config;
pub mod context;
pub mod field;
pub mod manager;
pub mod record;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use codec::{EnumField, FieldCodec, Json, Reject};
pub use collection::Collection;
pub use context::Context;
pub use field::{Field, FieldMeta, Model, ModelMeta, Schema, SchemaCell, StorageType};
pub use manager::Manager;
pub use record::{Record, State, UNSAVED_ID};
pub use robomodel_derive::{Model, ModelEnum};
pub use storage::{Query, Reconciliation, SqliteStore, Values};

/// Result type alias for Robomodel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Robomodel operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed record-type metadata. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No {type_name} record with id {id}")]
    NotFound { type_name: String, id: i64 },

    #[error("No {type_name} record with {criteria}")]
    NoMatch { type_name: String, criteria: String },

    #[error("Table for {type_name} is empty")]
    Empty { type_name: String },

    /// A table or column the statement needs does not exist yet.
    /// Repaired by reconciliation at most once per operation.
    #[error("Missing schema: {source}")]
    MissingSchema { source: rusqlite::Error },

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Field {field} ({declared_type}): {source}")]
    Codec {
        field: String,
        declared_type: String,
        #[source]
        source: Reject,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    State(&'static str),

    /// A store handle is still held outside the registry.
    #[error("Database {0} is still in use and can not be closed")]
    InUse(String),

    #[error("Record id can not be negative: {0}")]
    InvalidId(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the missing table / missing column condition.
    pub fn is_repairable(&self) -> bool {
        matches!(self, Error::MissingSchema { .. })
    }

    /// True when a lookup found nothing. Callers are expected to handle these.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::NoMatch { .. } | Error::Empty { .. }
        )
    }

    /// Demotes a repairable error to a fatal storage error.
    pub(crate) fn into_fatal(self) -> Self {
        match self {
            Error::MissingSchema { source } => Error::Storage(source),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        if storage::is_missing_schema(&e) {
            Error::MissingSchema { source: e }
        } else {
            Error::Storage(e)
        }
    }
}
