//! Storage layer: the SQLite boundary, the schema reconciler and the store registry

pub mod registry;
pub mod schema;
pub mod sqlite;

pub use registry::{Location, Registry};
pub use schema::{
    add_column_sql, create_table_sql, drop_table_sql, reconcile, where_id, with_repair,
    Reconciliation, ID_COLUMN,
};
pub use sqlite::{display_value, is_missing_schema, ColumnInfo, Query, Row, SqliteStore, Values};
