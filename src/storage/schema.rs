//! Table reconciliation
//!
//! Tables are created lazily and widened on demand: a table always has at
//! least one column per persistable attribute plus the identity column.
//! Columns are never dropped or retyped.

use std::collections::HashSet;

use crate::field::FieldMeta;
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Name of the store-assigned identity column
pub const ID_COLUMN: &str = "_id";

/// What a call to [`reconcile`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The table did not exist and was created
    Created,
    /// These columns were added, in order
    Widened(Vec<String>),
    /// Every attribute already had a column
    Unchanged,
}

/// Data columns in attribute order, then the identity column.
pub fn create_table_sql(table: &str, fields: &[FieldMeta]) -> String {
    let mut sql = format!("CREATE TABLE {} (", table);
    for field in fields {
        sql.push_str(field.name);
        sql.push(' ');
        sql.push_str(field.storage.as_sql());
        sql.push_str(", ");
    }
    sql.push_str(ID_COLUMN);
    sql.push_str(" integer primary key autoincrement)");
    sql
}

pub fn add_column_sql(table: &str, field: &FieldMeta) -> String {
    format!("ALTER TABLE {} ADD {} {};", table, field.name, field.storage.as_sql())
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", table)
}

/// Identity predicate: `_id = <id>`
pub fn where_id(id: i64) -> String {
    format!("{} = {}", ID_COLUMN, id)
}

/// Create `table` or add the columns it lacks for `fields`.
///
/// Existing columns are left alone even when their declared type no longer
/// matches the attribute's classification.
pub fn reconcile(store: &SqliteStore, table: &str, fields: &[FieldMeta]) -> Result<Reconciliation> {
    tracing::debug!("Fixing table {}...", table);

    let existing = store.table_columns(table)?;
    if existing.is_empty() {
        let sql = create_table_sql(table, fields);
        tracing::debug!("Creating table: {}", sql);
        store.execute(&sql)?;
        return Ok(Reconciliation::Created);
    }

    // TODO: report columns whose declared type drifted from the attribute's storage type
    let known: HashSet<String> = existing
        .iter()
        .map(|column| column.name.to_lowercase())
        .collect();

    let mut added = Vec::new();
    for field in fields {
        if known.contains(&field.name.to_lowercase()) {
            continue;
        }
        let sql = add_column_sql(table, field);
        tracing::debug!("Adding column: {}", sql);
        store.execute(&sql)?;
        added.push(field.name.to_string());
    }

    if added.is_empty() {
        Ok(Reconciliation::Unchanged)
    } else {
        Ok(Reconciliation::Widened(added))
    }
}

/// Run `attempt`; if it fails on a missing table or column, reconcile
/// `table` with `fields` and run it exactly once more.
///
/// A repairable failure on the second attempt is returned as
/// [`Error::Storage`]. Reconciliation errors propagate unchanged.
pub fn with_repair<R>(
    store: &SqliteStore,
    table: &str,
    fields: &[FieldMeta],
    mut attempt: impl FnMut() -> Result<R>,
) -> Result<R> {
    match attempt() {
        Err(e) if e.is_repairable() => {
            tracing::debug!(table, error = %e, "repairing schema before retry");
            reconcile(store, table, fields)?;
            attempt().map_err(Error::into_fatal)
        }
        other => other,
    }
}
