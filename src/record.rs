//! Record lifecycle
//!
//! A [`Record`] pairs a record value with its identity and the context it is
//! saved through. It starts `Unsaved`, becomes `Saved` on its first
//! successful insert and `Deleted` once removed. A deleted record rejects
//! every further lifecycle call.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use serde::Serialize;

use crate::context::Context;
use crate::field::{Model, Schema};
use crate::storage::{where_id, with_repair, Query, SqliteStore, ID_COLUMN};
use crate::{Error, Result};

/// Identity of a record that was never inserted
pub const UNSAVED_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unsaved,
    Saved,
    Deleted,
}

pub struct Record<T: Model> {
    context: Context,
    id: i64,
    state: State,
    value: T,
}

impl<T: Model> Record<T> {
    pub fn new(context: &Context) -> Self {
        Self::with_value(context, T::default())
    }

    pub fn with_value(context: &Context, value: T) -> Self {
        Self {
            context: context.clone(),
            id: UNSAVED_ID,
            state: State::Unsaved,
            value,
        }
    }

    /// Store-assigned identity, or [`UNSAVED_ID`]
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_saved(&self) -> bool {
        self.state == State::Saved
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn database_name(&self) -> Result<String> {
        Ok(self.context.database_for(T::schema()?))
    }

    /// Insert the record if it is unsaved, otherwise update its row.
    ///
    /// A missing table or column is repaired once and the write retried.
    pub fn save(&mut self) -> Result<()> {
        self.reject_deleted("cannot save a deleted record")?;
        let schema = T::schema()?;
        let values = schema.encode(&self.value)?;
        let store = self.store(schema)?;
        let table = schema.table();

        match self.state {
            State::Unsaved => {
                let id = with_repair(&store, table, schema.columns(), || {
                    store.insert(table, &values)
                })?;
                self.id = id;
                self.state = State::Saved;
            }
            _ => {
                let predicate = where_id(self.id);
                let changed = with_repair(&store, table, schema.columns(), || {
                    store.update(table, &values, &predicate)
                })?;
                if changed == 0 && !values.is_empty() {
                    tracing::debug!(table, id = self.id, "update matched no row");
                }
            }
        }
        Ok(())
    }

    /// Remove the record's row. The record is unusable afterwards.
    pub fn delete(&mut self) -> Result<()> {
        match self.state {
            State::Unsaved => return Err(Error::State("cannot delete an unsaved record")),
            State::Deleted => return Err(Error::State("record was already deleted")),
            State::Saved => {}
        }

        let schema = T::schema()?;
        let store = self.store(schema)?;
        store
            .delete(schema.table(), Some(&where_id(self.id)))
            .map_err(Error::into_fatal)?;
        self.state = State::Deleted;
        Ok(())
    }

    /// Point the record at `id` and reload it.
    ///
    /// On failure the record keeps its previous identity and state.
    pub fn load(&mut self, id: i64) -> Result<()> {
        self.reject_deleted("cannot load into a deleted record")?;
        if id < 0 {
            return Err(Error::InvalidId(id));
        }

        let previous = (self.id, self.state);
        self.id = id;
        self.state = State::Saved;
        if let Err(e) = self.reload() {
            (self.id, self.state) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Overwrite every persistable attribute from the stored row.
    pub fn reload(&mut self) -> Result<()> {
        match self.state {
            State::Unsaved => return Err(Error::State("cannot reload an unsaved record")),
            State::Deleted => return Err(Error::State("cannot reload a deleted record")),
            State::Saved => {}
        }

        let schema = T::schema()?;
        let store = self.store(schema)?;
        let table = schema.table();

        let mut columns = vec![ID_COLUMN];
        columns.extend(schema.column_names());
        let query = Query::new(where_id(self.id));
        let rows = with_repair(&store, table, schema.columns(), || {
            store.query(table, Some(columns.as_slice()), &query)
        })?;

        let row = rows.into_iter().next().ok_or_else(|| Error::NotFound {
            type_name: schema.type_name().to_string(),
            id: self.id,
        })?;
        schema.decode_row(&mut self.value, &row)
    }

    pub fn to_json(&self) -> Result<String>
    where
        T: Serialize,
    {
        Ok(serde_json::to_string(&self.value)?)
    }

    fn store(&self, schema: &Schema<T>) -> Result<Rc<SqliteStore>> {
        self.context.database(&self.context.database_for(schema))
    }

    fn reject_deleted(&self, message: &'static str) -> Result<()> {
        if self.state == State::Deleted {
            return Err(Error::State(message));
        }
        Ok(())
    }
}

impl<T: Model> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Model> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Model + std::fmt::Debug> std::fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldMeta, ModelMeta, SchemaCell, StorageType};
    use crate::codec::{FieldCodec, Reject};
    use rusqlite::types::{Value, ValueRef};

    #[derive(Debug, Default, Serialize)]
    struct Counter {
        hits: i64,
    }

    fn encode_hits(record: &Counter) -> std::result::Result<Option<Value>, Reject> {
        record.hits.encode()
    }

    fn decode_hits(record: &mut Counter, value: ValueRef<'_>) -> std::result::Result<(), Reject> {
        record.hits = i64::decode(value)?;
        Ok(())
    }

    impl Model for Counter {
        fn schema() -> Result<&'static Schema<Self>> {
            static SCHEMA: SchemaCell<Counter> = SchemaCell::new();
            SCHEMA.get_or_build(|| {
                Schema::build(
                    ModelMeta::new("Counter"),
                    vec![Field::new(
                        FieldMeta::new("hits", "i64", StorageType::Integer).public(),
                        encode_hits,
                        decode_hits,
                    )],
                )
            })
        }
    }

    #[test]
    fn test_first_save_assigns_identity() {
        let context = Context::in_memory();
        let mut record = Record::<Counter>::new(&context);
        assert_eq!(record.id(), UNSAVED_ID);
        assert_eq!(record.state(), State::Unsaved);

        record.hits = 3;
        record.save().unwrap();
        assert_eq!(record.state(), State::Saved);
        assert!(record.id() >= 0);

        let id = record.id();
        record.hits = 4;
        record.save().unwrap();
        assert_eq!(record.id(), id);

        let mut loaded = Record::<Counter>::new(&context);
        loaded.load(id).unwrap();
        assert_eq!(loaded.hits, 4);
    }

    #[test]
    fn test_unsaved_record_rejects_delete_and_reload() {
        let context = Context::in_memory();
        let mut record = Record::<Counter>::new(&context);
        assert!(matches!(record.delete(), Err(Error::State(_))));
        assert!(matches!(record.reload(), Err(Error::State(_))));
    }

    #[test]
    fn test_deleted_record_rejects_everything() {
        let context = Context::in_memory();
        let mut record = Record::<Counter>::new(&context);
        record.save().unwrap();
        record.delete().unwrap();

        assert_eq!(record.state(), State::Deleted);
        assert!(matches!(record.save(), Err(Error::State(_))));
        assert!(matches!(record.delete(), Err(Error::State(_))));
        assert!(matches!(record.reload(), Err(Error::State(_))));
        assert!(matches!(record.load(1), Err(Error::State(_))));
    }

    #[test]
    fn test_load_checks_id() {
        let context = Context::in_memory();
        let mut record = Record::<Counter>::new(&context);
        assert!(matches!(record.load(-1), Err(Error::InvalidId(-1))));

        let err = record.load(7).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
        assert_eq!(record.id(), UNSAVED_ID);
        assert_eq!(record.state(), State::Unsaved);
    }

    #[test]
    fn test_to_json() {
        let context = Context::in_memory();
        let mut record = Record::<Counter>::new(&context);
        record.hits = 9;
        assert_eq!(record.to_json().unwrap(), r#"{"hits":9}"#);
        assert_eq!(record.database_name().unwrap(), "robomodel");
        assert_eq!(record.into_inner().hits, 9);
    }
}
