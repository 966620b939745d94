//! Per-type query manager
//!
//! Selections scan identities first and then load each record by id, so a
//! row deleted between the two steps is skipped with a warning.

use std::marker::PhantomData;
use std::rc::Rc;

use rusqlite::types::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collection::Collection;
use crate::context::Context;
use crate::field::{Model, Schema};
use crate::storage::{display_value, drop_table_sql, with_repair, Query, SqliteStore, ID_COLUMN};
use crate::{Error, Record, Result};

pub struct Manager<T: Model> {
    context: Context,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model> Manager<T> {
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            _marker: PhantomData,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn schema(&self) -> Result<&'static Schema<T>> {
        T::schema()
    }

    pub fn database_name(&self) -> Result<String> {
        Ok(self.context.database_for(T::schema()?))
    }

    /// Close the database this type lives in. It reopens on next use.
    pub fn close_database(&self) -> Result<bool> {
        self.context.close_database(&self.database_name()?)
    }

    fn store(&self) -> Result<(&'static Schema<T>, Rc<SqliteStore>)> {
        let schema = T::schema()?;
        let store = self.context.database(&self.context.database_for(schema))?;
        Ok((schema, store))
    }

    /// A new unsaved record holding `T::default()`
    pub fn create(&self) -> Record<T> {
        Record::new(&self.context)
    }

    pub fn create_with(&self, value: T) -> Record<T> {
        Record::with_value(&self.context, value)
    }

    /// A new unsaved record populated from a JSON object.
    ///
    /// Unknown keys are ignored and missing keys keep their default value.
    pub fn create_from_json(&self, json: &str) -> Result<Record<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let document: serde_json::Value = serde_json::from_str(json)?;
        self.create_from_value(document)
    }

    fn create_from_value(&self, document: serde_json::Value) -> Result<Record<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let merged = match (serde_json::to_value(T::default())?, document) {
            (serde_json::Value::Object(mut base), serde_json::Value::Object(given)) => {
                base.extend(given);
                serde_json::Value::Object(base)
            }
            (_, other) => other,
        };
        let value: T = serde_json::from_value(merged)?;
        Ok(self.create_with(value))
    }

    /// Parse the array stored under `field` of a JSON object into unsaved records.
    pub fn create_collection(&self, json: &str, field: &str) -> Result<Collection<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut document: serde_json::Value = serde_json::from_str(json)?;
        let items = match document.get_mut(field).map(serde_json::Value::take) {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(json_error(format!("field `{}` is not an array", field))),
            None => return Err(json_error(format!("missing field `{}`", field))),
        };

        let records = items
            .into_iter()
            .map(|item| self.create_from_value(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Collection::new(field, records))
    }

    pub fn find(&self, id: i64) -> Result<Record<T>> {
        let mut record = self.create();
        record.load(id)?;
        Ok(record)
    }

    /// First record whose `column` equals `key`. Uniqueness is not checked.
    pub fn find_by_unique_key(&self, column: &str, key: impl Into<Value>) -> Result<Record<T>> {
        let key = key.into();
        let query = Query::new(format!("{} = ?", column)).arg(key.clone());
        match self.select_ids(&query)?.first() {
            Some(&id) => self.find(id),
            None => {
                let schema = T::schema()?;
                Err(Error::NoMatch {
                    type_name: schema.type_name().to_string(),
                    criteria: format!("{}.{} = {}", schema.table(), column, display_value(&key)),
                })
            }
        }
    }

    pub fn all(&self) -> Result<Vec<Record<T>>> {
        self.select(&Query::all())
    }

    /// Records matching a raw SQL predicate
    pub fn filter(&self, predicate: &str) -> Result<Vec<Record<T>>> {
        self.select(&Query::new(predicate))
    }

    pub fn select(&self, query: &Query) -> Result<Vec<Record<T>>> {
        let ids = self.select_ids(query)?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.find(id) {
                Ok(record) => records.push(record),
                Err(Error::NotFound { type_name, id }) => {
                    tracing::warn!(type_name = %type_name, id, "record vanished before it could be loaded")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Identities matching `query`, in the store's order
    pub fn select_ids(&self, query: &Query) -> Result<Vec<i64>> {
        let (schema, store) = self.store()?;
        let table = schema.table();
        let rows = with_repair(&store, table, schema.columns(), || {
            store.query(table, Some(&[ID_COLUMN][..]), query)
        })?;
        Ok(rows.iter().filter_map(|row| row.integer(ID_COLUMN)).collect())
    }

    /// The last row of an unordered identity scan.
    ///
    /// SQLite returns rows in whatever order it likes when none is given, so
    /// this is not guaranteed to be the most recently inserted record.
    pub fn last(&self) -> Result<Record<T>> {
        match self.select_ids(&Query::all())?.last() {
            Some(&id) => self.find(id),
            None => Err(Error::Empty {
                type_name: T::schema()?.type_name().to_string(),
            }),
        }
    }

    /// The record at `position` of an unordered identity scan
    pub fn nth(&self, position: usize) -> Result<Record<T>> {
        match self.select_ids(&Query::all())?.get(position) {
            Some(&id) => self.find(id),
            None => Err(Error::NoMatch {
                type_name: T::schema()?.type_name().to_string(),
                criteria: format!("position {}", position),
            }),
        }
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.select_ids(&Query::all())?.len())
    }

    /// Remove every row; returns how many were removed
    pub fn delete_all(&self) -> Result<usize> {
        let (schema, store) = self.store()?;
        let table = schema.table();
        with_repair(&store, table, schema.columns(), || store.delete(table, None))
    }

    pub fn drop_table(&self) -> Result<()> {
        let (schema, store) = self.store()?;
        store.execute(&drop_table_sql(schema.table()))
    }
}

impl<T: Model> Clone for Manager<T> {
    fn clone(&self) -> Self {
        Self::new(&self.context)
    }
}

impl<T: Model> std::fmt::Debug for Manager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

fn json_error(message: String) -> Error {
    Error::Json(<serde_json::Error as serde::de::Error>::custom(message))
}
