use crate::field::Model;
use crate::{Record, Result};

/// Records parsed from the array under one field of a JSON document.
pub struct Collection<T: Model> {
    field: String,
    records: Vec<Record<T>>,
}

impl<T: Model> Collection<T> {
    pub fn new(field: impl Into<String>, records: Vec<Record<T>>) -> Self {
        Self {
            field: field.into(),
            records,
        }
    }

    /// Name of the field the records were read from
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Save every record in order, stopping at the first failure.
    /// Records saved before the failure stay saved.
    pub fn save(&mut self) -> Result<()> {
        for record in &mut self.records {
            record.save()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<T>] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record<T>] {
        &mut self.records
    }

    pub fn push(&mut self, record: Record<T>) {
        self.records.push(record);
    }

    pub fn into_records(self) -> Vec<Record<T>> {
        self.records
    }
}

impl<'a, T: Model> IntoIterator for &'a Collection<T> {
    type Item = &'a Record<T>;
    type IntoIter = std::slice::Iter<'a, Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<T: Model> IntoIterator for Collection<T> {
    type Item = Record<T>;
    type IntoIter = std::vec::IntoIter<Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
