use super::{DatasetStore, StoreError};
use crate::domain::Dataset;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-process store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Dataset>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: &str, dataset: Dataset) -> Self {
        let store = Self::new();
        store.tables.lock().insert(table.to_string(), dataset);
        store
    }

    pub fn snapshot(&self, table: &str) -> Option<Dataset> {
        self.tables.lock().get(table).cloned()
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl DatasetStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn read(&self, table: &str) -> Result<Option<Dataset>, StoreError> {
        Ok(self.snapshot(table))
    }

    fn write(&self, table: &str, dataset: &Dataset) -> Result<(), StoreError> {
        self.tables
            .lock()
            .insert(table.to_string(), dataset.clone());
        *self.writes.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_table_and_counts() {
        let store = MemoryStore::new();
        assert!(store.read("t").unwrap().is_none());

        store.write("t", &Dataset::empty(vec!["a".into()])).unwrap();
        store.write("t", &Dataset::empty(vec!["b".into()])).unwrap();

        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read("t").unwrap().unwrap().terms(), &["b".to_string()]);
    }
}
