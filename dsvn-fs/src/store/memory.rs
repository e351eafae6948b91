//! In-memory record store

use super::{RecordStore, Table, WriteOp};
use crate::error::{StorageError, StoreResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Record store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`
    pub fn len(&self, table: Table) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(&table).map_or(0, BTreeMap::len))
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}

impl RecordStore for MemoryStore {
    fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(&table).and_then(|t| t.get(key)).cloned())
    }

    fn apply(&self, batch: Vec<WriteOp>) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        for op in batch {
            match op {
                WriteOp::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                WriteOp::Delete { table, key } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        store
            .apply(vec![WriteOp::Put {
                table: Table::Nodes,
                key: b"0.0".to_vec(),
                value: b"((dir ()) ())".to_vec(),
            }])
            .unwrap();

        assert_eq!(store.get(Table::Nodes, b"0.0").unwrap(), Some(b"((dir ()) ())".to_vec()));
        assert_eq!(store.get(Table::Revisions, b"0.0").unwrap(), None);
        assert_eq!(store.len(Table::Nodes).unwrap(), 1);

        store
            .apply(vec![WriteOp::Delete {
                table: Table::Nodes,
                key: b"0.0".to_vec(),
            }])
            .unwrap();
        assert_eq!(store.get(Table::Nodes, b"0.0").unwrap(), None);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let store = MemoryStore::new();
        let put = |v: &[u8]| WriteOp::Put {
            table: Table::Meta,
            key: b"k".to_vec(),
            value: v.to_vec(),
        };
        store.apply(vec![put(b"1"), put(b"2")]).unwrap();
        assert_eq!(store.get(Table::Meta, b"k").unwrap(), Some(b"2".to_vec()));
    }
}
