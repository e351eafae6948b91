//! Record store on a Fjall LSM-tree database
//!
//! One keyspace per table. Node revisions are read far more often than they
//! are written (every path walk loads each directory on the way), so their
//! records sit behind an LRU cache.

use super::{RecordStore, Table, WriteOp};
use crate::config::FsConfig;
use crate::error::{StorageError, StoreResult};
use fjall::{Database, Keyspace, KeyspaceCreateOptions, PersistMode};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

pub struct FjallStore {
    db: Database,
    nodes: Keyspace,
    revisions: Keyspace,
    transactions: Keyspace,
    reps: Keyspace,
    meta: Keyspace,
    node_cache: Mutex<LruCache<Vec<u8>, Vec<u8>>>,
    sync_writes: bool,
}

impl FjallStore {
    /// Open or create the database at `config.path`
    pub fn open(config: &FsConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.path)?;

        let db = Database::builder(Path::new(&config.path))
            .open()
            .map_err(|e| StorageError::Database(format!("Failed to open database: {}", e)))?;

        let open_keyspace = |table: Table| {
            db.keyspace(table.name(), || KeyspaceCreateOptions::default())
                .map_err(|e| {
                    StorageError::Database(format!(
                        "Failed to open {} keyspace: {}",
                        table.name(),
                        e
                    ))
                })
        };

        let capacity = NonZeroUsize::new(config.node_cache_capacity)
            .ok_or_else(|| StorageError::Backend("node cache capacity must be positive".into()))?;

        let nodes = open_keyspace(Table::Nodes)?;
        let revisions = open_keyspace(Table::Revisions)?;
        let transactions = open_keyspace(Table::Transactions)?;
        let reps = open_keyspace(Table::Reps)?;
        let meta = open_keyspace(Table::Meta)?;

        tracing::info!("Opened fjall record store at {}", config.path.display());

        Ok(Self {
            db,
            nodes,
            revisions,
            transactions,
            reps,
            meta,
            node_cache: Mutex::new(LruCache::new(capacity)),
            sync_writes: config.sync_writes,
        })
    }

    fn keyspace(&self, table: Table) -> &Keyspace {
        match table {
            Table::Nodes => &self.nodes,
            Table::Revisions => &self.revisions,
            Table::Transactions => &self.transactions,
            Table::Reps => &self.reps,
            Table::Meta => &self.meta,
        }
    }

    fn cache(&self) -> StoreResult<std::sync::MutexGuard<'_, LruCache<Vec<u8>, Vec<u8>>>> {
        self.node_cache
            .lock()
            .map_err(|_| StorageError::Backend("node cache lock poisoned".to_string()))
    }
}

impl RecordStore for FjallStore {
    fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if table == Table::Nodes {
            if let Some(value) = self.cache()?.get(key) {
                return Ok(Some(value.clone()));
            }
        }

        let value = self
            .keyspace(table)
            .get(key)
            .map_err(|e| StorageError::Database(format!("Get failed: {}", e)))?
            .map(|v| v.to_vec());

        if table == Table::Nodes {
            if let Some(value) = &value {
                self.cache()?.put(key.to_vec(), value.clone());
            }
        }
        Ok(value)
    }

    /// Writes the whole batch in one fjall write batch. The node cache is
    /// only updated once the batch has committed.
    fn apply(&self, batch: Vec<WriteOp>) -> StoreResult<()> {
        let durability = self.sync_writes.then_some(PersistMode::SyncAll);
        let mut write_batch = self.db.batch().durability(durability);
        for op in &batch {
            match op {
                WriteOp::Put { table, key, value } => {
                    write_batch.insert(self.keyspace(*table), key.as_slice(), value.as_slice());
                }
                WriteOp::Delete { table, key } => {
                    write_batch.remove(self.keyspace(*table), key.as_slice());
                }
            }
        }
        write_batch
            .commit()
            .map_err(|e| StorageError::Database(format!("Batch commit failed: {}", e)))?;

        let mut cache = self.cache()?;
        for op in batch {
            match op {
                WriteOp::Put {
                    table: Table::Nodes,
                    key,
                    value,
                } => {
                    cache.put(key, value);
                }
                WriteOp::Delete {
                    table: Table::Nodes,
                    key,
                } => {
                    cache.pop(&key);
                }
                _ => {}
            }
        }
        Ok(())
    }
}
