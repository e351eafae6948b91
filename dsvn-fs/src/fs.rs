//! Filesystem handle
//!
//! Owns the record store and runs trails against it, one at a time. Also
//! implements the transaction lifecycle on top of the DAG operations:
//! begin, commit and abort.

use crate::config::FsConfig;
use crate::dag::{self, DagNode};
use crate::error::{FsError, Result, StorageError};
use crate::node_rev::PropList;
use crate::store::{FjallStore, MemoryStore, RecordStore, Table};
use crate::tables::{self, Revision};
use crate::trail::Trail;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const METADATA_KEY: &[u8] = b"metadata";

/// Filesystem metadata, stored as JSON in the meta table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsMetadata {
    pub uuid: String,
    pub created_at: i64,
}

pub struct Filesystem {
    store: Arc<dyn RecordStore>,
    config: FsConfig,
    metadata: FsMetadata,
    /// Held for the duration of each trail
    writer: Mutex<()>,
}

impl Filesystem {
    /// Scratch filesystem kept in memory
    pub fn in_memory(config: FsConfig) -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// Open or create the fjall-backed filesystem at `config.path`
    pub fn open(config: FsConfig) -> Result<Self> {
        config.validate()?;
        let store = FjallStore::open(&config)?;
        Self::with_store(Arc::new(store), config)
    }

    /// Filesystem over an existing store, initialized if the store is empty
    pub fn with_store(store: Arc<dyn RecordStore>, config: FsConfig) -> Result<Self> {
        config.validate()?;
        let mut fs = Self {
            store,
            config,
            metadata: FsMetadata {
                uuid: String::new(),
                created_at: 0,
            },
            writer: Mutex::new(()),
        };

        let metadata = fs.run_trail(|trail| {
            if let Some(data) = trail.get(Table::Meta, METADATA_KEY)? {
                return serde_json::from_slice(&data)
                    .map_err(|e| FsError::corrupt(format!("invalid filesystem metadata: {}", e)));
            }

            dag::init_fs(trail)?;
            let metadata = FsMetadata {
                uuid: uuid::Uuid::new_v4().to_string(),
                created_at: chrono::Utc::now().timestamp(),
            };
            let data = serde_json::to_vec(&metadata)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            trail.put(Table::Meta, METADATA_KEY, data);
            tracing::info!("Created filesystem {}", metadata.uuid);
            Ok(metadata)
        })?;

        fs.metadata = metadata;
        Ok(fs)
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn uuid(&self) -> &str {
        &self.metadata.uuid
    }

    pub fn metadata(&self) -> &FsMetadata {
        &self.metadata
    }

    /// Run `body` in a new trail.
    ///
    /// The trail's writes reach the store only if `body` returns `Ok`; on
    /// error they are discarded. Trails never run concurrently.
    pub fn run_trail<T>(&self, body: impl FnOnce(&mut Trail<'_>) -> Result<T>) -> Result<T> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| StorageError::Backend("filesystem writer lock poisoned".to_string()))?;

        let mut trail = Trail::new(self.store.as_ref(), &self.config);
        let value = body(&mut trail)?;

        let pending = trail.pending();
        self.store.apply(trail.into_batch())?;
        tracing::trace!(writes = pending, "trail completed");
        Ok(value)
    }

    pub fn youngest_rev(&self) -> Result<u64> {
        self.run_trail(|trail| {
            tables::youngest_rev(trail)?
                .ok_or_else(|| FsError::corrupt("filesystem has no revisions"))
        })
    }

    /// Open a transaction based on revision `base_rev`.
    pub fn begin_txn(&self, base_rev: u64) -> Result<String> {
        let name = self.run_trail(|trail| tables::create_txn(trail, base_rev))?;
        tracing::debug!(txn = %name, base_rev, "began transaction");
        Ok(name)
    }

    /// Commit transaction `txn` as the next revision.
    ///
    /// Every mutable node in the transaction becomes immutable. Fails with
    /// `TxnOutOfDate` if another commit happened since the transaction's
    /// base revision.
    pub fn commit_txn(&self, txn: &str) -> Result<u64> {
        let (rev, frozen) = self.run_trail(|trail| {
            let transaction = tables::get_txn(trail, txn)?;
            let youngest = tables::youngest_rev(trail)?
                .ok_or_else(|| FsError::corrupt("filesystem has no revisions"))?;
            if transaction.base_rev != youngest {
                return Err(FsError::TxnOutOfDate {
                    txn: txn.to_string(),
                    base: transaction.base_rev,
                    youngest,
                });
            }

            let frozen = dag::freeze_tree(trail, &transaction.root_id)?;
            let mut proplist = PropList::new();
            proplist.set(tables::PROP_REVISION_DATE, tables::timestamp());
            let rev = tables::put_rev(
                trail,
                &Revision {
                    root_id: transaction.root_id,
                    proplist,
                },
            )?;
            tables::delete_txn(trail, txn)?;
            Ok((rev, frozen))
        })?;

        tracing::info!("Committed transaction {} as r{} ({} nodes)", txn, rev, frozen);
        Ok(rev)
    }

    /// Throw transaction `txn` away. Node revisions it created stay in the
    /// nodes table, unreachable, so their ids are never handed out again.
    pub fn abort_txn(&self, txn: &str) -> Result<()> {
        self.run_trail(|trail| tables::delete_txn(trail, txn))?;
        tracing::warn!("Aborted transaction {}", txn);
        Ok(())
    }

    /// Root directory of revision `rev`
    pub fn revision_root(&self, rev: u64) -> Result<DagNode> {
        self.run_trail(|trail| dag::revision_root(trail, rev))
    }

    /// Properties of revision `rev`
    pub fn revision_proplist(&self, rev: u64) -> Result<PropList> {
        self.run_trail(|trail| Ok(tables::get_rev(trail, rev)?.proplist))
    }

    /// Contents of the file at `path` in revision `rev`
    pub fn file_contents(&self, rev: u64, path: &str) -> Result<Vec<u8>> {
        self.run_trail(|trail| {
            let root = dag::revision_root(trail, rev)?;
            dag::open_path(trail, &root, path)?.get_contents(trail)
        })
    }
}

impl std::fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filesystem")
            .field("uuid", &self.metadata.uuid)
            .field("config", &self.config)
            .finish()
    }
}
