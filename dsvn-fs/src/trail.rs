//! Trails
//!
//! A trail is the transactional context every filesystem operation runs in.
//! Writes are staged in the trail and only reach the record store when the
//! trail completes successfully; reads see the trail's own staged writes.

use crate::config::FsConfig;
use crate::error::StoreResult;
use crate::store::{RecordStore, Table, WriteOp};
use std::collections::BTreeMap;

pub struct Trail<'a> {
    store: &'a dyn RecordStore,
    config: &'a FsConfig,
    /// `None` marks a staged delete
    staged: BTreeMap<(Table, Vec<u8>), Option<Vec<u8>>>,
}

impl<'a> Trail<'a> {
    pub fn new(store: &'a dyn RecordStore, config: &'a FsConfig) -> Self {
        Self {
            store,
            config,
            staged: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &FsConfig {
        self.config
    }

    pub fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.staged.get(&(table, key.to_vec())) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(table, key),
        }
    }

    pub fn contains(&self, table: Table, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(table, key)?.is_some())
    }

    pub fn put(&mut self, table: Table, key: &[u8], value: Vec<u8>) {
        self.staged.insert((table, key.to_vec()), Some(value));
    }

    pub fn delete(&mut self, table: Table, key: &[u8]) {
        self.staged.insert((table, key.to_vec()), None);
    }

    /// Number of staged writes
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// The staged writes, ready for [`RecordStore::apply`]
    pub fn into_batch(self) -> Vec<WriteOp> {
        self.staged
            .into_iter()
            .map(|((table, key), value)| match value {
                Some(value) => WriteOp::Put { table, key, value },
                None => WriteOp::Delete { table, key },
            })
            .collect()
    }
}
