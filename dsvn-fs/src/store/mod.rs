//! Backing record stores
//!
//! The filesystem keeps everything in five key/value tables. A store only has
//! to read single records and apply a batch of writes; all structure lives in
//! the records themselves (see `tables`).

mod fjall_store;
mod memory;

pub use fjall_store::FjallStore;
pub use memory::MemoryStore;

use crate::error::StoreResult;

/// The tables of a filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// Node revision id -> NODE-REVISION skel
    Nodes,
    /// Revision number -> REVISION skel
    Revisions,
    /// Transaction name -> TRANSACTION skel
    Transactions,
    /// Representation key -> compressed representation
    Reps,
    /// Counters and filesystem metadata
    Meta,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Nodes => "nodes",
            Table::Revisions => "revisions",
            Table::Transactions => "transactions",
            Table::Reps => "representations",
            Table::Meta => "meta",
        }
    }
}

/// One staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        table: Table,
        key: Vec<u8>,
    },
}

/// Key/value backend of a filesystem
pub trait RecordStore: Send + Sync {
    /// Read one record
    fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Apply a batch of writes in order
    fn apply(&self, batch: Vec<WriteOp>) -> StoreResult<()>;
}
