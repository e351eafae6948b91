//! DSvn Filesystem Library
//!
//! Versioned filesystem built as a DAG of node revisions:
//! - Skel records (node revisions, revisions, transactions)
//! - Copy-on-write DAG operations inside transactions
//! - File contents as xdelta-compressed representations
//! - Record stores: in-memory and Fjall LSM-tree
//! - Trails, the single-writer transactional context of every operation

pub mod config;
pub mod dag;
pub mod error;
pub mod fs;
pub mod id;
pub mod key_gen;
pub mod logging;
pub mod node_rev;
pub mod reps;
pub mod skel;
pub mod store;
pub mod tables;
pub mod trail;

pub use config::FsConfig;
pub use dag::{clone_root, open_path, revision_root, DagNode};
pub use error::{FsError, Result, StorageError, StoreResult};
pub use fs::{Filesystem, FsMetadata};
pub use id::NodeRevId;
pub use node_rev::{DirEntry, NodeKind, NodeRevision, PropList};
pub use skel::Skel;
pub use store::{FjallStore, MemoryStore, RecordStore, Table, WriteOp};
pub use trail::Trail;
