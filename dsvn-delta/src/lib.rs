//! DSvn Delta Library
//!
//! Binary delta (xdelta) engine used by the versioned filesystem to store
//! file contents as differences against their previous fulltext:
//! - Pseudo-adler32 rolling checksum over 64-byte windows
//! - Open-addressing block table of source checksums
//! - Greedy single-pass matcher with backward extension into pending inserts
//! - Delta application

pub mod adler32;
pub mod blocks;
pub mod ops;
pub mod xdelta;

pub use adler32::RollingChecksum;
pub use blocks::BlockTable;
pub use ops::{apply_delta, target_len, DeltaError, DeltaOp, DeltaStats, Result};
pub use xdelta::{compute_delta, xdelta, MATCH_BLOCKSIZE};
