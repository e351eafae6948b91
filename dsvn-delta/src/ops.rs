//! Delta operations and their application

use serde::{Deserialize, Serialize};

/// Result type for delta application
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Errors that can occur while applying a delta
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeltaError {
    #[error("copy of {len} bytes at offset {offset} exceeds source of {source_len} bytes")]
    CopyOutOfBounds {
        offset: usize,
        len: usize,
        source_len: usize,
    },
}

/// One step in rebuilding a target buffer from a source buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaOp {
    /// Copy `len` bytes of the source starting at `offset`
    Copy { offset: usize, len: usize },
    /// Emit new bytes
    Insert(Vec<u8>),
}

impl DeltaOp {
    /// Number of target bytes this operation produces
    pub fn output_len(&self) -> usize {
        match self {
            DeltaOp::Copy { len, .. } => *len,
            DeltaOp::Insert(data) => data.len(),
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, DeltaOp::Copy { .. })
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, DeltaOp::Insert(_))
    }
}

/// Length of the target an operation list reconstructs
pub fn target_len(ops: &[DeltaOp]) -> usize {
    ops.iter().map(DeltaOp::output_len).sum()
}

/// Rebuild the target by applying `ops` in order against `source`.
pub fn apply_delta(source: &[u8], ops: &[DeltaOp]) -> Result<Vec<u8>> {
    let mut target = Vec::with_capacity(target_len(ops));

    for op in ops {
        match op {
            DeltaOp::Copy { offset, len } => {
                let chunk = offset
                    .checked_add(*len)
                    .and_then(|end| source.get(*offset..end))
                    .ok_or(DeltaError::CopyOutOfBounds {
                        offset: *offset,
                        len: *len,
                        source_len: source.len(),
                    })?;
                target.extend_from_slice(chunk);
            }
            DeltaOp::Insert(data) => target.extend_from_slice(data),
        }
    }

    Ok(target)
}

/// Summary of an operation list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub copy_ops: usize,
    pub insert_ops: usize,
    pub bytes_copied: usize,
    pub bytes_inserted: usize,
}

impl DeltaStats {
    pub fn from_ops(ops: &[DeltaOp]) -> Self {
        ops.iter().fold(Self::default(), |mut stats, op| {
            match op {
                DeltaOp::Copy { len, .. } => {
                    stats.copy_ops += 1;
                    stats.bytes_copied += len;
                }
                DeltaOp::Insert(data) => {
                    stats.insert_ops += 1;
                    stats.bytes_inserted += data.len();
                }
            }
            stats
        })
    }
}
