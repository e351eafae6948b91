//! File contents representations
//!
//! Contents are stored under base-36 keys in the representations table, each
//! record a zstd-compressed bincode `Representation`. A representation is
//! either a fulltext or a delta against another representation; deltas form
//! chains that always end at a fulltext. Representations are never
//! overwritten, so a predecessor node revision can keep sharing them.

use crate::error::{FsError, Result, StorageError};
use crate::store::Table;
use crate::tables::{allocate_key, NEXT_REP_KEY};
use crate::trail::Trail;
use dsvn_delta::{apply_delta, compute_delta, DeltaOp, DeltaStats};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepBody {
    Fulltext(Vec<u8>),
    /// Apply `ops` to the contents of representation `base`
    Delta { base: String, ops: Vec<DeltaOp> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representation {
    /// Length of the reconstructed contents
    pub size: u64,
    /// Hex SHA-256 of the reconstructed contents
    pub sha256: String,
    /// Number of deltas between this representation and its fulltext
    pub chain_len: u32,
    pub body: RepBody,
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl Representation {
    pub fn fulltext(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            sha256: sha256_hex(data),
            chain_len: 0,
            body: RepBody::Fulltext(data.to_vec()),
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self.body, RepBody::Delta { .. })
    }

    pub fn to_bytes(&self, level: i32) -> Result<Vec<u8>> {
        let raw = bincode::serialize(self)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(&raw[..], level)
            .map_err(|e| StorageError::Serialization(format!("zstd: {}", e)))?;
        Ok(compressed)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw = zstd::decode_all(data)
            .map_err(|e| FsError::corrupt(format!("representation does not decompress: {}", e)))?;
        bincode::deserialize(&raw)
            .map_err(|e| FsError::corrupt(format!("representation does not decode: {}", e)))
    }
}

pub fn read_rep(trail: &Trail<'_>, key: &str) -> Result<Representation> {
    let data = trail
        .get(Table::Reps, key.as_bytes())?
        .ok_or_else(|| FsError::NotFound(format!("representation '{}'", key)))?;
    Representation::from_bytes(&data)
}

fn write_rep(trail: &mut Trail<'_>, rep: &Representation) -> Result<String> {
    let data = rep.to_bytes(trail.config().compression_level)?;
    let key = allocate_key(trail, NEXT_REP_KEY)?;
    trail.put(Table::Reps, key.as_bytes(), data);
    Ok(key)
}

/// Reconstruct the contents of representation `key`.
pub fn read_contents(trail: &Trail<'_>, key: &str) -> Result<Vec<u8>> {
    let head = read_rep(trail, key)?;

    // Collect deltas down to the fulltext, newest first
    let mut deltas = Vec::new();
    let mut rep = head.clone();
    let fulltext = loop {
        match rep.body {
            RepBody::Fulltext(data) => break data,
            RepBody::Delta { base, ops } => {
                if deltas.len() as u32 >= head.chain_len {
                    return Err(FsError::corrupt(format!(
                        "representation '{}' has a delta chain longer than {}",
                        key, head.chain_len
                    )));
                }
                deltas.push(ops);
                rep = read_rep(trail, &base)?;
            }
        }
    };

    let mut contents = fulltext;
    for ops in deltas.iter().rev() {
        contents = apply_delta(&contents, ops)
            .map_err(|e| FsError::corrupt(format!("representation '{}': {}", key, e)))?;
    }

    if contents.len() as u64 != head.size || sha256_hex(&contents) != head.sha256 {
        return Err(FsError::corrupt(format!(
            "representation '{}' does not match its checksum",
            key
        )));
    }
    Ok(contents)
}

/// Store `data` as a new representation and return its key.
///
/// When `previous` names the representation the file had before, the new
/// contents are stored as a delta against it if that keeps the chain within
/// `max_delta_chain` and the delta is smaller than the fulltext.
pub fn store_contents(
    trail: &mut Trail<'_>,
    previous: Option<&str>,
    data: &[u8],
) -> Result<String> {
    let rep = match previous {
        Some(base) => deltify(trail, base, data)?.unwrap_or_else(|| Representation::fulltext(data)),
        None => Representation::fulltext(data),
    };
    let key = write_rep(trail, &rep)?;
    tracing::debug!(
        key = %key,
        size = rep.size,
        chain_len = rep.chain_len,
        delta = rep.is_delta(),
        "stored representation"
    );
    Ok(key)
}

fn deltify(trail: &Trail<'_>, base: &str, data: &[u8]) -> Result<Option<Representation>> {
    let base_rep = read_rep(trail, base)?;
    if base_rep.size == 0 || base_rep.chain_len >= trail.config().max_delta_chain {
        return Ok(None);
    }

    let source = read_contents(trail, base)?;
    let ops = compute_delta(&source, data);
    let encoded_len = bincode::serialized_size(&ops)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    if encoded_len >= data.len() as u64 {
        return Ok(None);
    }

    let stats = DeltaStats::from_ops(&ops);
    tracing::trace!(base = %base, ?stats, "deltified contents");
    Ok(Some(Representation {
        size: data.len() as u64,
        sha256: sha256_hex(data),
        chain_len: base_rep.chain_len + 1,
        body: RepBody::Delta {
            base: base.to_string(),
            ops,
        },
    }))
}
