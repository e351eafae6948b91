//! xdelta generator
//!
//! 1. Checksum every `MATCH_BLOCKSIZE` block of the source into a
//!    [`BlockTable`].
//! 2. Walk the target byte by byte, looking up the checksum of the window
//!    starting at each position.
//!    - On a verified hit, extend the match forwards as far as source and
//!      target agree, and backwards into the pending insert, then emit a copy.
//!    - Otherwise the byte joins the pending insert.
//!
//! Inserts are held back until the next copy (or the end of the target) so
//! that runs of unmatched bytes become one operation and so that a match can
//! swallow the tail of the pending insert when block alignment made it start
//! late.

use crate::adler32::RollingChecksum;
use crate::blocks::BlockTable;
use crate::ops::DeltaOp;

/// Size of the source blocks we checksum
pub const MATCH_BLOCKSIZE: usize = 64;

/// A verified match of source against target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    /// Start in the source, after backward extension
    apos: usize,
    /// Bytes copied from the source, including backward extension
    alen: usize,
    /// Target bytes consumed from the lookup position onwards
    badvance: usize,
}

/// Length of the common prefix of `a` and `b`, looking at most `max_len` bytes.
fn match_length(a: &[u8], b: &[u8], max_len: usize) -> usize {
    a.iter()
        .zip(b)
        .take(max_len)
        .take_while(|(x, y)| x == y)
        .count()
}

/// Look up the rolling window starting at `bpos`, verify it, and extend it.
/// Backward extension shrinks `pending_insert_len` by one byte per step.
fn find_match(
    blocks: &BlockTable,
    rolling: &RollingChecksum,
    a: &[u8],
    b: &[u8],
    bpos: usize,
    pending_insert_len: &mut usize,
) -> Option<Match> {
    let tpos = blocks.find(rolling.sum())?;
    let tlen = MATCH_BLOCKSIZE.min(a.len() - tpos);

    // Reject checksum collisions and blocks running past the target.
    if bpos + tlen > b.len() || a[tpos..tpos + tlen] != b[bpos..bpos + tlen] {
        return None;
    }

    let mut apos = tpos;
    let mut alen = tlen;
    let mut badvance = tlen;

    let max_delta = (a.len() - apos - alen).min(b.len() - bpos - badvance);
    let delta = match_length(&a[apos + alen..], &b[bpos + badvance..], max_delta);
    alen += delta;
    badvance += delta;

    let mut bpos = bpos;
    while apos > 0 && bpos > 0 && a[apos - 1] == b[bpos - 1] && *pending_insert_len > 0 {
        *pending_insert_len -= 1;
        apos -= 1;
        bpos -= 1;
        alen += 1;
    }

    Some(Match {
        apos,
        alen,
        badvance,
    })
}

/// Slide the window one byte forward from `lo`.
#[inline]
fn roll_one(rolling: &mut RollingChecksum, b: &[u8], lo: usize) {
    if lo + MATCH_BLOCKSIZE < b.len() {
        rolling.replace(b[lo], b[lo + MATCH_BLOCKSIZE]);
    } else {
        rolling.feed_out(b[lo]);
    }
}

/// Compute the operations turning `source` into `target`.
///
/// An empty source has nothing to match against, so the whole target
/// becomes a single insert.
pub fn compute_delta(source: &[u8], target: &[u8]) -> Vec<DeltaOp> {
    if source.is_empty() {
        if target.is_empty() {
            return Vec::new();
        }
        return vec![DeltaOp::Insert(target.to_vec())];
    }
    xdelta(source, target)
}

/// Block-matching delta of `b` against `a`.
///
/// # Panics
///
/// Panics if `a` is empty; callers special-case an empty source (see
/// [`compute_delta`]).
pub fn xdelta(a: &[u8], b: &[u8]) -> Vec<DeltaOp> {
    assert!(!a.is_empty(), "xdelta requires a non-empty source");

    let mut ops = Vec::new();

    if b.len() < MATCH_BLOCKSIZE {
        if !b.is_empty() {
            ops.push(DeltaOp::Insert(b.to_vec()));
        }
        return ops;
    }

    let blocks = BlockTable::build(a);
    let mut rolling = RollingChecksum::new(&b[..MATCH_BLOCKSIZE]);

    let bsize = b.len();
    let mut lo = 0;
    let mut pending_insert_start = 0;
    let mut pending_insert_len = 0;

    while lo < bsize {
        let badvance = match find_match(&blocks, &rolling, a, b, lo, &mut pending_insert_len) {
            None => {
                pending_insert_len += 1;
                1
            }
            Some(m) => {
                if pending_insert_len > 0 {
                    let end = pending_insert_start + pending_insert_len;
                    ops.push(DeltaOp::Insert(b[pending_insert_start..end].to_vec()));
                    pending_insert_len = 0;
                }
                pending_insert_start = lo + m.badvance;
                ops.push(DeltaOp::Copy {
                    offset: m.apos,
                    len: m.alen,
                });
                m.badvance
            }
        };

        if badvance == 1 {
            // By far the common case: about two thirds of all target bytes
            // go through here even when counting the bytes of long matches.
            roll_one(&mut rolling, b, lo);
            lo += 1;
        } else if badvance >= MATCH_BLOCKSIZE {
            // Cheaper to checksum the new window from scratch.
            lo += badvance;
            if lo < bsize {
                rolling = RollingChecksum::new(&b[lo..(lo + MATCH_BLOCKSIZE).min(bsize)]);
            }
        } else {
            // Short match, only possible near the end of the target.
            for next in lo..lo + badvance {
                roll_one(&mut rolling, b, next);
            }
            lo += badvance;
        }
    }

    if pending_insert_len > 0 {
        let end = pending_insert_start + pending_insert_len;
        ops.push(DeltaOp::Insert(b[pending_insert_start..end].to_vec()));
    }

    tracing::trace!(
        source_len = a.len(),
        target_len = bsize,
        ops = ops.len(),
        "computed xdelta"
    );

    ops
}
