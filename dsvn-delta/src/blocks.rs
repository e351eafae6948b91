//! Block table
//!
//! Open-addressing hash table mapping the checksum of every source block to
//! the offset of its first occurrence.

use crate::adler32::RollingChecksum;
use crate::xdelta::MATCH_BLOCKSIZE;

#[derive(Debug, Clone, Copy)]
struct Slot {
    sum: u32,
    /// `None` marks an unused slot
    pos: Option<usize>,
}

/// Checksum table over the non-overlapping blocks of a source buffer.
#[derive(Debug)]
pub struct BlockTable {
    /// Largest valid slot index; the slot count is a power of two
    max: usize,
    slots: Vec<Slot>,
}

/// The checksum distributes poorly in bits 11..16 for 64-byte windows, so
/// fold some of the upper half down.
#[inline]
fn hash_func(sum: u32) -> usize {
    (sum ^ (sum >> 12)) as usize
}

impl BlockTable {
    /// Checksum every block of `source` (the last one may be short).
    pub fn build(source: &[u8]) -> Self {
        // Pessimistic block count, then the next larger power of two,
        // doubled to keep the load factor low.
        let nblocks = source.len() / MATCH_BLOCKSIZE + 1;
        let mut nslots = 1usize;
        while nslots <= nblocks {
            nslots *= 2;
        }
        nslots *= 2;

        let mut table = Self {
            max: nslots - 1,
            slots: vec![Slot { sum: 0, pos: None }; nslots],
        };

        for (i, block) in source.chunks(MATCH_BLOCKSIZE).enumerate() {
            let sum = RollingChecksum::new(block).sum();
            table.insert(sum, i * MATCH_BLOCKSIZE);
        }

        table
    }

    /// Insert a block, ignoring checksums already present.
    fn insert(&mut self, sum: u32, pos: usize) {
        let mut h = hash_func(sum) & self.max;

        // Terminates: the table is never more than half full.
        while self.slots[h].pos.is_some() {
            if self.slots[h].sum == sum {
                return;
            }
            h = (h + 1) & self.max;
        }
        self.slots[h] = Slot { sum, pos: Some(pos) };
    }

    /// Offset of the first source block with checksum `sum`.
    pub fn find(&self, sum: u32) -> Option<usize> {
        let mut h = hash_func(sum) & self.max;

        loop {
            let slot = self.slots[h];
            match slot.pos {
                None => return None,
                Some(pos) if slot.sum == sum => return Some(pos),
                Some(_) => h = (h + 1) & self.max,
            }
        }
    }

    /// Number of slots (always a power of two).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
