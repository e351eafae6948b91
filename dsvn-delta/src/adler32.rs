//! Rolling checksum for block matching
//!
//! Pseudo-adler32: adler32 without the prime modulus. Both halves are kept
//! modulo 2^16, which makes every update a handful of wrapping adds and a mask.

use crate::xdelta::MATCH_BLOCKSIZE;

const ADLER32_MASK: u32 = 0x0000_ffff;

/// Rolling checksum state over a window of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingChecksum {
    /// Byte sum
    s1: u32,
    /// Sum of prefix sums
    s2: u32,
    /// Current window length
    len: u32,
}

impl RollingChecksum {
    /// Checksum the given window from scratch.
    pub fn new(window: &[u8]) -> Self {
        let mut ad = Self { s1: 0, s2: 0, len: 0 };
        for &c in window {
            ad.feed_in(c);
        }
        ad
    }

    /// Append `c` to the end of the window.
    #[inline]
    pub fn feed_in(&mut self, c: u8) {
        self.s1 = self.s1.wrapping_add(u32::from(c)) & ADLER32_MASK;
        self.s2 = self.s2.wrapping_add(self.s1) & ADLER32_MASK;
        self.len += 1;
    }

    /// Remove `c` from the front of the window.
    #[inline]
    pub fn feed_out(&mut self, c: u8) {
        let c = u32::from(c);
        self.s1 = self.s1.wrapping_sub(c) & ADLER32_MASK;
        self.s2 = self.s2.wrapping_sub(self.len.wrapping_mul(c)) & ADLER32_MASK;
        self.len -= 1;
    }

    /// Slide a full window by one byte: drop `c_out` at the front and
    /// append `c_in` at the end.
    ///
    /// Only valid while the window holds exactly [`MATCH_BLOCKSIZE`] bytes.
    #[inline]
    pub fn replace(&mut self, c_out: u8, c_in: u8) {
        debug_assert_eq!(self.len as usize, MATCH_BLOCKSIZE);
        let c_out = u32::from(c_out);
        let mut s2 = self.s2.wrapping_sub((MATCH_BLOCKSIZE as u32).wrapping_mul(c_out));
        let s1 = self.s1.wrapping_sub(c_out).wrapping_add(u32::from(c_in));
        s2 = s2.wrapping_add(s1);

        self.s1 = s1 & ADLER32_MASK;
        self.s2 = s2 & ADLER32_MASK;
    }

    /// Combined 32-bit checksum: `s2 << 16 | s1`.
    #[inline]
    pub fn sum(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Number of bytes in the window.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
