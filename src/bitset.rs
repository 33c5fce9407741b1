//! Dense container: a fixed 65536-bit vector.
//!
//! # Layout
//!
//! 1024 x 64-bit words, bit `v` of the chunk lives in word `v / 64` at
//! position `v % 64`. The cardinality is maintained incrementally so that
//! `len()` is O(1); lazily combined bitsets leave it unknown until they are
//! repaired.

use crate::array::ArrayContainer;
use crate::container::SetOp;
use crate::run::Interval;

/// Number of 64-bit words in a bitset container.
pub const BITSET_WORDS: usize = 1024;

/// 65536-bit container.
#[derive(Clone)]
pub(crate) struct BitsetContainer {
    words: Box<[u64; BITSET_WORDS]>,
    /// `None` only after a lazy combine.
    len: Option<u32>,
}

impl std::fmt::Debug for BitsetContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitsetContainer")
            .field("len", &self.len)
            .finish()
    }
}

/// Mask of bits `[lo, hi]` within one word (both in `0..64`).
fn word_mask(lo: u32, hi: u32) -> u64 {
    let upper = if hi == 63 { !0u64 } else { (1u64 << (hi + 1)) - 1 };
    upper & !((1u64 << lo) - 1)
}

impl BitsetContainer {
    pub(crate) fn new() -> Self {
        Self {
            words: Box::new([0u64; BITSET_WORDS]),
            len: Some(0),
        }
    }

    /// Build from raw words, counting the set bits.
    pub(crate) fn from_words(words: Box<[u64; BITSET_WORDS]>) -> Self {
        let len = words.iter().map(|w| w.count_ones()).sum();
        Self {
            words,
            len: Some(len),
        }
    }

    pub(crate) fn from_array(array: &ArrayContainer) -> Self {
        let mut bitset = Self::new();
        for v in array.iter() {
            bitset.words[usize::from(v) / 64] |= 1u64 << (v % 64);
        }
        bitset.len = Some(array.len());
        bitset
    }

    pub(crate) fn from_intervals(runs: &[Interval]) -> Self {
        let mut bitset = Self::new();
        for &iv in runs {
            bitset.insert_range(iv);
        }
        bitset
    }

    pub(crate) fn words(&self) -> &[u64; BITSET_WORDS] {
        &self.words
    }

    fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Cardinality; recounted if a lazy combine left it unknown.
    pub(crate) fn len(&self) -> u32 {
        self.len.unwrap_or_else(|| self.count_ones())
    }

    pub(crate) fn is_len_known(&self) -> bool {
        self.len.is_some()
    }

    /// Recompute the cardinality after lazy combines.
    pub(crate) fn repair_len(&mut self) {
        if self.len.is_none() {
            self.len = Some(self.count_ones());
        }
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        self.words[usize::from(value) / 64] & (1u64 << (value % 64)) != 0
    }

    pub(crate) fn insert(&mut self, value: u16) -> bool {
        let word = &mut self.words[usize::from(value) / 64];
        let mask = 1u64 << (value % 64);
        let absent = *word & mask == 0;
        *word |= mask;
        if absent {
            if let Some(len) = &mut self.len {
                *len += 1;
            }
        }
        absent
    }

    pub(crate) fn remove(&mut self, value: u16) -> bool {
        let word = &mut self.words[usize::from(value) / 64];
        let mask = 1u64 << (value % 64);
        let present = *word & mask != 0;
        *word &= !mask;
        if present {
            if let Some(len) = &mut self.len {
                *len -= 1;
            }
        }
        present
    }

    pub(crate) fn toggle(&mut self, value: u16) {
        if !self.remove(value) {
            self.insert(value);
        }
    }

    /// Apply `f(word, mask)` to every word overlapping `iv`, keeping the
    /// cardinality in step.
    fn update_range(&mut self, iv: Interval, f: impl Fn(u64, u64) -> u64) {
        let (lo, hi) = (u32::from(iv.start), u32::from(iv.end));
        let (first, last) = ((lo / 64) as usize, (hi / 64) as usize);
        let mut delta: i64 = 0;
        for idx in first..=last {
            let wlo = if idx == first { lo % 64 } else { 0 };
            let whi = if idx == last { hi % 64 } else { 63 };
            let before = self.words[idx];
            let after = f(before, word_mask(wlo, whi));
            self.words[idx] = after;
            delta += i64::from(after.count_ones()) - i64::from(before.count_ones());
        }
        if let Some(len) = &mut self.len {
            *len = (i64::from(*len) + delta) as u32;
        }
    }

    pub(crate) fn insert_range(&mut self, iv: Interval) {
        self.update_range(iv, |w, m| w | m);
    }

    pub(crate) fn remove_range(&mut self, iv: Interval) {
        self.update_range(iv, |w, m| w & !m);
    }

    pub(crate) fn flip_range(&mut self, iv: Interval) {
        self.update_range(iv, |w, m| w ^ m);
    }

    /// True if any value of `iv` is present.
    pub(crate) fn intersects_range(&self, iv: Interval) -> bool {
        let (lo, hi) = (u32::from(iv.start), u32::from(iv.end));
        let (first, last) = ((lo / 64) as usize, (hi / 64) as usize);
        (first..=last).any(|idx| {
            let wlo = if idx == first { lo % 64 } else { 0 };
            let whi = if idx == last { hi % 64 } else { 63 };
            self.words[idx] & word_mask(wlo, whi) != 0
        })
    }

    /// Word-wise combine into a new bitset with an exact cardinality.
    pub(crate) fn combine(&self, other: &Self, op: SetOp) -> Self {
        let mut out = self.clone();
        out.combine_assign(other, op);
        out
    }

    pub(crate) fn combine_assign(&mut self, other: &Self, op: SetOp) {
        let mut len = 0;
        for (a, &b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = op.apply_words(*a, b);
            len += a.count_ones();
        }
        self.len = Some(len);
    }

    /// Word-wise combine that skips the population count.
    pub(crate) fn combine_assign_lazy(&mut self, other: &Self, op: SetOp) {
        for (a, &b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = op.apply_words(*a, b);
        }
        self.len = None;
    }

    pub(crate) fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(&a, &b)| a & b != 0)
    }

    pub(crate) fn select(&self, rank: u32) -> Option<u16> {
        let mut remaining = rank;
        for (idx, &word) in self.words.iter().enumerate() {
            let ones = word.count_ones();
            if remaining < ones {
                let mut w = word;
                for _ in 0..remaining {
                    w &= w - 1;
                }
                return Some((idx * 64) as u16 + w.trailing_zeros() as u16);
            }
            remaining -= ones;
        }
        None
    }

    /// Number of values `<= value`.
    pub(crate) fn rank(&self, value: u16) -> u32 {
        let idx = usize::from(value) / 64;
        let full: u32 = self.words[..idx].iter().map(|w| w.count_ones()).sum();
        full + (self.words[idx] & word_mask(0, u32::from(value % 64))).count_ones()
    }

    pub(crate) fn min(&self) -> Option<u16> {
        self.words
            .iter()
            .position(|&w| w != 0)
            .map(|idx| (idx * 64) as u16 + self.words[idx].trailing_zeros() as u16)
    }

    pub(crate) fn max(&self) -> Option<u16> {
        self.words
            .iter()
            .rposition(|&w| w != 0)
            .map(|idx| (idx * 64) as u16 + 63 - self.words[idx].leading_zeros() as u16)
    }

    pub(crate) fn iter(&self) -> BitsetIter<'_> {
        BitsetIter {
            words: &self.words,
            idx: 0,
            current: self.words[0],
        }
    }

    /// Number of maximal runs of set bits.
    pub(crate) fn count_runs(&self) -> usize {
        let mut runs = 0usize;
        let mut carry = 0u64;
        for &w in self.words.iter() {
            let starts = w & !((w << 1) | carry);
            runs += starts.count_ones() as usize;
            carry = w >> 63;
        }
        runs
    }

    pub(crate) fn to_array(&self) -> ArrayContainer {
        ArrayContainer::from_sorted(self.iter().collect())
    }

    pub(crate) fn to_intervals(&self) -> Vec<Interval> {
        crate::run::intervals_from_sorted(self.iter())
    }
}

/// Ascending iterator over the set bits of a bitset container.
#[derive(Clone)]
pub(crate) struct BitsetIter<'a> {
    words: &'a [u64; BITSET_WORDS],
    idx: usize,
    current: u64,
}

impl Iterator for BitsetIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.current == 0 {
            self.idx += 1;
            if self.idx >= BITSET_WORDS {
                return None;
            }
            self.current = self.words[self.idx];
        }
        let bit = self.current.trailing_zeros();
        self.current &= self.current - 1;
        Some((self.idx * 64) as u16 + bit as u16)
    }
}
