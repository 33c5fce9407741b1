//! Compressed bitmap over the 32-bit universe.
//!
//! Each value splits into a 16-bit chunk key (high half) and a 16-bit low
//! value. A [`Bitmap`] is a sorted vector of `(key, container)` chunks with
//! strictly increasing keys and no empty containers.
//!
//! # Example
//!
//! ```
//! use rbits::Bitmap;
//!
//! let mut bitmap = Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000]);
//! assert_eq!(bitmap.len(), 7);
//! assert!(bitmap.contains(100));
//! assert!(!bitmap.contains(6));
//!
//! bitmap.insert(u32::MAX);
//! assert_eq!(bitmap.select(7), Some(u32::MAX));
//! ```

use std::hash::{Hash, Hasher};
use std::ops::Range;

use crate::container::{Container, SetOp};
use crate::error::{Error, Result};
use crate::run::Interval;

/// Size of the 32-bit universe; the exclusive upper bound of ranges.
pub const UNIVERSE_SIZE: u64 = 1 << 32;

/// One chunk of the bitmap: all values sharing the same high 16 bits.
#[derive(Debug, Clone)]
pub(crate) struct Chunk {
    pub(crate) key: u16,
    pub(crate) container: Container,
}

impl Chunk {
    pub(crate) fn new(key: u16, container: Container) -> Self {
        Self { key, container }
    }
}

#[inline]
pub(crate) fn split(value: u32) -> (u16, u16) {
    ((value >> 16) as u16, value as u16)
}

#[inline]
pub(crate) fn join(key: u16, low: u16) -> u32 {
    (u32::from(key) << 16) | u32::from(low)
}

/// Reject reversed ranges and ranges past the universe.
pub(crate) fn check_range(range: &Range<u64>) -> Result<()> {
    if range.end < range.start {
        return Err(Error::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.end > UNIVERSE_SIZE {
        return Err(Error::ValueOutOfRange(range.end));
    }
    Ok(())
}

/// Per-chunk pieces of a validated, non-empty range.
fn chunk_spans(range: Range<u64>) -> impl Iterator<Item = (u16, Interval)> {
    let last_value = range.end - 1;
    let (first, last) = ((range.start >> 16) as u16, (last_value >> 16) as u16);
    (first..=last).map(move |key| {
        let lo = if key == first { range.start as u16 } else { 0 };
        let hi = if key == last { last_value as u16 } else { u16::MAX };
        (key, Interval::new(lo, hi))
    })
}

/// Compressed bitmap of `u32` values.
#[derive(Clone, Default)]
pub struct Bitmap {
    pub(crate) chunks: Vec<Chunk>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("len", &self.len())
            .field("containers", &self.chunks.len())
            .finish()
    }
}

impl Bitmap {
    /// Create an empty bitmap.
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Create a bitmap holding `range.start, range.start + step, ...` below
    /// `range.end`.
    ///
    /// With `step == 1` whole chunks are filled as runs without visiting
    /// every value.
    pub fn from_range(range: Range<u64>, step: u32) -> Result<Self> {
        check_range(&range)?;
        if step == 0 {
            return Err(Error::InvalidStep);
        }
        let mut bitmap = Self::new();
        if step == 1 {
            bitmap.insert_range(range)?;
            return Ok(bitmap);
        }
        for value in range.step_by(step as usize) {
            bitmap.push_ascending(value as u32);
        }
        Ok(bitmap)
    }

    /// Create a bitmap from a collection of values in any order.
    pub fn from_values(values: &[u32]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut bitmap = Self::new();
        for value in sorted {
            bitmap.push_ascending(value);
        }
        bitmap
    }

    /// Append a value known to be `>=` every value already present.
    pub(crate) fn push_ascending(&mut self, value: u32) {
        let (key, low) = split(value);
        match self.chunks.last_mut() {
            Some(chunk) if chunk.key == key => {
                chunk.container.insert(low);
            }
            _ => {
                let mut container = Container::default();
                container.insert(low);
                self.chunks.push(Chunk::new(key, container));
            }
        }
    }

    pub(crate) fn find(&self, key: u16) -> std::result::Result<usize, usize> {
        self.chunks.binary_search_by_key(&key, |c| c.key)
    }

    /// Number of values in the bitmap.
    pub fn len(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| u64::from(c.container.len()))
            .sum()
    }

    /// Return true if the bitmap holds no value.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Alias of [`Bitmap::len`].
    pub fn cardinality(&self) -> u64 {
        self.len()
    }

    /// Number of containers (distinct chunk keys).
    pub fn container_count(&self) -> usize {
        self.chunks.len()
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Return true if `value` is present.
    pub fn contains(&self, value: u32) -> bool {
        let (key, low) = split(value);
        match self.find(key) {
            Ok(idx) => self.chunks[idx].container.contains(low),
            Err(_) => false,
        }
    }

    /// Insert `value`, returning true if it was absent.
    pub fn insert(&mut self, value: u32) -> bool {
        let (key, low) = split(value);
        match self.find(key) {
            Ok(idx) => self.chunks[idx].container.insert(low),
            Err(idx) => {
                let mut container = Container::default();
                container.insert(low);
                self.chunks.insert(idx, Chunk::new(key, container));
                true
            }
        }
    }

    /// Insert every value of `values`, returning how many were new.
    pub fn insert_many(&mut self, values: &[u32]) -> u64 {
        values.iter().filter(|&&v| self.insert(v)).count() as u64
    }

    /// Remove `value`, returning true if it was present.
    ///
    /// A container emptied by the removal is dropped.
    pub fn remove(&mut self, value: u32) -> bool {
        let (key, low) = split(value);
        let Ok(idx) = self.find(key) else {
            return false;
        };
        let container = &mut self.chunks[idx].container;
        let removed = container.remove(low);
        if container.is_empty() {
            self.chunks.remove(idx);
        }
        removed
    }

    /// Remove every value of `values`, returning how many were present.
    pub fn remove_many(&mut self, values: &[u32]) -> u64 {
        values.iter().filter(|&&v| self.remove(v)).count() as u64
    }

    /// Insert every value of `range`, returning how many were new.
    ///
    /// Chunks that do not exist yet receive a single run and are never
    /// materialized value by value.
    pub fn insert_range(&mut self, range: Range<u64>) -> Result<u64> {
        check_range(&range)?;
        if range.is_empty() {
            return Ok(0);
        }
        let mut added = 0u64;
        for (key, iv) in chunk_spans(range) {
            match self.find(key) {
                Ok(idx) => {
                    let container = &mut self.chunks[idx].container;
                    let before = container.len();
                    container.op_assign(&Container::from_interval(iv), SetOp::Or);
                    added += u64::from(container.len() - before);
                }
                Err(idx) => {
                    added += u64::from(iv.len());
                    self.chunks
                        .insert(idx, Chunk::new(key, Container::from_interval(iv)));
                }
            }
        }
        Ok(added)
    }

    /// Remove every value of `range`, returning how many were present.
    pub fn remove_range(&mut self, range: Range<u64>) -> Result<u64> {
        check_range(&range)?;
        if range.is_empty() {
            return Ok(0);
        }
        let mut removed = 0u64;
        for (key, iv) in chunk_spans(range) {
            if let Ok(idx) = self.find(key) {
                let container = &mut self.chunks[idx].container;
                let before = container.len();
                container.op_assign(&Container::from_interval(iv), SetOp::AndNot);
                removed += u64::from(before - container.len());
            }
        }
        self.chunks.retain(|c| !c.container.is_empty());
        Ok(removed)
    }

    /// Complement every value of `range` in place.
    ///
    /// Chunks covered entirely are complemented wholesale; absent chunks
    /// become the complemented span directly.
    pub fn flip_inplace(&mut self, range: Range<u64>) -> Result<()> {
        check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        for (key, iv) in chunk_spans(range) {
            match self.find(key) {
                Ok(idx) => self.chunks[idx]
                    .container
                    .op_assign(&Container::from_interval(iv), SetOp::Xor),
                Err(idx) => self
                    .chunks
                    .insert(idx, Chunk::new(key, Container::from_interval(iv))),
            }
        }
        self.chunks.retain(|c| !c.container.is_empty());
        Ok(())
    }

    /// Return a copy with every value of `range` complemented.
    pub fn flip(&self, range: Range<u64>) -> Result<Self> {
        check_range(&range)?;
        let mut out = self.clone();
        out.flip_inplace(range)?;
        Ok(out)
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<u32> {
        let chunk = self.chunks.first()?;
        chunk.container.min().map(|low| join(chunk.key, low))
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<u32> {
        let chunk = self.chunks.last()?;
        chunk.container.max().map(|low| join(chunk.key, low))
    }

    /// Return the value of 0-based `rank` in ascending order.
    pub fn select(&self, rank: u64) -> Option<u32> {
        let mut remaining = rank;
        for chunk in &self.chunks {
            let len = u64::from(chunk.container.len());
            if remaining < len {
                return chunk
                    .container
                    .select(remaining as u32)
                    .map(|low| join(chunk.key, low));
            }
            remaining -= len;
        }
        None
    }

    /// Number of values `<= value`.
    pub fn rank(&self, value: u32) -> u64 {
        let (key, low) = split(value);
        let mut rank = 0u64;
        for chunk in &self.chunks {
            match chunk.key.cmp(&key) {
                std::cmp::Ordering::Less => rank += u64::from(chunk.container.len()),
                std::cmp::Ordering::Equal => {
                    rank += u64::from(chunk.container.rank(low));
                    break;
                }
                std::cmp::Ordering::Greater => break,
            }
        }
        rank
    }

    /// Collect every value in ascending order.
    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.chunks.len() == other.chunks.len()
            && self
                .chunks
                .iter()
                .zip(other.chunks.iter())
                .all(|(a, b)| a.key == b.key && a.container.content_eq(&b.container))
    }
}

impl Eq for Bitmap {}

/// Agrees with `PartialEq`: only encoding-independent summaries are hashed.
impl Hash for Bitmap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chunks.len().hash(state);
        for chunk in &self.chunks {
            chunk.key.hash(state);
            chunk.container.len().hash(state);
            chunk.container.min().hash(state);
            chunk.container.max().hash(state);
        }
    }
}

impl FromIterator<u32> for Bitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        bitmap.extend(iter);
        bitmap
    }
}

impl Extend<u32> for Bitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Kind;

    #[test]
    fn boundary_values() {
        let mut b = Bitmap::new();
        assert!(b.insert(0));
        assert!(b.insert(u32::MAX));
        assert!(!b.insert(0));
        assert_eq!(b.len(), 2);
        assert_eq!(b.container_count(), 2);
        assert_eq!(b.min(), Some(0));
        assert_eq!(b.max(), Some(u32::MAX));
        assert!(b.remove(u32::MAX));
        assert!(!b.contains(u32::MAX));
        assert_eq!(b.container_count(), 1);
    }

    #[test]
    fn from_range_with_step() {
        let b = Bitmap::from_range(10..100_000, 7).unwrap();
        assert_eq!(b.len(), (100_000 - 10 + 6) / 7);
        assert!(b.contains(10));
        assert!(b.contains(17));
        assert!(!b.contains(18));
        assert!(matches!(Bitmap::from_range(0..10, 0), Err(Error::InvalidStep)));
        assert!(Bitmap::from_range(5..3, 1).is_err());
        assert!(Bitmap::from_range(0..UNIVERSE_SIZE + 1, 1).is_err());
    }

    #[test]
    fn full_range_uses_runs() {
        let b = Bitmap::from_range(0..UNIVERSE_SIZE, 1).unwrap();
        assert_eq!(b.len(), UNIVERSE_SIZE);
        assert_eq!(b.container_count(), 65536);
        assert!(b.chunks.iter().all(|c| c.container.kind() == Kind::Run));
        assert_eq!(b.select(UNIVERSE_SIZE - 1), Some(u32::MAX));
        assert_eq!(b.select(UNIVERSE_SIZE), None);
    }

    #[test]
    fn range_insert_and_remove_across_chunks() {
        let mut b = Bitmap::from_values(&[5, 70_000]);
        assert_eq!(b.insert_range(60_000..140_000).unwrap(), 80_000 - 1);
        assert_eq!(b.len(), 80_001);
        assert_eq!(b.remove_range(0..65_536).unwrap(), 5_537);
        assert_eq!(b.min(), Some(65_536));
        assert_eq!(b.remove_range(0..UNIVERSE_SIZE).unwrap(), 74_464);
        assert!(b.is_empty());
    }

    #[test]
    fn flip_counts_complement() {
        let b = Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000]);
        let flipped = b.flip(0..1001).unwrap();
        assert_eq!(flipped.len(), 1001 - 7);
        assert!(flipped.contains(0));
        assert!(!flipped.contains(100));
        let mut back = flipped.clone();
        back.flip_inplace(0..1001).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn select_and_rank_agree() {
        let b = Bitmap::from_values(&[3, 9, 65_540, 200_000, 200_001]);
        for (i, v) in b.iter().enumerate() {
            assert_eq!(b.select(i as u64), Some(v));
            assert_eq!(b.rank(v), i as u64 + 1);
        }
        assert_eq!(b.select(5), None);
        assert_eq!(b.rank(2), 0);
        assert_eq!(b.rank(u32::MAX), 5);
    }

    #[test]
    fn hash_ignores_encoding() {
        use std::hash::{BuildHasher, RandomState};
        let state = RandomState::new();
        let mut runs = Bitmap::new();
        runs.insert_range(0..5000).unwrap();
        runs.insert(1 << 20);
        let mut values: Bitmap = (0..5000u32).collect();
        values.insert(1 << 20);
        assert_ne!(runs.chunks[0].container.kind(), values.chunks[0].container.kind());
        assert_eq!(state.hash_one(&runs), state.hash_one(&values));

        let set: std::collections::HashSet<Bitmap> = [runs, values].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn equality_ignores_encoding() {
        let mut a = Bitmap::new();
        a.insert_range(0..5000).unwrap();
        let b: Bitmap = (0..5000u32).collect();
        assert_ne!(
            a.chunks[0].container.kind(),
            b.chunks[0].container.kind()
        );
        assert_eq!(a, b);
    }
}
