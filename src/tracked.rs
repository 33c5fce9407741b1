//! Versioned bitmap with memoized derived values.
//!
//! [`TrackedBitmap`] wraps a [`Bitmap`] and bumps a version counter on every
//! mutating call. Population count, emptiness, the single-value test and the
//! materialized value list are cached as `(version, value)` records and only
//! recomputed after the version moves.
//!
//! Binary operations accept `Option` operands: an absent operand is the
//! identity, so combining with `None` returns the other side unchanged.
//!
//! ```
//! use rbits::TrackedBitmap;
//!
//! let mut bits = TrackedBitmap::new();
//! bits.set(3, true)?;
//! bits.set_range(10, 12, true)?;
//! assert_eq!(bits.population_count(), 4);
//! assert_eq!(bits.version(), 2);
//!
//! let all = TrackedBitmap::with_all(20)?;
//! assert!(bits.is_subset_of(&all));
//! let same = TrackedBitmap::and(Some(&bits), None).unwrap();
//! assert_eq!(same, bits);
//! # Ok::<(), rbits::Error>(())
//! ```

use std::cell::RefCell;
use std::sync::Arc;

use crate::bitmap::{Bitmap, UNIVERSE_SIZE};
use crate::error::{Error, Result};

/// Cached value tagged with the version it was computed at.
struct Memo<T> {
    slot: RefCell<Option<(u64, T)>>,
}

impl<T: Clone> Memo<T> {
    fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    fn get_or_compute(&self, version: u64, compute: impl FnOnce() -> T) -> T {
        if let Some((at, value)) = &*self.slot.borrow() {
            if *at == version {
                return value.clone();
            }
        }
        let value = compute();
        *self.slot.borrow_mut() = Some((version, value.clone()));
        value
    }
}

/// A [`Bitmap`] with a modification counter and cached summaries.
pub struct TrackedBitmap {
    bitmap: Bitmap,
    version: u64,
    population: Memo<u64>,
    has_value: Memo<bool>,
    has_one_value: Memo<bool>,
    values: Memo<Arc<[u32]>>,
}

fn checked_index(i: u64) -> Result<u32> {
    u32::try_from(i).map_err(|_| Error::ValueOutOfRange(i))
}

/// Convert an inclusive index pair into a half-open range.
fn inclusive(start: u64, end: u64) -> Result<std::ops::Range<u64>> {
    if end < start {
        return Err(Error::InvalidRange { start, end });
    }
    if end >= UNIVERSE_SIZE {
        return Err(Error::ValueOutOfRange(end));
    }
    Ok(start..end + 1)
}

impl TrackedBitmap {
    /// Create an empty bitmap at version 0.
    pub fn new() -> Self {
        Self::from(Bitmap::new())
    }

    /// Create a bitmap holding every index in `0..len`.
    pub fn with_all(len: u64) -> Result<Self> {
        Ok(Self::from(Bitmap::from_range(0..len, 1)?))
    }

    /// The wrapped bitmap.
    pub fn inner(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Unwrap into the plain bitmap.
    pub fn into_inner(self) -> Bitmap {
        self.bitmap
    }

    /// Number of mutating calls since construction or clone.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Return the bit at `index`.
    pub fn get(&self, index: u64) -> Result<bool> {
        Ok(self.bitmap.contains(checked_index(index)?))
    }

    /// Return true if any of `start, start + step, ...` up to `end`
    /// (inclusive) is set.
    pub fn get_any(&self, start: u64, end: u64, step: u64) -> Result<bool> {
        let range = inclusive(start, end)?;
        if step == 0 {
            return Err(Error::InvalidStep);
        }
        if step == 1 {
            let below = match range.start {
                0 => 0,
                s => self.bitmap.rank(s as u32 - 1),
            };
            return Ok(self.bitmap.rank(end as u32) > below);
        }
        Ok(range
            .step_by(step as usize)
            .any(|i| self.bitmap.contains(i as u32)))
    }

    /// Set or clear the bit at `index`.
    pub fn set(&mut self, index: u64, value: bool) -> Result<()> {
        let i = checked_index(index)?;
        if value {
            self.bitmap.insert(i);
        } else {
            self.bitmap.remove(i);
        }
        self.touch();
        Ok(())
    }

    /// Set or clear every bit from `start` to `end` inclusive.
    pub fn set_range(&mut self, start: u64, end: u64, value: bool) -> Result<()> {
        let range = inclusive(start, end)?;
        if value {
            self.bitmap.insert_range(range)?;
        } else {
            self.bitmap.remove_range(range)?;
        }
        self.touch();
        Ok(())
    }

    fn combine(
        a: Option<&Self>,
        b: Option<&Self>,
        op: fn(&Bitmap, &Bitmap) -> Bitmap,
    ) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Self::from(op(&a.bitmap, &b.bitmap))),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }

    /// Intersection; an absent side yields the other side.
    pub fn and(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        Self::combine(a, b, Bitmap::and)
    }

    /// Union; an absent side yields the other side.
    pub fn or(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        Self::combine(a, b, Bitmap::or)
    }

    /// Symmetric difference; an absent side yields the other side.
    pub fn xor(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        Self::combine(a, b, Bitmap::xor)
    }

    fn apply(&mut self, other: Option<&Self>, op: fn(&mut Bitmap, &Bitmap)) -> &mut Self {
        if let Some(other) = other {
            op(&mut self.bitmap, &other.bitmap);
            self.touch();
        }
        self
    }

    /// Intersect in place; `None` leaves the bitmap and version untouched.
    pub fn and_with(&mut self, other: Option<&Self>) -> &mut Self {
        self.apply(other, Bitmap::and_inplace)
    }

    /// Union in place; `None` is a no-op.
    pub fn or_with(&mut self, other: Option<&Self>) -> &mut Self {
        self.apply(other, Bitmap::or_inplace)
    }

    /// Symmetric difference in place; `None` is a no-op.
    pub fn xor_with(&mut self, other: Option<&Self>) -> &mut Self {
        self.apply(other, Bitmap::xor_inplace)
    }

    /// Clear every bit set in `other`; `None` is a no-op.
    pub fn exclude(&mut self, other: Option<&Self>) -> &mut Self {
        self.apply(other, Bitmap::and_not_inplace)
    }

    /// Return true if every set bit is also set in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.bitmap.is_subset(&other.bitmap)
    }

    /// Return true if every bit set in `other` is also set here.
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.bitmap.is_superset(&other.bitmap)
    }

    /// Return true if the two share a set bit; `None` never overlaps.
    pub fn overlaps(&self, other: Option<&Self>) -> bool {
        other.is_some_and(|o| self.bitmap.intersects(&o.bitmap))
    }

    /// Number of set bits.
    pub fn population_count(&self) -> u64 {
        self.population
            .get_or_compute(self.version, || self.bitmap.len())
    }

    /// Return true if any bit is set.
    pub fn has_value(&self) -> bool {
        self.has_value
            .get_or_compute(self.version, || !self.bitmap.is_empty())
    }

    /// Return true if exactly one bit is set.
    pub fn has_only_one_value(&self) -> bool {
        self.has_one_value
            .get_or_compute(self.version, || self.bitmap.len() == 1)
    }

    /// Every set index in ascending order, shared until the next mutation.
    pub fn values(&self) -> Arc<[u32]> {
        self.values
            .get_or_compute(self.version, || self.bitmap.iter().collect())
    }
}

impl Default for TrackedBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Bitmap> for TrackedBitmap {
    fn from(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            version: 0,
            population: Memo::new(),
            has_value: Memo::new(),
            has_one_value: Memo::new(),
            values: Memo::new(),
        }
    }
}

/// Copies the contents; the copy starts at version 0 with empty caches.
impl Clone for TrackedBitmap {
    fn clone(&self) -> Self {
        Self::from(self.bitmap.clone())
    }
}

impl PartialEq for TrackedBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.bitmap == other.bitmap
    }
}

impl Eq for TrackedBitmap {}

/// Hashes the contents only, so versions and caches never affect it.
impl std::hash::Hash for TrackedBitmap {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.bitmap, state);
    }
}

impl std::fmt::Debug for TrackedBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedBitmap")
            .field("version", &self.version)
            .field("bitmap", &self.bitmap)
            .finish()
    }
}
