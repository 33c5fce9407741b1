//! Boolean algebra between bitmaps.
//!
//! # Merge-join
//!
//! Both operands are sorted by chunk key, so a binary operation is a single
//! merge over the two key sequences:
//!
//! | Key present in | AND  | OR   | XOR  | ANDNOT |
//! |----------------|------|------|------|--------|
//! | left only      | drop | copy | copy | copy   |
//! | right only     | drop | copy | copy | drop   |
//! | both           | container op, dropped if empty  ||||
//!
//! Result keys stay strictly increasing by construction.
//!
//! # Lazy unions
//!
//! Chaining many unions pays for a population count on every dense
//! container at every step. [`LazyBitmap`] skips that bookkeeping and
//! leaves containers in whatever encoding the combine produced;
//! [`LazyBitmap::repair`] recounts and renormalizes once at the end. A lazy
//! result has no cardinality query at all, so it cannot be observed before
//! the repair.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use tracing::{debug, trace};

use crate::bitmap::{Bitmap, Chunk};
use crate::container::{Container, SetOp};

/// Merge `right` into `left` in place, combining shared keys with `combine`.
///
/// Empty results are dropped when `drop_empty` is set; lazy merges keep
/// them for the repair pass.
fn merge_into(
    left: &mut Vec<Chunk>,
    right: &[Chunk],
    op: SetOp,
    drop_empty: bool,
    mut combine: impl FnMut(&mut Container, &Container),
) {
    let keep_right_only = op.keep(false, true);
    let keep_left_only = op.keep(true, false);
    let mut out = Vec::with_capacity(left.len().max(right.len()));
    let mut rhs = right.iter().peekable();
    for mut chunk in std::mem::take(left) {
        while let Some(r) = rhs.next_if(|r| r.key < chunk.key) {
            if keep_right_only {
                out.push(r.clone());
            }
        }
        match rhs.next_if(|r| r.key == chunk.key) {
            Some(r) => {
                combine(&mut chunk.container, &r.container);
                if !drop_empty || !chunk.container.is_empty() {
                    out.push(chunk);
                }
            }
            None if keep_left_only => out.push(chunk),
            None => {}
        }
    }
    if keep_right_only {
        out.extend(rhs.cloned());
    }
    *left = out;
}

impl Bitmap {
    fn merge(&self, other: &Bitmap, op: SetOp) -> Bitmap {
        let (a, b) = (&self.chunks, &other.chunks);
        let mut chunks = Vec::with_capacity(a.len().max(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].key.cmp(&b[j].key) {
                std::cmp::Ordering::Less => {
                    if op.keep(true, false) {
                        chunks.push(a[i].clone());
                    }
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    if op.keep(false, true) {
                        chunks.push(b[j].clone());
                    }
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    let container = a[i].container.op(&b[j].container, op);
                    if !container.is_empty() {
                        chunks.push(Chunk::new(a[i].key, container));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        if op.keep(true, false) {
            chunks.extend_from_slice(&a[i..]);
        }
        if op.keep(false, true) {
            chunks.extend_from_slice(&b[j..]);
        }
        Bitmap { chunks }
    }

    fn merge_inplace(&mut self, other: &Bitmap, op: SetOp) {
        merge_into(&mut self.chunks, &other.chunks, op, true, |c, r| {
            c.op_assign(r, op)
        });
    }

    /// Intersection.
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        self.merge(other, SetOp::And)
    }

    /// Union.
    pub fn or(&self, other: &Bitmap) -> Bitmap {
        self.merge(other, SetOp::Or)
    }

    /// Symmetric difference.
    pub fn xor(&self, other: &Bitmap) -> Bitmap {
        self.merge(other, SetOp::Xor)
    }

    /// Difference: values of `self` absent from `other`.
    pub fn and_not(&self, other: &Bitmap) -> Bitmap {
        self.merge(other, SetOp::AndNot)
    }

    /// In-place intersection.
    pub fn and_inplace(&mut self, other: &Bitmap) {
        self.merge_inplace(other, SetOp::And);
    }

    /// In-place union.
    pub fn or_inplace(&mut self, other: &Bitmap) {
        self.merge_inplace(other, SetOp::Or);
    }

    /// In-place symmetric difference.
    pub fn xor_inplace(&mut self, other: &Bitmap) {
        self.merge_inplace(other, SetOp::Xor);
    }

    /// In-place difference.
    pub fn and_not_inplace(&mut self, other: &Bitmap) {
        self.merge_inplace(other, SetOp::AndNot);
    }

    /// Cardinality of the intersection, without materializing it.
    pub fn and_len(&self, other: &Bitmap) -> u64 {
        let mut len = 0u64;
        let mut rhs = other.chunks.iter().peekable();
        for chunk in &self.chunks {
            while rhs.next_if(|r| r.key < chunk.key).is_some() {}
            if let Some(r) = rhs.next_if(|r| r.key == chunk.key) {
                len += u64::from(chunk.container.op(&r.container, SetOp::And).len());
            }
        }
        len
    }

    /// Cardinality of the union.
    pub fn or_len(&self, other: &Bitmap) -> u64 {
        self.len() + other.len() - self.and_len(other)
    }

    /// Cardinality of the symmetric difference.
    pub fn xor_len(&self, other: &Bitmap) -> u64 {
        self.len() + other.len() - 2 * self.and_len(other)
    }

    /// Cardinality of the difference.
    pub fn and_not_len(&self, other: &Bitmap) -> u64 {
        self.len() - self.and_len(other)
    }

    /// Return true if the bitmaps share at least one value.
    pub fn intersects(&self, other: &Bitmap) -> bool {
        let mut rhs = other.chunks.iter().peekable();
        for chunk in &self.chunks {
            while rhs.next_if(|r| r.key < chunk.key).is_some() {}
            if let Some(r) = rhs.next_if(|r| r.key == chunk.key) {
                if chunk.container.intersects(&r.container) {
                    return true;
                }
            }
        }
        false
    }

    /// Return true if every value of `self` is in `other`.
    pub fn is_subset(&self, other: &Bitmap) -> bool {
        let mut rhs = other.chunks.iter().peekable();
        for chunk in &self.chunks {
            while rhs.next_if(|r| r.key < chunk.key).is_some() {}
            match rhs.next_if(|r| r.key == chunk.key) {
                Some(r) => {
                    if chunk.container.len() > r.container.len()
                        || !chunk.container.op(&r.container, SetOp::AndNot).is_empty()
                    {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Return true if every value of `other` is in `self`.
    pub fn is_superset(&self, other: &Bitmap) -> bool {
        other.is_subset(self)
    }

    /// Start a lazy union from a copy of `self`.
    ///
    /// With `bitset_conversion`, shared containers are widened to bitsets so
    /// further lazy unions accumulate word-wise.
    pub fn lazy_or(&self, other: &Bitmap, bitset_conversion: bool) -> LazyBitmap {
        let mut lazy = LazyBitmap::from(self.clone());
        lazy.or_inplace(other, bitset_conversion);
        lazy
    }

    /// Start a lazy symmetric difference from a copy of `self`.
    pub fn lazy_xor(&self, other: &Bitmap, bitset_conversion: bool) -> LazyBitmap {
        let mut lazy = LazyBitmap::from(self.clone());
        lazy.xor_inplace(other, bitset_conversion);
        lazy
    }

    /// Union of any number of bitmaps, folded left to right.
    pub fn or_many<'a, I>(bitmaps: I) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        Self::fold_lazy(bitmaps, SetOp::Or)
    }

    /// Symmetric difference of any number of bitmaps.
    pub fn xor_many<'a, I>(bitmaps: I) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        Self::fold_lazy(bitmaps, SetOp::Xor)
    }

    fn fold_lazy<'a, I>(bitmaps: I, op: SetOp) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        let mut iter = bitmaps.into_iter();
        let Some(first) = iter.next() else {
            return Bitmap::new();
        };
        let mut acc = LazyBitmap::from(first.clone());
        let mut operands = 1usize;
        for bitmap in iter {
            acc.merge(bitmap, op, true);
            operands += 1;
        }
        trace!(operands, ?op, "folded bitmaps lazily");
        acc.repair()
    }

    /// Union of any number of bitmaps, always merging the two operands with
    /// the fewest containers first.
    ///
    /// Equal to [`Bitmap::or_many`]; cheaper when operand sizes are skewed.
    pub fn or_many_heap<'a, I>(bitmaps: I) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        let mut slots: Vec<Option<Cow<'a, Bitmap>>> =
            bitmaps.into_iter().map(|b| Some(Cow::Borrowed(b))).collect();
        let mut heap: BinaryHeap<Reverse<(usize, usize)>> = slots
            .iter()
            .enumerate()
            .filter_map(|(idx, b)| b.as_ref().map(|b| Reverse((b.container_count(), idx))))
            .collect();
        trace!(operands = slots.len(), "heap union");
        while heap.len() > 1 {
            let (Some(Reverse((_, i))), Some(Reverse((_, j)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            let (Some(a), Some(b)) = (slots[i].take(), slots[j].take()) else {
                continue;
            };
            let mut merged = a.into_owned();
            merged.or_inplace(&b);
            heap.push(Reverse((merged.container_count(), i)));
            slots[i] = Some(Cow::Owned(merged));
        }
        heap.pop()
            .and_then(|Reverse((_, idx))| slots[idx].take())
            .map(Cow::into_owned)
            .unwrap_or_default()
    }
}

/// Result of lazy unions or symmetric differences awaiting repair.
///
/// Dense containers inside a `LazyBitmap` may carry stale cardinalities
/// and sit on the wrong side of the array/bitset threshold, so it offers no
/// queries; call [`LazyBitmap::repair`] to obtain a [`Bitmap`].
#[derive(Debug, Clone, Default)]
pub struct LazyBitmap {
    chunks: Vec<Chunk>,
}

impl From<Bitmap> for LazyBitmap {
    fn from(bitmap: Bitmap) -> Self {
        Self {
            chunks: bitmap.chunks,
        }
    }
}

impl LazyBitmap {
    fn merge(&mut self, other: &Bitmap, op: SetOp, bitset_conversion: bool) {
        merge_into(&mut self.chunks, &other.chunks, op, false, |c, r| {
            if bitset_conversion {
                c.convert_to_bitset();
            }
            c.lazy_op_assign(r, op);
        });
    }

    /// Lazily union `other` into this result.
    pub fn or_inplace(&mut self, other: &Bitmap, bitset_conversion: bool) {
        self.merge(other, SetOp::Or, bitset_conversion);
    }

    /// Lazily xor `other` into this result.
    pub fn xor_inplace(&mut self, other: &Bitmap, bitset_conversion: bool) {
        self.merge(other, SetOp::Xor, bitset_conversion);
    }

    /// Recount and renormalize every container, dropping empty ones.
    pub fn repair(mut self) -> Bitmap {
        let lazy = self.chunks.iter().filter(|c| c.container.is_lazy()).count();
        for chunk in &mut self.chunks {
            chunk.container.repair();
        }
        let before = self.chunks.len();
        self.chunks.retain(|c| !c.container.is_empty());
        debug!(
            containers = self.chunks.len(),
            recounted = lazy,
            dropped = before - self.chunks.len(),
            "repaired lazy bitmap"
        );
        Bitmap {
            chunks: self.chunks,
        }
    }
}

impl BitAnd<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    fn bitand(self, rhs: &Bitmap) -> Bitmap {
        self.and(rhs)
    }
}

impl BitOr<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    fn bitor(self, rhs: &Bitmap) -> Bitmap {
        self.or(rhs)
    }
}

impl BitXor<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    fn bitxor(self, rhs: &Bitmap) -> Bitmap {
        self.xor(rhs)
    }
}

impl Sub<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    fn sub(self, rhs: &Bitmap) -> Bitmap {
        self.and_not(rhs)
    }
}

impl BitAndAssign<&Bitmap> for Bitmap {
    fn bitand_assign(&mut self, rhs: &Bitmap) {
        self.and_inplace(rhs);
    }
}

impl BitOrAssign<&Bitmap> for Bitmap {
    fn bitor_assign(&mut self, rhs: &Bitmap) {
        self.or_inplace(rhs);
    }
}

impl BitXorAssign<&Bitmap> for Bitmap {
    fn bitxor_assign(&mut self, rhs: &Bitmap) {
        self.xor_inplace(rhs);
    }
}

impl SubAssign<&Bitmap> for Bitmap {
    fn sub_assign(&mut self, rhs: &Bitmap) {
        self.and_not_inplace(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Kind;

    const V1: [u32; 7] = [1, 2, 3, 4, 5, 100, 1000];
    const V3: [u32; 6] = [3, 4, 5, 7, 100, 1020];

    #[test]
    fn binary_ops_on_small_sets() {
        let a = Bitmap::from_values(&V1);
        let b = Bitmap::from_values(&V3);
        assert_eq!((&a | &b).len(), 9);
        assert_eq!((&a & &b).to_vec(), vec![3, 4, 5, 100]);
        assert_eq!((&a - &b).to_vec(), vec![1, 2, 1000]);
        assert_eq!((&a ^ &b).to_vec(), vec![1, 2, 7, 1000, 1020]);
        assert_eq!(a.or_len(&b), 9);
        assert_eq!(a.and_len(&b), 4);
        assert_eq!(a.xor_len(&b), 5);
        assert_eq!(a.and_not_len(&b), 3);
    }

    #[test]
    fn inplace_ops_match_pure_ops() {
        let mut a = Bitmap::from_range(0..300_000, 3).unwrap();
        a.insert_range(500_000..600_000).unwrap();
        let mut b = Bitmap::from_range(100_000..400_000, 2).unwrap();
        b.insert_range(550_000..700_000).unwrap();
        for (pure, op) in [
            (a.and(&b), Bitmap::and_inplace as fn(&mut Bitmap, &Bitmap)),
            (a.or(&b), Bitmap::or_inplace as fn(&mut Bitmap, &Bitmap)),
            (a.xor(&b), Bitmap::xor_inplace as fn(&mut Bitmap, &Bitmap)),
            (a.and_not(&b), Bitmap::and_not_inplace as fn(&mut Bitmap, &Bitmap)),
        ] {
            let mut inplace = a.clone();
            op(&mut inplace, &b);
            assert_eq!(inplace, pure);
            assert_eq!(inplace.len(), pure.len());
        }
    }

    #[test]
    fn disjoint_keys_follow_merge_table() {
        let a = Bitmap::from_values(&[1, 1 << 16]);
        let b = Bitmap::from_values(&[2 << 16]);
        assert!(a.and(&b).is_empty());
        assert_eq!(a.or(&b).container_count(), 3);
        assert_eq!(a.xor(&b).container_count(), 3);
        assert_eq!(a.and_not(&b), a);
        assert!(!a.intersects(&b));
        let mut c = a.clone();
        c.xor_inplace(&a);
        assert!(c.is_empty());
    }

    #[test]
    fn subset_and_superset() {
        let small = Bitmap::from_values(&[3, 4, 100]);
        let big = Bitmap::from_values(&V1);
        assert!(small.is_subset(&big));
        assert!(big.is_superset(&small));
        assert!(!big.is_subset(&small));
        assert!(Bitmap::new().is_subset(&small));
    }

    #[test]
    fn lazy_union_repairs_to_eager_result() {
        let parts: Vec<Bitmap> = (0..8u64)
            .map(|i| Bitmap::from_range(i * 1000..i * 1000 + 3000, 5).unwrap())
            .collect();
        let mut lazy = parts[0].lazy_or(&parts[1], true);
        for p in &parts[2..] {
            lazy.or_inplace(p, true);
        }
        let repaired = lazy.repair();
        let eager = parts.iter().fold(Bitmap::new(), |acc, p| acc.or(p));
        assert_eq!(repaired, eager);
        assert!(repaired
            .chunks
            .iter()
            .all(|c| c.container.kind() == Kind::Array));
    }

    #[test]
    fn lazy_xor_drops_emptied_containers() {
        let a = Bitmap::from_range(0..100_000, 1).unwrap();
        let repaired = a.lazy_xor(&a, true).repair();
        assert!(repaired.is_empty());
    }

    #[test]
    fn nary_ops_equal_left_fold() {
        let parts: Vec<Bitmap> = (0..6u64)
            .map(|i| Bitmap::from_range(i * 40_000..i * 40_000 + 90_000, i as u32 + 1).unwrap())
            .collect();
        let or_fold = parts.iter().fold(Bitmap::new(), |acc, p| acc.or(p));
        let xor_fold = parts.iter().fold(Bitmap::new(), |acc, p| acc.xor(p));
        assert_eq!(Bitmap::or_many(&parts), or_fold);
        assert_eq!(Bitmap::or_many_heap(&parts), or_fold);
        assert_eq!(Bitmap::xor_many(&parts), xor_fold);
        assert!(Bitmap::or_many(std::iter::empty()).is_empty());
        assert!(Bitmap::or_many_heap(std::iter::empty()).is_empty());
    }
}
