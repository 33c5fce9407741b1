//! Sparse container: a sorted, duplicate-free array of 16-bit values.
//!
//! Used while a chunk holds at most [`ARRAY_MAX_LEN`](crate::ARRAY_MAX_LEN)
//! values. Membership is a binary search; set algebra between two arrays is
//! a single linear merge.

use crate::container::SetOp;
use crate::run::Interval;

/// Sorted `u16` array container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ArrayContainer {
    values: Vec<u16>,
}

impl ArrayContainer {
    pub(crate) fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Wrap an already sorted, deduplicated vector.
    pub(crate) fn from_sorted(values: Vec<u16>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        Self { values }
    }

    pub(crate) fn as_slice(&self) -> &[u16] {
        &self.values
    }

    pub(crate) fn len(&self) -> u32 {
        self.values.len() as u32
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    /// Insert `value`, returning true if it was absent.
    pub(crate) fn insert(&mut self, value: u16) -> bool {
        // Appending in ascending order is the common bulk-load path.
        if self.values.last().is_none_or(|&last| last < value) {
            self.values.push(value);
            return true;
        }
        match self.values.binary_search(&value) {
            Ok(_) => false,
            Err(pos) => {
                self.values.insert(pos, value);
                true
            }
        }
    }

    /// Remove `value`, returning true if it was present.
    pub(crate) fn remove(&mut self, value: u16) -> bool {
        match self.values.binary_search(&value) {
            Ok(pos) => {
                self.values.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Keep only the values for which `keep` returns true.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(u16) -> bool) {
        self.values.retain(|&v| keep(v));
    }

    /// Return a filtered copy.
    pub(crate) fn filter(&self, mut keep: impl FnMut(u16) -> bool) -> Self {
        Self {
            values: self.values.iter().copied().filter(|&v| keep(v)).collect(),
        }
    }

    pub(crate) fn select(&self, rank: u32) -> Option<u16> {
        self.values.get(rank as usize).copied()
    }

    /// Number of values `<= value`.
    pub(crate) fn rank(&self, value: u16) -> u32 {
        self.values.partition_point(|&v| v <= value) as u32
    }

    pub(crate) fn min(&self) -> Option<u16> {
        self.values.first().copied()
    }

    pub(crate) fn max(&self) -> Option<u16> {
        self.values.last().copied()
    }

    pub(crate) fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, u16>> {
        self.values.iter().copied()
    }

    /// Number of maximal runs of consecutive values.
    pub(crate) fn count_runs(&self) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        1 + self
            .values
            .windows(2)
            .filter(|w| u32::from(w[0]) + 1 != u32::from(w[1]))
            .count()
    }

    pub(crate) fn to_intervals(&self) -> Vec<Interval> {
        crate::run::intervals_from_sorted(self.iter())
    }

    /// Linear merge of two sorted arrays, keeping elements according to `op`.
    pub(crate) fn merge(&self, other: &Self, op: SetOp) -> Vec<u16> {
        let (a, b) = (&self.values, &other.values);
        let capacity = match op {
            SetOp::And => a.len().min(b.len()),
            SetOp::AndNot => a.len(),
            SetOp::Or | SetOp::Xor => a.len() + b.len(),
        };
        let mut out = Vec::with_capacity(capacity);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    if op.keep(true, false) {
                        out.push(a[i]);
                    }
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    if op.keep(false, true) {
                        out.push(b[j]);
                    }
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    if op.keep(true, true) {
                        out.push(a[i]);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        if op.keep(true, false) {
            out.extend_from_slice(&a[i..]);
        }
        if op.keep(false, true) {
            out.extend_from_slice(&b[j..]);
        }
        out
    }

    /// True if the two arrays share at least one value.
    pub(crate) fn intersects(&self, other: &Self) -> bool {
        let (a, b) = (&self.values, &other.values);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Portable payload size: two bytes per value.
    pub(crate) fn serialized_size(&self) -> usize {
        self.values.len() * 2
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.values.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(values: &[u16]) -> ArrayContainer {
        ArrayContainer::from_sorted(values.to_vec())
    }

    #[test]
    fn insert_keeps_sorted_order() {
        let mut a = ArrayContainer::new();
        assert!(a.insert(10));
        assert!(a.insert(3));
        assert!(a.insert(7));
        assert!(!a.insert(7));
        assert_eq!(a.as_slice(), &[3, 7, 10]);
        assert!(a.remove(7));
        assert!(!a.remove(7));
        assert_eq!(a.as_slice(), &[3, 10]);
    }

    #[test]
    fn merge_covers_all_ops() {
        let a = array(&[1, 2, 3, 4, 5, 100, 1000]);
        let b = array(&[3, 4, 5, 7, 100, 1020]);
        assert_eq!(a.merge(&b, SetOp::And), vec![3, 4, 5, 100]);
        assert_eq!(
            a.merge(&b, SetOp::Or),
            vec![1, 2, 3, 4, 5, 7, 100, 1000, 1020]
        );
        assert_eq!(a.merge(&b, SetOp::AndNot), vec![1, 2, 1000]);
        assert_eq!(a.merge(&b, SetOp::Xor), vec![1, 2, 7, 1000, 1020]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&array(&[6, 8])));
    }

    #[test]
    fn rank_select_and_runs() {
        let a = array(&[1, 2, 3, 10, 11, 65535]);
        assert_eq!(a.select(3), Some(10));
        assert_eq!(a.select(6), None);
        assert_eq!(a.rank(0), 0);
        assert_eq!(a.rank(10), 4);
        assert_eq!(a.rank(65535), 6);
        assert_eq!(a.count_runs(), 3);
        assert_eq!(
            a.to_intervals(),
            vec![
                Interval::new(1, 3),
                Interval::new(10, 11),
                Interval::new(65535, 65535)
            ]
        );
    }
}
