//! Run-length container: sorted, disjoint, non-adjacent intervals.
//!
//! A chunk whose values cluster into long contiguous ranges is stored as a
//! list of inclusive `[start, end]` intervals. Cardinality is the sum of the
//! interval lengths, O(runs). Binary operations between interval lists are
//! a single boundary sweep.

use crate::container::SetOp;

/// Inclusive interval of 16-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interval {
    pub(crate) start: u16,
    pub(crate) end: u16,
}

impl Interval {
    pub(crate) fn new(start: u16, end: u16) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Number of values covered.
    pub(crate) fn len(self) -> u32 {
        u32::from(self.end) - u32::from(self.start) + 1
    }
}

/// Coalesce an ascending sequence of values into maximal intervals.
pub(crate) fn intervals_from_sorted(values: impl IntoIterator<Item = u16>) -> Vec<Interval> {
    let mut runs: Vec<Interval> = Vec::new();
    for v in values {
        match runs.last_mut() {
            Some(last) if u32::from(last.end) + 1 == u32::from(v) => last.end = v,
            _ => runs.push(Interval::new(v, v)),
        }
    }
    runs
}

/// Combine two canonical interval lists with `op`.
///
/// Every boundary of either list splits the line into segments whose
/// membership is constant, so evaluating `op` once per segment is exact.
/// The output is canonical: sorted, disjoint and non-adjacent.
pub(crate) fn combine_intervals(a: &[Interval], b: &[Interval], op: SetOp) -> Vec<Interval> {
    let mut bounds: Vec<u32> = a
        .iter()
        .chain(b.iter())
        .flat_map(|iv| [u32::from(iv.start), u32::from(iv.end) + 1])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut out: Vec<Interval> = Vec::new();
    let (mut i, mut j) = (0, 0);
    for seg in bounds.windows(2) {
        let (lo, hi) = (seg[0], seg[1] - 1);
        while i < a.len() && u32::from(a[i].end) < lo {
            i += 1;
        }
        while j < b.len() && u32::from(b[j].end) < lo {
            j += 1;
        }
        let in_a = i < a.len() && u32::from(a[i].start) <= lo;
        let in_b = j < b.len() && u32::from(b[j].start) <= lo;
        if !op.keep(in_a, in_b) {
            continue;
        }
        match out.last_mut() {
            Some(last) if u32::from(last.end) + 1 == lo => last.end = hi as u16,
            _ => out.push(Interval::new(lo as u16, hi as u16)),
        }
    }
    out
}

/// Run-length encoded container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RunContainer {
    runs: Vec<Interval>,
}

impl RunContainer {
    /// Wrap a canonical interval list.
    pub(crate) fn from_intervals(runs: Vec<Interval>) -> Self {
        debug_assert!(runs
            .windows(2)
            .all(|w| u32::from(w[0].end) + 1 < u32::from(w[1].start)));
        Self { runs }
    }

    pub(crate) fn from_interval(iv: Interval) -> Self {
        Self { runs: vec![iv] }
    }

    pub(crate) fn full() -> Self {
        Self::from_interval(Interval::new(0, u16::MAX))
    }

    pub(crate) fn runs(&self) -> &[Interval] {
        &self.runs
    }

    pub(crate) fn num_runs(&self) -> usize {
        self.runs.len()
    }

    pub(crate) fn len(&self) -> u32 {
        self.runs.iter().map(|iv| iv.len()).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.runs == [Interval::new(0, u16::MAX)]
    }

    /// Index of the first run starting after `value`.
    fn upper(&self, value: u16) -> usize {
        self.runs.partition_point(|iv| iv.start <= value)
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        match self.upper(value) {
            0 => false,
            idx => self.runs[idx - 1].end >= value,
        }
    }

    /// Insert `value`, extending or merging neighbouring runs.
    pub(crate) fn insert(&mut self, value: u16) -> bool {
        let idx = self.upper(value);
        if idx > 0 && self.runs[idx - 1].end >= value {
            return false;
        }
        let joins_prev = idx > 0 && u32::from(self.runs[idx - 1].end) + 1 == u32::from(value);
        let joins_next =
            idx < self.runs.len() && u32::from(value) + 1 == u32::from(self.runs[idx].start);
        match (joins_prev, joins_next) {
            (true, true) => {
                self.runs[idx - 1].end = self.runs[idx].end;
                self.runs.remove(idx);
            }
            (true, false) => self.runs[idx - 1].end = value,
            (false, true) => self.runs[idx].start = value,
            (false, false) => self.runs.insert(idx, Interval::new(value, value)),
        }
        true
    }

    /// Remove `value`, shrinking or splitting its run.
    pub(crate) fn remove(&mut self, value: u16) -> bool {
        let idx = match self.upper(value) {
            0 => return false,
            idx => idx - 1,
        };
        let run = self.runs[idx];
        if run.end < value {
            return false;
        }
        if run.start == run.end {
            self.runs.remove(idx);
        } else if value == run.start {
            self.runs[idx].start = value + 1;
        } else if value == run.end {
            self.runs[idx].end = value - 1;
        } else {
            self.runs[idx].end = value - 1;
            self.runs.insert(idx + 1, Interval::new(value + 1, run.end));
        }
        true
    }

    pub(crate) fn select(&self, rank: u32) -> Option<u16> {
        let mut remaining = rank;
        for iv in &self.runs {
            if remaining < iv.len() {
                return Some(iv.start + remaining as u16);
            }
            remaining -= iv.len();
        }
        None
    }

    /// Number of values `<= value`.
    pub(crate) fn rank(&self, value: u16) -> u32 {
        let idx = self.upper(value);
        let mut rank: u32 = self.runs[..idx].iter().map(|iv| iv.len()).sum();
        if idx > 0 {
            let last = self.runs[idx - 1];
            if last.end > value {
                rank -= u32::from(last.end - value);
            }
        }
        rank
    }

    pub(crate) fn min(&self) -> Option<u16> {
        self.runs.first().map(|iv| iv.start)
    }

    pub(crate) fn max(&self) -> Option<u16> {
        self.runs.last().map(|iv| iv.end)
    }

    pub(crate) fn iter(&self) -> RunIter<'_> {
        RunIter {
            runs: self.runs.iter(),
            next: 1,
            end: 0,
        }
    }

    /// Portable payload size: run count plus two `u16` per run.
    pub(crate) fn serialized_size(&self) -> usize {
        run_serialized_size(self.runs.len())
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.runs.shrink_to_fit();
    }
}

pub(crate) fn run_serialized_size(num_runs: usize) -> usize {
    2 + 4 * num_runs
}

/// Ascending iterator expanding each interval.
#[derive(Clone)]
pub(crate) struct RunIter<'a> {
    runs: std::slice::Iter<'a, Interval>,
    next: u32,
    end: u32,
}

impl Iterator for RunIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.next > self.end {
            let iv = self.runs.next()?;
            self.next = u32::from(iv.start);
            self.end = u32::from(iv.end);
        }
        let value = self.next as u16;
        self.next += 1;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pairs: &[(u16, u16)]) -> Vec<Interval> {
        pairs.iter().map(|&(s, e)| Interval::new(s, e)).collect()
    }

    #[test]
    fn insert_merges_adjacent_runs() {
        let mut r = RunContainer::from_intervals(runs(&[(1, 3), (5, 7)]));
        assert!(r.insert(4));
        assert_eq!(r.runs(), runs(&[(1, 7)]).as_slice());
        assert!(!r.insert(2));
        assert!(r.insert(0));
        assert!(r.insert(65535));
        assert!(r.insert(9));
        assert_eq!(r.runs(), runs(&[(0, 7), (9, 9), (65535, 65535)]).as_slice());
        assert_eq!(r.len(), 10);
    }

    #[test]
    fn remove_splits_runs() {
        let mut r = RunContainer::from_intervals(runs(&[(10, 20)]));
        assert!(r.remove(15));
        assert_eq!(r.runs(), runs(&[(10, 14), (16, 20)]).as_slice());
        assert!(r.remove(10));
        assert!(r.remove(20));
        assert!(!r.remove(20));
        assert_eq!(r.runs(), runs(&[(11, 14), (16, 19)]).as_slice());
        assert!(r.contains(11));
        assert!(!r.contains(15));
    }

    #[test]
    fn combine_sweep() {
        let a = runs(&[(0, 9), (20, 29)]);
        let b = runs(&[(5, 24)]);
        assert_eq!(combine_intervals(&a, &b, SetOp::And), runs(&[(5, 9), (20, 24)]));
        assert_eq!(combine_intervals(&a, &b, SetOp::Or), runs(&[(0, 29)]));
        assert_eq!(combine_intervals(&a, &b, SetOp::AndNot), runs(&[(0, 4), (25, 29)]));
        assert_eq!(
            combine_intervals(&a, &b, SetOp::Xor),
            runs(&[(0, 4), (10, 19), (25, 29)])
        );
        let full = runs(&[(0, 65535)]);
        assert!(combine_intervals(&full, &full, SetOp::Xor).is_empty());
        assert_eq!(combine_intervals(&full, &[], SetOp::Or), full);
    }

    #[test]
    fn select_rank_iter() {
        let r = RunContainer::from_intervals(runs(&[(2, 4), (10, 11)]));
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2, 3, 4, 10, 11]);
        assert_eq!(r.select(3), Some(10));
        assert_eq!(r.select(5), None);
        assert_eq!(r.rank(3), 2);
        assert_eq!(r.rank(9), 3);
        assert_eq!(r.rank(11), 5);
        assert_eq!(r.rank(1), 0);
        assert!(RunContainer::full().is_full());
        assert_eq!(RunContainer::full().len(), 65536);
    }
}
