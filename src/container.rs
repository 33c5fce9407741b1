//! The closed set of container encodings and the per-pair operation table.
//!
//! Every chunk of 65536 values is stored as one of three variants:
//!
//! | Variant  | Payload                  | Best for                      |
//! |----------|--------------------------|-------------------------------|
//! | `Array`  | sorted `u16` values      | at most [`ARRAY_MAX_LEN`]     |
//! | `Bitset` | 1024 x `u64`             | dense chunks                  |
//! | `Run`    | `[start, end]` intervals | clustered values              |
//!
//! Binary operations match on the `(left, right)` variant pair, so adding a
//! variant is a compile error until every combination is handled.
//!
//! # Representation rules
//!
//! - Single-value mutation moves between Array and Bitset at the threshold
//!   and never creates a Run.
//! - Array/Bitset results are normalized by the threshold.
//! - Results computed on intervals take whichever encoding is smallest,
//!   keeping Run on ties.

use crate::array::ArrayContainer;
use crate::bitset::{BitsetContainer, BitsetIter, BITSET_WORDS};
use crate::run::{combine_intervals, run_serialized_size, Interval, RunContainer, RunIter};

/// Largest cardinality stored as an array; one more value promotes to a bitset.
pub const ARRAY_MAX_LEN: usize = 4096;

/// Portable payload size of a bitset container.
pub(crate) const BITSET_BYTES: usize = BITSET_WORDS * 8;

/// Boolean set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    And,
    Or,
    Xor,
    AndNot,
}

impl SetOp {
    /// Membership of a value in the result given its membership in the operands.
    pub(crate) fn keep(self, in_left: bool, in_right: bool) -> bool {
        match self {
            SetOp::And => in_left && in_right,
            SetOp::Or => in_left || in_right,
            SetOp::Xor => in_left != in_right,
            SetOp::AndNot => in_left && !in_right,
        }
    }

    pub(crate) fn apply_words(self, a: u64, b: u64) -> u64 {
        match self {
            SetOp::And => a & b,
            SetOp::Or => a | b,
            SetOp::Xor => a ^ b,
            SetOp::AndNot => a & !b,
        }
    }
}

/// Encoding tag of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Array,
    Bitset,
    Run,
}

#[derive(Debug, Clone)]
pub(crate) enum Container {
    Array(ArrayContainer),
    Bitset(BitsetContainer),
    Run(RunContainer),
}

impl Default for Container {
    fn default() -> Self {
        Container::Array(ArrayContainer::new())
    }
}

impl Container {
    /// Array below the threshold, bitset above.
    pub(crate) fn from_sorted_vec(values: Vec<u16>) -> Self {
        let array = ArrayContainer::from_sorted(values);
        if array.len() as usize > ARRAY_MAX_LEN {
            Container::Bitset(BitsetContainer::from_array(&array))
        } else {
            Container::Array(array)
        }
    }

    /// Demote a bitset whose cardinality fits an array.
    pub(crate) fn from_bitset(bitset: BitsetContainer) -> Self {
        if bitset.len() as usize <= ARRAY_MAX_LEN {
            Container::Array(bitset.to_array())
        } else {
            Container::Bitset(bitset)
        }
    }

    /// Smallest encoding of a canonical interval list, Run on ties.
    pub(crate) fn from_intervals(runs: Vec<Interval>) -> Self {
        let card: u32 = runs.iter().map(|iv| iv.len()).sum();
        let run_size = run_serialized_size(runs.len());
        let array_size = card as usize * 2;
        if run_size <= array_size.min(BITSET_BYTES) {
            Container::Run(RunContainer::from_intervals(runs))
        } else if card as usize <= ARRAY_MAX_LEN {
            Container::Array(ArrayContainer::from_sorted(
                runs.iter()
                    .flat_map(|iv| iv.start..=iv.end)
                    .collect(),
            ))
        } else {
            Container::Bitset(BitsetContainer::from_intervals(&runs))
        }
    }

    /// A single interval in its smallest encoding.
    pub(crate) fn from_interval(iv: Interval) -> Self {
        Self::from_intervals(vec![iv])
    }

    pub(crate) fn kind(&self) -> Kind {
        match self {
            Container::Array(_) => Kind::Array,
            Container::Bitset(_) => Kind::Bitset,
            Container::Run(_) => Kind::Run,
        }
    }

    pub(crate) fn len(&self) -> u32 {
        match self {
            Container::Array(a) => a.len(),
            Container::Bitset(b) => b.len(),
            Container::Run(r) => r.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Container::Array(a) => a.is_empty(),
            Container::Bitset(b) => b.len() == 0,
            Container::Run(r) => r.is_empty(),
        }
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(value),
            Container::Bitset(b) => b.contains(value),
            Container::Run(r) => r.contains(value),
        }
    }

    /// Insert `value`, promoting a full array to a bitset.
    pub(crate) fn insert(&mut self, value: u16) -> bool {
        match self {
            Container::Array(a) if a.len() as usize >= ARRAY_MAX_LEN => {
                if a.contains(value) {
                    return false;
                }
                let mut bitset = BitsetContainer::from_array(a);
                bitset.insert(value);
                *self = Container::Bitset(bitset);
                true
            }
            Container::Array(a) => a.insert(value),
            Container::Bitset(b) => b.insert(value),
            Container::Run(r) => r.insert(value),
        }
    }

    /// Remove `value`, demoting a bitset that falls to the threshold.
    pub(crate) fn remove(&mut self, value: u16) -> bool {
        let removed = match self {
            Container::Array(a) => a.remove(value),
            Container::Bitset(b) => b.remove(value),
            Container::Run(r) => r.remove(value),
        };
        if removed {
            self.normalize();
        }
        removed
    }

    /// Restore the Array/Bitset threshold invariant after a mutation.
    fn normalize(&mut self) {
        match self {
            Container::Bitset(b) if b.len() as usize <= ARRAY_MAX_LEN => {
                *self = Container::Array(b.to_array());
            }
            Container::Array(a) if a.len() as usize > ARRAY_MAX_LEN => {
                *self = Container::Bitset(BitsetContainer::from_array(a));
            }
            _ => {}
        }
    }

    pub(crate) fn select(&self, rank: u32) -> Option<u16> {
        match self {
            Container::Array(a) => a.select(rank),
            Container::Bitset(b) => b.select(rank),
            Container::Run(r) => r.select(rank),
        }
    }

    pub(crate) fn rank(&self, value: u16) -> u32 {
        match self {
            Container::Array(a) => a.rank(value),
            Container::Bitset(b) => b.rank(value),
            Container::Run(r) => r.rank(value),
        }
    }

    pub(crate) fn min(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.min(),
            Container::Bitset(b) => b.min(),
            Container::Run(r) => r.min(),
        }
    }

    pub(crate) fn max(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.max(),
            Container::Bitset(b) => b.max(),
            Container::Run(r) => r.max(),
        }
    }

    pub(crate) fn iter(&self) -> ContainerIter<'_> {
        match self {
            Container::Array(a) => ContainerIter::Array(a.iter()),
            Container::Bitset(b) => ContainerIter::Bitset(b.iter()),
            Container::Run(r) => ContainerIter::Run(r.iter()),
        }
    }

    /// Portable payload size in bytes.
    pub(crate) fn serialized_size(&self) -> usize {
        match self {
            Container::Array(a) => a.serialized_size(),
            Container::Bitset(_) => BITSET_BYTES,
            Container::Run(r) => r.serialized_size(),
        }
    }

    pub(crate) fn to_intervals(&self) -> Vec<Interval> {
        match self {
            Container::Array(a) => a.to_intervals(),
            Container::Bitset(b) => b.to_intervals(),
            Container::Run(r) => r.runs().to_vec(),
        }
    }

    fn to_bitset(&self) -> BitsetContainer {
        match self {
            Container::Array(a) => BitsetContainer::from_array(a),
            Container::Bitset(b) => b.clone(),
            Container::Run(r) => BitsetContainer::from_intervals(r.runs()),
        }
    }

    /// Switch to the bitset encoding regardless of density.
    pub(crate) fn convert_to_bitset(&mut self) {
        if !matches!(self, Container::Bitset(_)) {
            *self = Container::Bitset(self.to_bitset());
        }
    }

    /// Pairwise operation producing a new container.
    pub(crate) fn op(&self, other: &Container, op: SetOp) -> Container {
        use Container::{Array, Bitset, Run};
        match (self, other) {
            (Array(a), Array(b)) => Container::from_sorted_vec(a.merge(b, op)),
            (Array(a), Bitset(b)) => array_bitset(a, b, op),
            (Array(a), Run(b)) => array_run(a, b, op),
            (Bitset(a), Array(b)) => bitset_array(a, b, op),
            (Bitset(a), Bitset(b)) => Container::from_bitset(a.combine(b, op)),
            (Bitset(a), Run(b)) => bitset_run(a, b, op),
            (Run(a), Array(b)) => {
                Container::from_intervals(combine_intervals(a.runs(), &b.to_intervals(), op))
            }
            (Run(a), Bitset(b)) => run_bitset(a, b, op),
            (Run(a), Run(b)) => Container::from_intervals(combine_intervals(a.runs(), b.runs(), op)),
        }
    }

    /// In-place pairwise operation; the receiver may change variant.
    pub(crate) fn op_assign(&mut self, other: &Container, op: SetOp) {
        let handled = match (&mut *self, other) {
            (Container::Bitset(a), Container::Bitset(b)) => {
                a.combine_assign(b, op);
                true
            }
            (Container::Bitset(a), Container::Array(b)) if op != SetOp::And => {
                for v in b.iter() {
                    match op {
                        SetOp::Or => {
                            a.insert(v);
                        }
                        SetOp::AndNot => {
                            a.remove(v);
                        }
                        _ => a.toggle(v),
                    }
                }
                true
            }
            (Container::Bitset(a), Container::Run(b)) if op != SetOp::And => {
                for &iv in b.runs() {
                    match op {
                        SetOp::Or => a.insert_range(iv),
                        SetOp::AndNot => a.remove_range(iv),
                        _ => a.flip_range(iv),
                    }
                }
                true
            }
            (Container::Array(a), rhs) if matches!(op, SetOp::And | SetOp::AndNot) => {
                let keep = op == SetOp::And;
                a.retain(|v| rhs.contains(v) == keep);
                true
            }
            _ => false,
        };
        if handled {
            self.normalize();
        } else {
            *self = self.op(other, op);
        }
    }

    /// In-place OR/XOR that may leave a bitset cardinality unknown.
    ///
    /// The result must go through [`Container::repair`] before its
    /// cardinality or variant is relied upon.
    pub(crate) fn lazy_op_assign(&mut self, other: &Container, op: SetOp) {
        debug_assert!(matches!(op, SetOp::Or | SetOp::Xor));
        match (&mut *self, other) {
            (Container::Bitset(a), Container::Bitset(b)) => a.combine_assign_lazy(b, op),
            (Container::Bitset(a), Container::Array(b)) => {
                for v in b.iter() {
                    if op == SetOp::Or {
                        a.insert(v);
                    } else {
                        a.toggle(v);
                    }
                }
            }
            (Container::Bitset(a), Container::Run(b)) => {
                for &iv in b.runs() {
                    if op == SetOp::Or {
                        a.insert_range(iv);
                    } else {
                        a.flip_range(iv);
                    }
                }
            }
            _ => *self = self.op(other, op),
        }
    }

    /// Settle a lazily combined container: recount and renormalize.
    pub(crate) fn repair(&mut self) {
        if let Container::Bitset(b) = self {
            b.repair_len();
        }
        self.normalize();
    }

    pub(crate) fn is_lazy(&self) -> bool {
        matches!(self, Container::Bitset(b) if !b.is_len_known())
    }

    /// True if the two containers share at least one value.
    pub(crate) fn intersects(&self, other: &Container) -> bool {
        use Container::{Array, Bitset, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.intersects(b),
            (Array(a), rhs) => a.iter().any(|v| rhs.contains(v)),
            (lhs, Array(b)) => b.iter().any(|v| lhs.contains(v)),
            (Bitset(a), Bitset(b)) => a.intersects(b),
            (Bitset(b), Run(r)) | (Run(r), Bitset(b)) => {
                r.runs().iter().any(|&iv| b.intersects_range(iv))
            }
            (Run(a), Run(b)) => !combine_intervals(a.runs(), b.runs(), SetOp::And).is_empty(),
        }
    }

    /// Element-wise equality, independent of encoding.
    pub(crate) fn content_eq(&self, other: &Container) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a == b,
            (Container::Bitset(a), Container::Bitset(b)) => a.words() == b.words(),
            (Container::Run(a), Container::Run(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }

    /// Convert to Run if that encoding is strictly smaller; settle an
    /// existing Run into Array/Bitset if it is not the smallest.
    ///
    /// Returns true if the variant changed.
    pub(crate) fn run_optimize(&mut self) -> bool {
        let (runs, current) = match self {
            Container::Array(a) => (a.count_runs(), a.serialized_size()),
            Container::Bitset(b) => (b.count_runs(), BITSET_BYTES),
            Container::Run(r) => {
                let settled = Container::from_intervals(r.runs().to_vec());
                let changed = settled.kind() != Kind::Run;
                *self = settled;
                return changed;
            }
        };
        if run_serialized_size(runs) < current {
            *self = Container::Run(RunContainer::from_intervals(self.to_intervals()));
            true
        } else {
            false
        }
    }

    /// Replace a Run with the Array or Bitset dictated by the threshold.
    ///
    /// Returns true if the variant changed.
    pub(crate) fn remove_run_compression(&mut self) -> bool {
        let Container::Run(r) = self else {
            return false;
        };
        *self = if r.len() as usize <= ARRAY_MAX_LEN {
            Container::Array(ArrayContainer::from_sorted(r.iter().collect()))
        } else {
            Container::Bitset(BitsetContainer::from_intervals(r.runs()))
        };
        true
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        match self {
            Container::Array(a) => a.shrink_to_fit(),
            Container::Bitset(_) => {}
            Container::Run(r) => r.shrink_to_fit(),
        }
    }
}

fn array_bitset(a: &ArrayContainer, b: &BitsetContainer, op: SetOp) -> Container {
    match op {
        SetOp::And => Container::Array(a.filter(|v| b.contains(v))),
        SetOp::AndNot => Container::Array(a.filter(|v| !b.contains(v))),
        SetOp::Or => {
            let mut out = b.clone();
            for v in a.iter() {
                out.insert(v);
            }
            Container::from_bitset(out)
        }
        SetOp::Xor => {
            let mut out = b.clone();
            for v in a.iter() {
                out.toggle(v);
            }
            Container::from_bitset(out)
        }
    }
}

fn bitset_array(a: &BitsetContainer, b: &ArrayContainer, op: SetOp) -> Container {
    match op {
        SetOp::AndNot => {
            let mut out = a.clone();
            for v in b.iter() {
                out.remove(v);
            }
            Container::from_bitset(out)
        }
        _ => array_bitset(b, a, op),
    }
}

fn array_run(a: &ArrayContainer, b: &RunContainer, op: SetOp) -> Container {
    match op {
        SetOp::And => Container::Array(a.filter(|v| b.contains(v))),
        SetOp::AndNot => Container::Array(a.filter(|v| !b.contains(v))),
        SetOp::Or if b.is_full() => Container::Run(RunContainer::full()),
        SetOp::Or | SetOp::Xor => {
            Container::from_intervals(combine_intervals(&a.to_intervals(), b.runs(), op))
        }
    }
}

fn bitset_run(a: &BitsetContainer, b: &RunContainer, op: SetOp) -> Container {
    match op {
        SetOp::Or if b.is_full() => Container::Run(RunContainer::full()),
        SetOp::And => {
            Container::from_bitset(a.combine(&BitsetContainer::from_intervals(b.runs()), op))
        }
        _ => {
            let mut out = a.clone();
            for &iv in b.runs() {
                match op {
                    SetOp::Or => out.insert_range(iv),
                    SetOp::AndNot => out.remove_range(iv),
                    _ => out.flip_range(iv),
                }
            }
            Container::from_bitset(out)
        }
    }
}

fn run_bitset(a: &RunContainer, b: &BitsetContainer, op: SetOp) -> Container {
    match op {
        SetOp::AndNot => {
            Container::from_bitset(BitsetContainer::from_intervals(a.runs()).combine(b, op))
        }
        _ => bitset_run(b, a, op),
    }
}

/// Ascending iterator over the values of any container variant.
#[derive(Clone)]
pub(crate) enum ContainerIter<'a> {
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    Bitset(BitsetIter<'a>),
    Run(RunIter<'a>),
}

impl Iterator for ContainerIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next(),
            ContainerIter::Bitset(it) => it.next(),
            ContainerIter::Run(it) => it.next(),
        }
    }
}
