//! Per-encoding breakdown of a [`Bitmap`].

use crate::bitmap::{join, Bitmap};
use crate::container::Container;

/// Container counts, value counts and payload bytes per encoding.
///
/// Byte counts are portable-encoding payload sizes and exclude headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of containers.
    pub containers: usize,
    /// Containers stored as sorted arrays.
    pub array_containers: usize,
    /// Containers stored as runs.
    pub run_containers: usize,
    /// Containers stored as bitsets.
    pub bitset_containers: usize,
    /// Values held in array containers.
    pub values_in_arrays: u64,
    /// Values held in run containers.
    pub values_in_runs: u64,
    /// Values held in bitset containers.
    pub values_in_bitsets: u64,
    /// Payload bytes of array containers.
    pub bytes_in_arrays: usize,
    /// Payload bytes of run containers.
    pub bytes_in_runs: usize,
    /// Payload bytes of bitset containers.
    pub bytes_in_bitsets: usize,
    /// Smallest value, `None` when empty.
    pub min_value: Option<u32>,
    /// Largest value, `None` when empty.
    pub max_value: Option<u32>,
    /// Sum of all values.
    pub sum_value: u64,
    /// Total number of values.
    pub cardinality: u64,
}

impl Bitmap {
    /// Summarize the containers of this bitmap.
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            containers: self.chunks.len(),
            min_value: self.min(),
            max_value: self.max(),
            ..Statistics::default()
        };
        for chunk in &self.chunks {
            let values = u64::from(chunk.container.len());
            let bytes = chunk.container.serialized_size();
            match &chunk.container {
                Container::Array(_) => {
                    stats.array_containers += 1;
                    stats.values_in_arrays += values;
                    stats.bytes_in_arrays += bytes;
                }
                Container::Run(_) => {
                    stats.run_containers += 1;
                    stats.values_in_runs += values;
                    stats.bytes_in_runs += bytes;
                }
                Container::Bitset(_) => {
                    stats.bitset_containers += 1;
                    stats.values_in_bitsets += values;
                    stats.bytes_in_bitsets += bytes;
                }
            }
            stats.cardinality += values;
            stats.sum_value = stats.sum_value.wrapping_add(container_sum(chunk.key, &chunk.container));
        }
        stats
    }
}

/// Sum of a container's values, using closed forms for runs.
fn container_sum(key: u16, container: &Container) -> u64 {
    match container {
        Container::Run(r) => r
            .runs()
            .iter()
            .map(|iv| {
                let (lo, hi) = (u64::from(join(key, iv.start)), u64::from(join(key, iv.end)));
                (lo + hi) * (hi - lo + 1) / 2
            })
            .sum(),
        _ => container.iter().map(|low| u64::from(join(key, low))).sum(),
    }
}
