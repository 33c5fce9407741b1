//! Run-length optimization pass and its inverse.

use tracing::debug;

use crate::bitmap::Bitmap;
use crate::container::Kind;

impl Bitmap {
    /// Re-encode containers as runs where that is strictly smaller.
    ///
    /// Array and Bitset containers are never converted into each other here;
    /// a Run that is no longer the smallest encoding is settled back into the
    /// smaller of the two. Returns true if any Run container remains.
    pub fn run_optimize(&mut self) -> bool {
        let converted = self
            .chunks
            .iter_mut()
            .map(|c| c.container.run_optimize())
            .filter(|&changed| changed)
            .count();
        let runs = self
            .chunks
            .iter()
            .filter(|c| c.container.kind() == Kind::Run)
            .count();
        debug!(
            containers = self.chunks.len(),
            converted, runs, "run optimization"
        );
        runs > 0
    }

    /// Convert every Run container back to Array or Bitset by density.
    ///
    /// Returns true if any container changed.
    pub fn remove_run_compression(&mut self) -> bool {
        let converted = self
            .chunks
            .iter_mut()
            .map(|c| c.container.remove_run_compression())
            .filter(|&changed| changed)
            .count();
        debug!(converted, "removed run compression");
        converted > 0
    }

    /// Release spare capacity held by containers.
    pub fn shrink_to_fit(&mut self) {
        self.chunks.shrink_to_fit();
        for chunk in &mut self.chunks {
            chunk.container.shrink_to_fit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_then_decompress_keeps_content() {
        let mut b = Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000]);
        b.insert_range(100_000..180_000).unwrap();
        for v in (300_000..400_000).step_by(2) {
            b.insert(v);
        }
        let original = b.clone();

        b.run_optimize();
        assert_eq!(b, original);
        let stats = b.statistics();
        assert_eq!(stats.bitset_containers, 2);

        let snapshot = b.clone();
        b.run_optimize();
        assert_eq!(b.statistics(), snapshot.statistics());

        b.remove_run_compression();
        assert_eq!(b, original);
        assert_eq!(b.statistics().run_containers, 0);
        assert!(!b.remove_run_compression());
    }

    #[test]
    fn dense_bitset_becomes_run() {
        let mut b: Bitmap = (0..10_000u32).collect();
        assert_eq!(b.statistics().bitset_containers, 1);
        assert!(b.run_optimize());
        let stats = b.statistics();
        assert_eq!(stats.run_containers, 1);
        assert_eq!(stats.bitset_containers, 0);
        assert_eq!(b.len(), 10_000);
    }

    #[test]
    fn sparse_arrays_stay_arrays() {
        let mut b = Bitmap::from_values(&[1, 10, 20, 1 << 20]);
        assert!(!b.run_optimize());
        assert_eq!(b.statistics().array_containers, 2);
    }
}
