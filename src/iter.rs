//! Ascending iteration over a [`Bitmap`].

use std::iter::FusedIterator;

use crate::bitmap::{join, Bitmap, Chunk};
use crate::container::ContainerIter;

/// Lazy ascending iterator over the values of a [`Bitmap`].
///
/// Created by [`Bitmap::iter`]. Restart by calling `iter()` again, or clone
/// the iterator to resume from the same position twice.
#[derive(Clone)]
pub struct Iter<'a> {
    chunks: std::slice::Iter<'a, Chunk>,
    current: Option<(u16, ContainerIter<'a>)>,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some((key, values)) = &mut self.current {
                if let Some(low) = values.next() {
                    return Some(join(*key, low));
                }
            }
            let chunk = self.chunks.next()?;
            self.current = Some((chunk.key, chunk.container.iter()));
        }
    }
}

impl FusedIterator for Iter<'_> {}

impl Bitmap {
    /// Iterate over the values in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            chunks: self.chunks.iter(),
            current: None,
        }
    }
}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_across_encodings_in_order() {
        let mut b = Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000]);
        b.insert_range(70_000..70_010).unwrap();
        b.insert_range(200_000..210_000).unwrap();
        b.insert(u32::MAX);
        let values: Vec<u32> = b.iter().collect();
        assert_eq!(values.len() as u64, b.len());
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(&values[..7], &[1, 2, 3, 4, 5, 100, 1000]);
        assert_eq!(values.last(), Some(&u32::MAX));

        let mut it = b.iter();
        it.nth(6);
        let resumed = it.clone();
        assert_eq!(it.next(), Some(70_000));
        assert_eq!(resumed.count() as u64, b.len() - 7);
    }

    #[test]
    fn empty_bitmap_yields_nothing() {
        let b = Bitmap::new();
        assert_eq!(b.iter().next(), None);
        assert_eq!((&b).into_iter().count(), 0);
    }
}
