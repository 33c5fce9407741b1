//! # Compressed Bitmaps
//!
//! *Sets of `u32` values that stay small and stay fast.*
//!
//! ## Intuition First
//!
//! Picture the 32-bit universe as 65536 shelves of 65536 slots each. Most
//! shelves are empty, some hold a handful of items, a few are nearly full,
//! and some hold long unbroken rows. Each kind of shelf deserves a different
//! inventory: a short list of positions, a checkbox per slot, or a list of
//! "from here to there" rows.
//!
//! A [`Bitmap`] keeps one such inventory per non-empty shelf and switches
//! between them as values come and go.
//!
//! ## The Problem
//!
//! - **Plain bitsets**: 512 MiB for the full universe no matter how few values.
//! - **Sorted arrays**: 4 bytes per value and linear merges for set algebra.
//!
//! Neither adapts to data that is sparse in one region and dense in another.
//!
//! ## Historical Context
//!
//! ```text
//! 1997  Wu et al.   Word-aligned hybrid compression for bitmap indexes
//! 2010  Lemire      Run-length compressed bitmaps sorted for locality
//! 2014  Chambi      Roaring: partition by high bits, array or bitset per chunk
//! 2016  Lemire      Run containers and a portable serialization format
//! ```
//!
//! ## Representation
//!
//! A value `v` splits into a chunk key `v >> 16` and a low half `v & 0xFFFF`.
//! Each chunk is stored as one of:
//!
//! - **Array**: sorted `u16` list, at most [`ARRAY_MAX_LEN`] values.
//! - **Bitset**: [`BITSET_WORDS`] 64-bit words.
//! - **Run**: sorted, disjoint, non-adjacent `[start, end]` intervals.
//!
//! Queries never depend on which encoding a chunk currently uses.
//!
//! ## Complexity Analysis
//!
//! - **Membership**: binary search over chunk keys, then O(1) for bitsets
//!   or O(log n) for arrays and runs.
//! - **Set algebra**: linear in the number of chunks, with word-wise loops
//!   for bitset pairs and a boundary sweep for run pairs.
//! - **Space**: at most 2 bytes per value plus a few bytes per chunk;
//!   long runs cost 4 bytes each regardless of length.
//!
//! ## What Could Go Wrong
//!
//! 1. **Lazy results**: a [`LazyBitmap`] skips recounting dense chunks. It
//!    has no queries; [`LazyBitmap::repair`] turns it back into a `Bitmap`.
//! 2. **Run churn**: single-value edits keep a Run container as a Run.
//!    Call [`Bitmap::run_optimize`] after bulk edits to re-pick encodings.
//!
//! ## References
//!
//! - Chambi, S., et al. (2016). "Better bitmap performance with Roaring bitmaps."
//! - Lemire, D., et al. (2018). "Roaring Bitmaps: Implementation of an Optimized
//!   Software Library."

#![warn(missing_docs)]
#![warn(clippy::all)]

mod array;
mod bitset;
mod container;
mod run;

pub mod bitmap;
pub mod codec;
pub mod error;
pub mod iter;
pub mod ops;
pub mod optimize;
pub mod stats;
pub mod tracked;

pub use bitmap::{Bitmap, UNIVERSE_SIZE};
pub use bitset::BITSET_WORDS;
pub use codec::Format;
pub use container::ARRAY_MAX_LEN;
pub use error::{Error, Result};
pub use iter::Iter;
pub use ops::LazyBitmap;
pub use stats::Statistics;
pub use tracked::TrackedBitmap;
