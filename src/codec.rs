//! Binary encodings of a [`Bitmap`].
//!
//! # Portable format
//!
//! Little-endian and readable by other Roaring implementations:
//!
//! ```text
//! without runs: cookie 12346 (u32) | count n (u32)
//! with runs:    12347 | (n - 1) << 16 (u32) | run flags, ceil(n / 8) bytes
//! then:         n x (key u16, cardinality - 1 u16)
//!               n x payload offset u32   (omitted when runs exist and n < 4)
//!               payloads
//! ```
//!
//! Payloads are `card` x `u16` for arrays, 1024 x `u64` for bitsets and a
//! `u16` run count followed by `(start, length - 1)` pairs for runs. Offsets
//! are measured from the first byte of the portable encoding. A container
//! without its run flag decodes as an array when its cardinality is at most
//! [`ARRAY_MAX_LEN`](crate::ARRAY_MAX_LEN) and as a bitset otherwise.
//!
//! # Native format
//!
//! One tag byte followed by whichever body is smaller:
//!
//! - `1`: value count (`u32`), then every value as `u32`
//! - `2`: the portable encoding
//!
//! # Example
//!
//! ```
//! use rbits::{Bitmap, Format};
//!
//! let bitmap = Bitmap::from_values(&[1, 2, 3, 4, 5, 100, 1000]);
//! let bytes = bitmap.serialize(Format::Portable);
//! assert_eq!(bytes.len(), bitmap.serialized_size(Format::Portable));
//! assert_eq!(Bitmap::deserialize(&bytes, Format::Portable)?, bitmap);
//! # Ok::<(), rbits::Error>(())
//! ```

use std::io::Write;

use tracing::debug;

use crate::array::ArrayContainer;
use crate::bitmap::{Bitmap, Chunk};
use crate::bitset::{BitsetContainer, BITSET_WORDS};
use crate::container::{Container, ARRAY_MAX_LEN};
use crate::error::{Error, Result};
use crate::run::{Interval, RunContainer};

/// Portable cookie when at least one run container is present.
pub const SERIAL_COOKIE: u32 = 12347;

/// Portable cookie when no run container is present.
pub const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;

/// Below this many containers a run-flagged encoding carries no offsets.
pub const NO_OFFSET_THRESHOLD: usize = 4;

const NATIVE_VALUES: u8 = 1;
const NATIVE_PORTABLE: u8 = 2;

/// Selects the encoding used by [`Bitmap::serialize`] and [`Bitmap::deserialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Cross-implementation Roaring format.
    #[default]
    Portable,
    /// Tagged format that falls back to a plain value list when smaller.
    Native,
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidEncoding(reason.into())
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| invalid("unexpected end of input"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(invalid(format!(
                "{} trailing bytes after bitmap",
                self.remaining()
            )));
        }
        Ok(())
    }
}

impl Bitmap {
    fn has_run_containers(&self) -> bool {
        self.chunks
            .iter()
            .any(|c| matches!(c.container, Container::Run(_)))
    }

    /// Bytes before the first payload in the portable encoding.
    fn portable_header_size(&self) -> usize {
        let n = self.chunks.len();
        if self.has_run_containers() {
            let offsets = if n >= NO_OFFSET_THRESHOLD { 4 * n } else { 0 };
            4 + n.div_ceil(8) + 4 * n + offsets
        } else {
            8 + 8 * n
        }
    }

    /// Exact length of the portable encoding.
    pub fn portable_size_in_bytes(&self) -> usize {
        self.portable_header_size()
            + self
                .chunks
                .iter()
                .map(|c| c.container.serialized_size())
                .sum::<usize>()
    }

    /// Exact length of the native encoding.
    pub fn size_in_bytes(&self) -> usize {
        1 + self.native_values_size().min(self.portable_size_in_bytes())
    }

    fn native_values_size(&self) -> usize {
        usize::try_from(4 + 4 * self.len()).unwrap_or(usize::MAX)
    }

    /// Exact number of bytes [`Bitmap::serialize`] produces for `format`.
    pub fn serialized_size(&self, format: Format) -> usize {
        match format {
            Format::Portable => self.portable_size_in_bytes(),
            Format::Native => self.size_in_bytes(),
        }
    }

    /// Encode the bitmap in `format`.
    pub fn serialize(&self, format: Format) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size(format));
        match format {
            Format::Portable => self.encode_portable(&mut out),
            Format::Native => {
                if self.native_values_size() <= self.portable_size_in_bytes() {
                    out.push(NATIVE_VALUES);
                    out.extend_from_slice(&(self.len() as u32).to_le_bytes());
                    for value in self.iter() {
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                } else {
                    out.push(NATIVE_PORTABLE);
                    self.encode_portable(&mut out);
                }
            }
        }
        out
    }

    /// Encode the bitmap in `format` into `writer`, returning the bytes written.
    pub fn serialize_into<W: Write>(&self, format: Format, mut writer: W) -> Result<usize> {
        let bytes = self.serialize(format);
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    fn encode_portable(&self, out: &mut Vec<u8>) {
        let start = out.len();
        let n = self.chunks.len();
        let has_runs = self.has_run_containers();

        if has_runs {
            let cookie = SERIAL_COOKIE | ((n as u32 - 1) << 16);
            out.extend_from_slice(&cookie.to_le_bytes());
            let mut flags = vec![0u8; n.div_ceil(8)];
            for (i, chunk) in self.chunks.iter().enumerate() {
                if matches!(chunk.container, Container::Run(_)) {
                    flags[i / 8] |= 1 << (i % 8);
                }
            }
            out.extend_from_slice(&flags);
        } else {
            out.extend_from_slice(&SERIAL_COOKIE_NO_RUNCONTAINER.to_le_bytes());
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }

        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.key.to_le_bytes());
            out.extend_from_slice(&((chunk.container.len() - 1) as u16).to_le_bytes());
        }

        if !has_runs || n >= NO_OFFSET_THRESHOLD {
            let mut offset = self.portable_header_size();
            for chunk in &self.chunks {
                out.extend_from_slice(&(offset as u32).to_le_bytes());
                offset += chunk.container.serialized_size();
            }
        }
        debug_assert_eq!(out.len() - start, self.portable_header_size());

        for chunk in &self.chunks {
            match &chunk.container {
                Container::Array(a) => {
                    for &v in a.as_slice() {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
                Container::Bitset(b) => {
                    for &w in b.words().iter() {
                        out.extend_from_slice(&w.to_le_bytes());
                    }
                }
                Container::Run(r) => {
                    out.extend_from_slice(&(r.num_runs() as u16).to_le_bytes());
                    for iv in r.runs() {
                        out.extend_from_slice(&iv.start.to_le_bytes());
                        out.extend_from_slice(&(iv.end - iv.start).to_le_bytes());
                    }
                }
            }
        }
    }

    /// Decode a bitmap previously written in `format`.
    ///
    /// Malformed input is rejected with [`Error::InvalidEncoding`]; no
    /// partially decoded bitmap is ever returned.
    pub fn deserialize(bytes: &[u8], format: Format) -> Result<Self> {
        let decoded = match format {
            Format::Portable => decode_portable(bytes),
            Format::Native => decode_native(bytes),
        };
        decoded.inspect_err(|e| debug!(error = %e, ?format, len = bytes.len(), "rejected bitmap buffer"))
    }
}

fn decode_native(bytes: &[u8]) -> Result<Bitmap> {
    let mut r = Reader::new(bytes);
    match r.u8()? {
        NATIVE_VALUES => {
            let count = r.u32()? as usize;
            if count.checked_mul(4) != Some(r.remaining()) {
                return Err(invalid(format!(
                    "value list of {count} entries does not match {} payload bytes",
                    r.remaining()
                )));
            }
            let mut bitmap = Bitmap::new();
            let mut last: Option<u32> = None;
            for _ in 0..count {
                let value = r.u32()?;
                if last.is_some_and(|prev| value <= prev) {
                    return Err(invalid("native values are not strictly increasing"));
                }
                last = Some(value);
                bitmap.push_ascending(value);
            }
            Ok(bitmap)
        }
        NATIVE_PORTABLE => decode_portable(&bytes[1..]),
        tag => Err(invalid(format!("unknown native tag {tag}"))),
    }
}

fn decode_portable(bytes: &[u8]) -> Result<Bitmap> {
    let mut r = Reader::new(bytes);
    let cookie = r.u32()?;
    let (n, run_flags) = if cookie & 0xFFFF == SERIAL_COOKIE {
        let n = (cookie >> 16) as usize + 1;
        (n, Some(r.take(n.div_ceil(8))?))
    } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        let n = r.u32()? as usize;
        if n > 1 << 16 {
            return Err(invalid(format!("{n} containers exceed the key space")));
        }
        (n, None)
    } else {
        return Err(invalid(format!("unknown cookie {cookie:#x}")));
    };

    let mut headers: Vec<(u16, u32)> = Vec::with_capacity(n);
    for _ in 0..n {
        let key = r.u16()?;
        let card = u32::from(r.u16()?) + 1;
        if let Some(&(prev, _)) = headers.last() {
            if key <= prev {
                return Err(invalid(format!("container key {key} does not follow {prev}")));
            }
        }
        headers.push((key, card));
    }

    let offsets = if run_flags.is_none() || n >= NO_OFFSET_THRESHOLD {
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            offsets.push(r.u32()? as usize);
        }
        Some(offsets)
    } else {
        None
    };

    let mut chunks = Vec::with_capacity(n);
    for (i, &(key, card)) in headers.iter().enumerate() {
        if let Some(offsets) = &offsets {
            if offsets[i] != r.pos {
                return Err(invalid(format!(
                    "container {i} offset {} disagrees with position {}",
                    offsets[i], r.pos
                )));
            }
        }
        let is_run = run_flags.is_some_and(|flags| flags[i / 8] >> (i % 8) & 1 == 1);
        let container = if is_run {
            read_run(&mut r, card)?
        } else if card as usize <= ARRAY_MAX_LEN {
            read_array(&mut r, card)?
        } else {
            read_bitset(&mut r, card)?
        };
        chunks.push(Chunk::new(key, container));
    }
    r.finish()?;
    Ok(Bitmap { chunks })
}

fn read_array(r: &mut Reader<'_>, card: u32) -> Result<Container> {
    let mut values: Vec<u16> = Vec::with_capacity(card as usize);
    for _ in 0..card {
        let v = r.u16()?;
        if values.last().is_some_and(|&last| v <= last) {
            return Err(invalid("array values are not strictly increasing"));
        }
        values.push(v);
    }
    Ok(Container::Array(ArrayContainer::from_sorted(values)))
}

fn read_bitset(r: &mut Reader<'_>, card: u32) -> Result<Container> {
    let mut words = Box::new([0u64; BITSET_WORDS]);
    for w in words.iter_mut() {
        *w = r.u64()?;
    }
    let bitset = BitsetContainer::from_words(words);
    if bitset.len() != card {
        return Err(invalid(format!(
            "bitset holds {} values, header declares {card}",
            bitset.len()
        )));
    }
    Ok(Container::Bitset(bitset))
}

fn read_run(r: &mut Reader<'_>, card: u32) -> Result<Container> {
    let count = r.u16()?;
    if count == 0 {
        return Err(invalid("run container without runs"));
    }
    let mut runs: Vec<Interval> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = r.u16()?;
        let end = u32::from(start) + u32::from(r.u16()?);
        let end = u16::try_from(end).map_err(|_| invalid("run extends past the chunk"))?;
        match runs.last_mut() {
            Some(last) if start <= last.end => {
                return Err(invalid("runs are unsorted or overlapping"));
            }
            Some(last) if u32::from(start) == u32::from(last.end) + 1 => last.end = end,
            _ => runs.push(Interval::new(start, end)),
        }
    }
    let total: u32 = runs.iter().map(|iv| iv.len()).sum();
    if total != card {
        return Err(invalid(format!(
            "runs hold {total} values, header declares {card}"
        )));
    }
    Ok(Container::Run(RunContainer::from_intervals(runs)))
}
