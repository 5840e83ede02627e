//! Bounds-checked access to raw container bytes.

#![deny(clippy::arithmetic_side_effects)]

use meta_types::{Scalar, ScalarLE};

/// A reference to the raw bytes of a container file.
///
/// Containers address their structures with unsigned 64-bit offsets, so
/// the accessors here take `u64` and resolve it against the slice on
/// every access. Reads are total: anything out of range yields `None`,
/// and multi-byte values are always assembled from explicit byte arrays,
/// never reinterpreted in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetaData<'a> {
    bytes: &'a [u8],
}

impl<'a> MetaData<'a> {
    /// Empty data, useful for some tests and examples
    pub const EMPTY: MetaData<'static> = MetaData { bytes: &[] };

    pub const fn new(bytes: &'a [u8]) -> Self {
        MetaData { bytes }
    }

    /// The length of the data, in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The bytes at `[offset, offset + len)`, when the range is fully in
    /// bounds.
    pub fn subrange(&self, offset: u64, len: u64) -> Option<&'a [u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.bytes.get(start..end)
    }

    /// Read a big-endian scalar at `offset`.
    pub fn read_be_at<T: Scalar>(&self, offset: u64) -> Option<T> {
        let offset = usize::try_from(offset).ok()?;
        self.bytes.get(offset..).and_then(T::read)
    }

    /// Read a little-endian scalar at `offset`.
    pub fn read_le_at<T: ScalarLE>(&self, offset: u64) -> Option<T> {
        let offset = usize::try_from(offset).ok()?;
        self.bytes.get(offset..).and_then(T::read_le)
    }

    /// A cursor over `[offset, end)` for sequential record reads.
    ///
    /// The cursor refuses to read past `end` even when the underlying
    /// data continues, so a record sequence inside a box or segment
    /// cannot leak into its neighbors.
    pub fn cursor(&self, offset: u64, end: u64) -> Cursor<'a> {
        Cursor {
            data: *self,
            pos: offset,
            end: end.min(self.len()),
        }
    }

    /// Return the data as a byte slice
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// A bounded cursor for parsing sequential records.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: MetaData<'a>,
    pos: u64,
    end: u64,
}

impl<'a> Cursor<'a> {
    /// The current position, as an offset into the underlying data.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left before the end bound.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// Advance without reading (reserved or uninteresting fields).
    pub fn skip(&mut self, n_bytes: u64) {
        self.pos = self.pos.saturating_add(n_bytes);
    }

    /// Read a big-endian scalar and advance.
    pub fn read_be<T: Scalar>(&mut self) -> Option<T> {
        let next = self.pos.checked_add(T::RAW_BYTE_LEN as u64)?;
        if next > self.end {
            return None;
        }
        let value = self.data.read_be_at(self.pos)?;
        self.pos = next;
        Some(value)
    }

    /// Read a little-endian scalar and advance.
    pub fn read_le<T: ScalarLE>(&mut self) -> Option<T> {
        let next = self.pos.checked_add(T::RAW_BYTE_LEN as u64)?;
        if next > self.end {
            return None;
        }
        let value = self.data.read_le_at(self.pos)?;
        self.pos = next;
        Some(value)
    }
}

impl AsRef<[u8]> for MetaData<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for MetaData<'a> {
    fn from(src: &'a [u8]) -> MetaData<'a> {
        MetaData::new(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_endian_reads() {
        let data = MetaData::new(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(data.read_be_at::<u16>(0), Some(0x1234));
        assert_eq!(data.read_le_at::<u16>(0), Some(0x3412));
        assert_eq!(data.read_be_at::<u32>(0), Some(0x12345678));
        assert_eq!(data.read_be_at::<u32>(1), None);
        assert_eq!(data.read_be_at::<u8>(u64::MAX), None);
    }

    #[test]
    fn subrange_is_total() {
        let data = MetaData::new(b"abcdef");
        assert_eq!(data.subrange(2, 3), Some(&b"cde"[..]));
        assert_eq!(data.subrange(6, 0), Some(&b""[..]));
        assert_eq!(data.subrange(4, 3), None);
        assert_eq!(data.subrange(u64::MAX, 1), None);
    }

    #[test]
    fn cursor_stops_at_its_bound() {
        // six bytes of data, but the record region ends after four
        let data = MetaData::new(&[1, 2, 3, 4, 5, 6]);
        let mut cursor = data.cursor(0, 4);
        assert_eq!(cursor.read_be::<u16>(), Some(0x0102));
        assert_eq!(cursor.read_be::<u32>(), None); // would cross the bound
        assert_eq!(cursor.read_be::<u16>(), Some(0x0304));
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_be::<u8>(), None);
    }

    #[test]
    fn cursor_bound_clamps_to_data() {
        let data = MetaData::new(&[1, 2]);
        let mut cursor = data.cursor(0, 100);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.read_be::<u16>(), Some(0x0102));
        assert_eq!(cursor.read_be::<u8>(), None);
    }

    #[test]
    fn skip_past_end_fails_cleanly() {
        let data = MetaData::new(&[1, 2, 3, 4]);
        let mut cursor = data.cursor(0, 4);
        cursor.skip(u64::MAX);
        assert_eq!(cursor.read_be::<u8>(), None);
        assert_eq!(cursor.remaining(), 0);
    }
}
