//! Metadata value descriptors.

use bytemuck::{AnyBitPattern, NoUninit};
use meta_types::{ByteArena, ByteSpan, SRational, URational};

/// Element type of a scalar or array value.
///
/// `F32`/`F64` carry raw bit patterns; rationals are numerator/denominator
/// pairs as stored in TIFF.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MetaElementType {
    #[default]
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    URational,
    SRational,
}

impl MetaElementType {
    /// The in-memory element size in bytes.
    pub const fn size(self) -> u32 {
        match self {
            MetaElementType::U8 | MetaElementType::I8 => 1,
            MetaElementType::U16 | MetaElementType::I16 => 2,
            MetaElementType::U32 | MetaElementType::I32 | MetaElementType::F32 => 4,
            MetaElementType::U64 | MetaElementType::I64 | MetaElementType::F64 => 8,
            MetaElementType::URational | MetaElementType::SRational => 8,
        }
    }

    /// Natural alignment for array storage; rationals align to their u32
    /// halves.
    pub const fn alignment(self) -> u32 {
        match self {
            MetaElementType::URational | MetaElementType::SRational => 4,
            other => other.size(),
        }
    }
}

/// Text encoding as declared by the container; bytes are stored raw and
/// never re-encoded on ingestion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TextEncoding {
    #[default]
    Unknown,
    Ascii,
    Utf8,
    Utf16LE,
    Utf16BE,
}

/// A metadata value.
///
/// Payload-carrying variants reference spans of the arena the value was
/// created against. `Scalar` packs the element's raw bit pattern into
/// `bits` (sign-extended for signed integers, numerator in the low half
/// for rationals).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaValue {
    #[default]
    Empty,
    Scalar {
        elem_type: MetaElementType,
        bits: u64,
    },
    Array {
        elem_type: MetaElementType,
        count: u32,
        span: ByteSpan,
    },
    Bytes {
        span: ByteSpan,
        count: u32,
    },
    Text {
        span: ByteSpan,
        count: u32,
        encoding: TextEncoding,
    },
}

fn scalar(elem_type: MetaElementType, bits: u64) -> MetaValue {
    MetaValue::Scalar { elem_type, bits }
}

impl MetaValue {
    pub fn u8(value: u8) -> MetaValue {
        scalar(MetaElementType::U8, value as u64)
    }

    pub fn i8(value: i8) -> MetaValue {
        scalar(MetaElementType::I8, value as i64 as u64)
    }

    pub fn u16(value: u16) -> MetaValue {
        scalar(MetaElementType::U16, value as u64)
    }

    pub fn i16(value: i16) -> MetaValue {
        scalar(MetaElementType::I16, value as i64 as u64)
    }

    pub fn u32(value: u32) -> MetaValue {
        scalar(MetaElementType::U32, value as u64)
    }

    pub fn i32(value: i32) -> MetaValue {
        scalar(MetaElementType::I32, value as i64 as u64)
    }

    pub fn u64(value: u64) -> MetaValue {
        scalar(MetaElementType::U64, value)
    }

    pub fn i64(value: i64) -> MetaValue {
        scalar(MetaElementType::I64, value as u64)
    }

    pub fn f32_bits(bits: u32) -> MetaValue {
        scalar(MetaElementType::F32, bits as u64)
    }

    pub fn f64_bits(bits: u64) -> MetaValue {
        scalar(MetaElementType::F64, bits)
    }

    pub fn urational(numer: u32, denom: u32) -> MetaValue {
        scalar(
            MetaElementType::URational,
            numer as u64 | ((denom as u64) << 32),
        )
    }

    pub fn srational(numer: i32, denom: i32) -> MetaValue {
        scalar(
            MetaElementType::SRational,
            (numer as u32) as u64 | (((denom as u32) as u64) << 32),
        )
    }

    /// An opaque byte payload, copied into `arena`.
    pub fn bytes(arena: &mut ByteArena, data: &[u8]) -> MetaValue {
        MetaValue::Bytes {
            span: arena.append(data),
            count: data.len() as u32,
        }
    }

    /// Text copied into `arena` verbatim; the encoding is recorded, not
    /// validated.
    pub fn text(arena: &mut ByteArena, text: &str, encoding: TextEncoding) -> MetaValue {
        Self::text_bytes(arena, text.as_bytes(), encoding)
    }

    /// Like [`text`](Self::text), from raw bytes that may not be UTF-8.
    pub fn text_bytes(arena: &mut ByteArena, data: &[u8], encoding: TextEncoding) -> MetaValue {
        MetaValue::Text {
            span: arena.append(data),
            count: data.len() as u32,
            encoding,
        }
    }

    /// An array from raw native-endian element bytes (already decoded).
    ///
    /// `count` is derived from the byte length; the bytes are stored at
    /// the element type's natural alignment so typed reads stay aligned.
    pub fn array(arena: &mut ByteArena, elem_type: MetaElementType, raw: &[u8]) -> MetaValue {
        let span = arena.allocate(raw.len() as u32, elem_type.alignment());
        arena.span_mut(span).copy_from_slice(raw);
        MetaValue::Array {
            elem_type,
            count: raw.len() as u32 / elem_type.size(),
            span,
        }
    }

    fn array_copy<T: NoUninit>(
        arena: &mut ByteArena,
        elem_type: MetaElementType,
        values: &[T],
    ) -> MetaValue {
        let raw: &[u8] = bytemuck::cast_slice(values);
        let span = arena.allocate(raw.len() as u32, elem_type.alignment());
        arena.span_mut(span).copy_from_slice(raw);
        MetaValue::Array {
            elem_type,
            count: values.len() as u32,
            span,
        }
    }

    pub fn u8_array(arena: &mut ByteArena, values: &[u8]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::U8, values)
    }

    pub fn i8_array(arena: &mut ByteArena, values: &[i8]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::I8, values)
    }

    pub fn u16_array(arena: &mut ByteArena, values: &[u16]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::U16, values)
    }

    pub fn i16_array(arena: &mut ByteArena, values: &[i16]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::I16, values)
    }

    pub fn u32_array(arena: &mut ByteArena, values: &[u32]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::U32, values)
    }

    pub fn i32_array(arena: &mut ByteArena, values: &[i32]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::I32, values)
    }

    pub fn u64_array(arena: &mut ByteArena, values: &[u64]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::U64, values)
    }

    pub fn i64_array(arena: &mut ByteArena, values: &[i64]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::I64, values)
    }

    pub fn f32_bits_array(arena: &mut ByteArena, bits: &[u32]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::F32, bits)
    }

    pub fn f64_bits_array(arena: &mut ByteArena, bits: &[u64]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::F64, bits)
    }

    pub fn urational_array(arena: &mut ByteArena, values: &[URational]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::URational, values)
    }

    pub fn srational_array(arena: &mut ByteArena, values: &[SRational]) -> MetaValue {
        Self::array_copy(arena, MetaElementType::SRational, values)
    }

    /// The element count: 1 for scalars, the element or byte count for
    /// payload variants, 0 for `Empty`.
    pub fn count(&self) -> u32 {
        match self {
            MetaValue::Empty => 0,
            MetaValue::Scalar { .. } => 1,
            MetaValue::Array { count, .. }
            | MetaValue::Bytes { count, .. }
            | MetaValue::Text { count, .. } => *count,
        }
    }

    /// The scalar bit pattern as an unsigned integer, if this is an
    /// integer-typed scalar.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetaValue::Scalar { elem_type, bits } => match elem_type {
                MetaElementType::U8
                | MetaElementType::U16
                | MetaElementType::U32
                | MetaElementType::U64 => Some(*bits),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().map(|v| v as u32)
    }

    /// The scalar value as a signed integer, if this is an integer-typed
    /// scalar (sign-extension already happened at construction).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Scalar { elem_type, bits } => match elem_type {
                MetaElementType::I8
                | MetaElementType::I16
                | MetaElementType::I32
                | MetaElementType::I64 => Some(*bits as i64),
                MetaElementType::U8
                | MetaElementType::U16
                | MetaElementType::U32
                | MetaElementType::U64 => i64::try_from(*bits).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            MetaValue::Scalar {
                elem_type: MetaElementType::F32,
                bits,
            } => Some(f32::from_bits(*bits as u32)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Scalar {
                elem_type: MetaElementType::F64,
                bits,
            } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn as_urational(&self) -> Option<URational> {
        match self {
            MetaValue::Scalar {
                elem_type: MetaElementType::URational,
                bits,
            } => Some(URational::new(*bits as u32, (*bits >> 32) as u32)),
            _ => None,
        }
    }

    pub fn as_srational(&self) -> Option<SRational> {
        match self {
            MetaValue::Scalar {
                elem_type: MetaElementType::SRational,
                bits,
            } => Some(SRational::new(*bits as u32 as i32, (*bits >> 32) as i32)),
            _ => None,
        }
    }

    /// The raw payload bytes of a `Bytes`, `Text`, or `Array` value.
    pub fn payload<'a>(&self, arena: &'a ByteArena) -> Option<&'a [u8]> {
        match self {
            MetaValue::Array { span, .. }
            | MetaValue::Bytes { span, .. }
            | MetaValue::Text { span, .. } => Some(arena.span(*span)),
            _ => None,
        }
    }

    /// Text bytes as UTF-8, when they happen to be valid.
    pub fn text_str<'a>(&self, arena: &'a ByteArena) -> Option<&'a str> {
        match self {
            MetaValue::Text { span, .. } => std::str::from_utf8(arena.span(*span)).ok(),
            _ => None,
        }
    }

    /// A typed view over `Array` storage.
    ///
    /// Returns `None` when this is not an array or the element type/size
    /// does not line up with `T`.
    pub fn array_as<'a, T: AnyBitPattern>(&self, arena: &'a ByteArena) -> Option<&'a [T]> {
        match self {
            MetaValue::Array { elem_type, span, .. }
                if elem_type.size() as usize == std::mem::size_of::<T>() =>
            {
                bytemuck::try_cast_slice(arena.span(*span)).ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trips() {
        assert_eq!(MetaValue::u32(7).as_u32(), Some(7));
        assert_eq!(MetaValue::i16(-2).as_i64(), Some(-2));
        assert_eq!(MetaValue::u8(0xFF).as_u64(), Some(0xFF));
        assert_eq!(MetaValue::f32_bits(1.5f32.to_bits()).as_f32(), Some(1.5));
        let r = MetaValue::urational(72, 1).as_urational().unwrap();
        assert_eq!((r.numer, r.denom), (72, 1));
        let s = MetaValue::srational(-1, 3).as_srational().unwrap();
        assert_eq!((s.numer, s.denom), (-1, 3));
    }

    #[test]
    fn mismatched_accessors_return_none() {
        assert_eq!(MetaValue::i8(-1).as_u64(), None);
        assert_eq!(MetaValue::u8(1).as_f32(), None);
        assert_eq!(MetaValue::Empty.as_u32(), None);
    }

    #[test]
    fn text_preserves_raw_bytes() {
        let mut arena = ByteArena::new();
        let value = MetaValue::text(&mut arena, "Canon", TextEncoding::Ascii);
        assert_eq!(value.count(), 5);
        assert_eq!(value.text_str(&arena), Some("Canon"));
        assert_eq!(value.payload(&arena), Some(&b"Canon"[..]));

        let raw = MetaValue::text_bytes(&mut arena, &[0xFF, 0xFE], TextEncoding::Utf16LE);
        assert_eq!(raw.text_str(&arena), None);
        assert_eq!(raw.payload(&arena), Some(&[0xFF, 0xFE][..]));
    }

    #[test]
    fn arrays_are_typed_and_aligned() {
        let mut arena = ByteArena::new();
        arena.append(b"x"); // force a misaligned tail before allocation
        let value = MetaValue::u32_array(&mut arena, &[1, 2, 3]);
        assert_eq!(value.count(), 3);
        let elems: &[u32] = value.array_as(&arena).unwrap();
        assert_eq!(elems, &[1, 2, 3]);
        // the wrong element width refuses to cast
        assert!(value.array_as::<u16>(&arena).is_none());
    }

    #[test]
    fn rational_arrays() {
        let mut arena = ByteArena::new();
        let values = [URational::new(1, 2), URational::new(3, 4)];
        let value = MetaValue::urational_array(&mut arena, &values);
        let elems: &[URational] = value.array_as(&arena).unwrap();
        assert_eq!(elems, &values);
    }
}
