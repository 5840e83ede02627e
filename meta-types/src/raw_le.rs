//! Types for working with raw little-endian data.
//!
//! Most container formats here are big-endian, but RIFF/WebP is
//! little-endian and TIFF is byte-order tagged, so readers need both
//! flavors. See [`Scalar`] for this trait's big-endian counterpart.

use crate::raw::{sealed, Scalar};

/// A trait for scalars stored as little-endian bytes.
pub trait ScalarLE: Scalar {
    /// Create an instance of this type from raw little-endian bytes.
    fn from_raw_le(raw: <Self as Scalar>::Raw) -> Self;

    /// Encode this type as raw little-endian bytes.
    fn to_raw_le(self) -> <Self as Scalar>::Raw;

    /// Attempt to read a little-endian scalar from the front of `slice`.
    fn read_le(slice: &[u8]) -> Option<Self> {
        sealed::ByteArray::from_slice(slice).map(Self::from_raw_le)
    }
}

macro_rules! int_scalar_le {
    ($ty:ty) => {
        impl ScalarLE for $ty {
            #[inline(always)]
            fn from_raw_le(raw: <Self as Scalar>::Raw) -> Self {
                Self::from_le_bytes(raw)
            }

            fn to_raw_le(self) -> <Self as Scalar>::Raw {
                self.to_le_bytes()
            }
        }
    };
}

int_scalar_le!(u8);
int_scalar_le!(i8);
int_scalar_le!(u16);
int_scalar_le!(i16);
int_scalar_le!(u32);
int_scalar_le!(i32);
int_scalar_le!(u64);
int_scalar_le!(i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        assert_eq!(u16::read_le(&[0x34, 0x12]), Some(0x1234));
        assert_eq!(u32::read_le(&[0xEF, 0xBE, 0xAD, 0xDE]), Some(0xDEADBEEF));
        assert_eq!(u32::read_le(&[1]), None);
    }
}
