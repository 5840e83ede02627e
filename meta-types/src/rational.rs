//! TIFF/EXIF rational value pairs.

use crate::raw::FixedSize;

/// An unsigned rational: numerator over denominator, as stored in TIFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(C)]
#[cfg_attr(
    feature = "bytemuck",
    derive(bytemuck_derive::Zeroable, bytemuck_derive::Pod)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct URational {
    pub numer: u32,
    pub denom: u32,
}

/// A signed rational: numerator over denominator, as stored in TIFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(C)]
#[cfg_attr(
    feature = "bytemuck",
    derive(bytemuck_derive::Zeroable, bytemuck_derive::Pod)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SRational {
    pub numer: i32,
    pub denom: i32,
}

impl URational {
    pub const fn new(numer: u32, denom: u32) -> Self {
        URational { numer, denom }
    }
}

impl SRational {
    pub const fn new(numer: i32, denom: i32) -> Self {
        SRational { numer, denom }
    }
}

impl Default for URational {
    fn default() -> Self {
        URational { numer: 0, denom: 1 }
    }
}

impl Default for SRational {
    fn default() -> Self {
        SRational { numer: 0, denom: 1 }
    }
}

impl FixedSize for URational {
    const RAW_BYTE_LEN: usize = 8;
}

impl FixedSize for SRational {
    const RAW_BYTE_LEN: usize = 8;
}
