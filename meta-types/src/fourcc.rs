use std::fmt::{Debug, Display, Formatter};

/// A four-byte chunk or box type code.
///
/// Container formats name their blocks with four bytes packed big-endian
/// into a `u32` (PNG chunk types, RIFF chunk ids, ISO-BMFF box types). The
/// bytes are usually printable ASCII but nothing in the containers
/// guarantees it, so construction is permissive; only [`Display`] and
/// [`Debug`] care about printability.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Create a code from a byte-string literal, e.g. `FourCc::new(b"ftyp")`.
    pub const fn new(src: &[u8; 4]) -> FourCc {
        FourCc(*src)
    }

    /// Create a code from raw big-endian bytes as read from a container.
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The memory representation of this code.
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0
    }

    /// Unpack a code from its big-endian `u32` form.
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw.to_be_bytes())
    }

    /// The code packed big-endian into a `u32`.
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl crate::raw::Scalar for FourCc {
    type Raw = [u8; 4];

    fn to_raw(self) -> Self::Raw {
        self.to_be_bytes()
    }

    fn from_raw(raw: Self::Raw) -> Self {
        Self::from_be_bytes(raw)
    }
}

impl crate::raw::FixedSize for FourCc {
    const RAW_BYTE_LEN: usize = 4;
}

impl AsRef<[u8]> for FourCc {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8; 4]> for FourCc {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

impl PartialEq<&[u8]> for FourCc {
    fn eq(&self, other: &&[u8]) -> bool {
        self.0.as_ref() == *other
    }
}

impl Display for FourCc {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        // a dumb no-std way of ensuring this string is valid utf-8
        let mut bytes = [b'-'; 4];
        for (i, b) in self.0.iter().enumerate() {
            if b.is_ascii_graphic() || *b == b' ' {
                bytes[i] = *b;
            }
        }
        match std::str::from_utf8(&bytes) {
            Ok(s) => Display::fmt(s, f),
            Err(_) => Ok(()),
        }
    }
}

impl Debug for FourCc {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        let mut dbg = f.debug_tuple("FourCc");
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            match std::str::from_utf8(&self.0) {
                Ok(s) => {
                    dbg.field(&s);
                }
                Err(_) => {
                    dbg.field(&self.0);
                }
            }
        } else {
            dbg.field(&format_args!("{:#010x}", self.to_u32()));
        }
        dbg.finish()
    }
}

// a meaningless placeholder value.
impl Default for FourCc {
    fn default() -> Self {
        FourCc([0; 4])
    }
}
