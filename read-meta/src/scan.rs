//! Shallow container scanners that locate metadata blocks in file bytes.
//!
//! Scanners walk the outermost structure of a container (JPEG segments,
//! PNG chunks, RIFF chunks, GIF extension blocks, ISO-BMFF boxes), emit a
//! [`ContainerBlockRef`] for every metadata block they recognize, and stop
//! there: payloads are not decompressed and inner formats are not parsed.
//! Compression and chunking annotations tell a later payload step how to
//! reassemble logical streams.
//!
//! Scanners never allocate; callers provide the output slice. Every input
//! byte sequence maps to a well-defined [`ScanResult`], and every emitted
//! block satisfies
//! `data_offset + data_size <= outer_offset + outer_size <= bytes.len()`.

mod bmff;
mod gif;
mod jp2;
mod jpeg;
mod jxl;
mod png;
mod tiff;
mod webp;

pub use bmff::scan_bmff;
pub use gif::scan_gif;
pub use jp2::scan_jp2;
pub use jpeg::scan_jpeg;
pub use jxl::scan_jxl;
pub use png::scan_png;
pub use tiff::scan_tiff;
pub use webp::scan_webp;

/// Scanner result status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ScanStatus {
    #[default]
    Ok,
    /// The output slice was too small; [`ScanResult::needed`] reports the
    /// required block count.
    OutputTruncated,
    /// The bytes do not match the container format handled by the scanner.
    Unsupported,
    /// The container structure is malformed or inconsistent.
    Malformed,
}

/// Supported high-level container formats for block scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ContainerFormat {
    #[default]
    Unknown,
    Jpeg,
    Png,
    Webp,
    Gif,
    Tiff,
    Jp2,
    Jxl,
    Heif,
    Avif,
    Cr3,
}

/// Logical kind of a discovered metadata block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ContainerBlockKind {
    #[default]
    Unknown,
    Exif,
    /// Canon CRW (CIFF) directory tree (non-TIFF metadata container).
    Ciff,
    MakerNote,
    Xmp,
    XmpExtended,
    /// JPEG Universal Metadata Box Format payload (including C2PA manifests).
    Jumbf,
    Icc,
    IptcIim,
    PhotoshopIrb,
    Mpf,
    Comment,
    Text,
    CompressedMetadata,
}

/// Compression applied to the block payload bytes (if any).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BlockCompression {
    #[default]
    None,
    Deflate,
    Brotli,
}

/// Chunking scheme used to represent a logical stream split across blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BlockChunking {
    #[default]
    None,
    /// JPEG APP2 ICC sequence: 1-based part number + total part count.
    JpegApp2SeqTotal,
    /// JPEG APP1 extended XMP: 32-byte GUID + full length + chunk offset.
    JpegXmpExtendedGuidOffset,
    /// GIF application-extension data in length-prefixed sub-blocks.
    GifSubBlocks,
    /// Payload begins with a big-endian u32 offset to the TIFF header.
    BmffExifTiffOffsetU32Be,
    /// JXL `brob` payload: big-endian wrapped box type, then Brotli stream.
    BrobU32BeRealTypePrefix,
    /// JP2 `uuid` box payload following the 16-byte UUID.
    Jp2UuidPayload,
    /// Photoshop image-resource blocks (`8BIM` records).
    PsIrb8Bim,
}

/// Reference to a metadata payload within container bytes.
///
/// All offsets are relative to the start of the full file byte buffer
/// passed to the scanner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerBlockRef {
    pub format: ContainerFormat,
    pub kind: ContainerBlockKind,
    pub compression: BlockCompression,
    pub chunking: BlockChunking,

    /// The outer container block (e.g. JPEG segment, PNG chunk, BMFF box).
    pub outer_offset: u64,
    pub outer_size: u64,

    /// The metadata bytes inside the block (after signatures/prefix fields).
    pub data_offset: u64,
    pub data_size: u64,

    /// Container-specific identifier:
    /// - JPEG: marker (`0xFFEx`)
    /// - PNG / RIFF / BMFF / JP2 / JXL: chunk or box type (FourCC)
    /// - TIFF: 0
    pub id: u32,

    /// 0-based part number within a chunked logical stream.
    pub part_index: u32,
    /// Total part count; 0 if unknown or not chunked.
    pub part_count: u32,
    /// Byte offset of this part within the logical stream.
    pub logical_offset: u64,
    /// Total logical stream size; 0 if unknown.
    pub logical_size: u64,
    /// Stable group id/hash shared by parts of one logical stream; 0 if none.
    pub group: u64,

    /// Extra container-specific data (e.g. `brob` wrapped type, BMFF Exif
    /// TIFF offset).
    pub aux_u32: u32,
}

/// The outcome of a scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanResult {
    pub status: ScanStatus,
    /// How many blocks were written to the output slice.
    pub written: u32,
    /// How many output slots a complete scan requires.
    pub needed: u32,
}

impl ScanResult {
    pub(crate) const UNSUPPORTED: ScanResult = ScanResult {
        status: ScanStatus::Unsupported,
        written: 0,
        needed: 0,
    };
}

/// Collects blocks into the caller-provided slice, tracking overflow.
pub(crate) struct BlockSink<'a> {
    out: &'a mut [ContainerBlockRef],
    written: u32,
    needed: u32,
}

impl<'a> BlockSink<'a> {
    pub(crate) fn new(out: &'a mut [ContainerBlockRef]) -> Self {
        BlockSink {
            out,
            written: 0,
            needed: 0,
        }
    }

    pub(crate) fn push(&mut self, block: ContainerBlockRef) {
        self.needed = self.needed.saturating_add(1);
        if (self.written as usize) < self.out.len() {
            self.out[self.written as usize] = block;
            self.written += 1;
        }
    }

    /// Blocks written so far, for in-place reordering.
    pub(crate) fn written_mut(&mut self) -> &mut [ContainerBlockRef] {
        &mut self.out[..self.written as usize]
    }

    pub(crate) fn finish(self, status: ScanStatus) -> ScanResult {
        let status = if status == ScanStatus::Ok && self.needed > self.written {
            ScanStatus::OutputTruncated
        } else {
            status
        };
        ScanResult {
            status,
            written: self.written,
            needed: self.needed,
        }
    }
}

/// FNV-1a over `bytes`; used as the stable `group` id for chunked streams.
pub(crate) fn group_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JP2_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];
const JXL_BOX_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Dispatch to the scanner matching the magic bytes of `bytes`.
///
/// Returns [`ScanStatus::Unsupported`] when no scanner recognizes the
/// input.
pub fn scan_auto(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return scan_jpeg(bytes, out);
    }
    if bytes.starts_with(&PNG_SIGNATURE) {
        return scan_png(bytes, out);
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return scan_webp(bytes, out);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return scan_gif(bytes, out);
    }
    if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return scan_tiff(bytes, out);
    }
    if bytes.starts_with(&JP2_SIGNATURE) {
        return scan_jp2(bytes, out);
    }
    if bytes.starts_with(&[0xFF, 0x0A]) || bytes.starts_with(&JXL_BOX_SIGNATURE) {
        return scan_jxl(bytes, out);
    }
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return scan_bmff(bytes, out);
    }
    ScanResult::UNSUPPORTED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_magic() {
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_auto(b"not an image at all", &mut out);
        assert_eq!(result.status, ScanStatus::Unsupported);
        assert_eq!(result.written, 0);
    }

    #[test]
    fn empty_input() {
        let mut out = [ContainerBlockRef::default(); 1];
        assert_eq!(scan_auto(&[], &mut out).status, ScanStatus::Unsupported);
    }

    #[test]
    fn group_hash_is_stable() {
        assert_eq!(group_hash(b"ICC_PROFILE"), group_hash(b"ICC_PROFILE"));
        assert_ne!(group_hash(b"ICC_PROFILE"), group_hash(b"icc_profile"));
        // FNV-1a of the empty input is the offset basis
        assert_eq!(group_hash(&[]), 0xcbf2_9ce4_8422_2325);
    }
}
