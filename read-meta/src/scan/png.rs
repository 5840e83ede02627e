//! PNG chunk scanning.

use meta_types::FourCc;

use crate::MetaData;

use super::{
    BlockCompression, BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat,
    ScanResult, ScanStatus, PNG_SIGNATURE,
};

const CHUNK_TEXT: FourCc = FourCc::new(b"tEXt");
const CHUNK_ZTXT: FourCc = FourCc::new(b"zTXt");
const CHUNK_ITXT: FourCc = FourCc::new(b"iTXt");
const CHUNK_EXIF: FourCc = FourCc::new(b"eXIf");
const CHUNK_ICCP: FourCc = FourCc::new(b"iCCP");
const CHUNK_IDOT: FourCc = FourCc::new(b"iDOT");
const CHUNK_IEND: FourCc = FourCc::new(b"IEND");

const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

/// Scans a PNG byte stream and emits all metadata chunks found.
///
/// Chunk CRCs are not validated; length boundaries are.
pub fn scan_png(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return ScanResult::UNSUPPORTED;
    }

    let data = MetaData::new(bytes);
    let mut sink = BlockSink::new(out);
    let mut status = ScanStatus::Ok;
    let mut offset = PNG_SIGNATURE.len();

    while offset + 8 <= bytes.len() {
        let Some(chunk_len) = data.read_be_at::<u32>(offset as u64) else {
            status = ScanStatus::Malformed;
            break;
        };
        // PNG caps chunk lengths at 2^31 - 1
        if chunk_len > 0x7FFF_FFFF {
            status = ScanStatus::Malformed;
            break;
        }
        let chunk_type = FourCc::new(&[
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]);
        let data_offset = offset + 8;
        let Some(data_end) = data_offset.checked_add(chunk_len as usize) else {
            status = ScanStatus::Malformed;
            break;
        };
        let chunk_end = data_end.saturating_add(4); // trailing CRC
        if chunk_end > bytes.len() {
            status = ScanStatus::Malformed;
            break;
        }

        let data = &bytes[data_offset..data_end];
        let (kind, compression) = match chunk_type {
            CHUNK_TEXT => (Some(ContainerBlockKind::Text), BlockCompression::None),
            CHUNK_ZTXT => (Some(ContainerBlockKind::Text), BlockCompression::Deflate),
            CHUNK_ITXT => itxt_classify(data),
            CHUNK_EXIF => (Some(ContainerBlockKind::Exif), BlockCompression::None),
            CHUNK_ICCP => (Some(ContainerBlockKind::Icc), BlockCompression::Deflate),
            CHUNK_IDOT => (Some(ContainerBlockKind::Xmp), BlockCompression::None),
            _ => (None, BlockCompression::None),
        };
        if let Some(kind) = kind {
            sink.push(ContainerBlockRef {
                format: ContainerFormat::Png,
                kind,
                compression,
                outer_offset: offset as u64,
                outer_size: (chunk_end - offset) as u64,
                data_offset: data_offset as u64,
                data_size: chunk_len as u64,
                id: chunk_type.to_u32(),
                ..Default::default()
            });
        }

        if chunk_type == CHUNK_IEND {
            break;
        }
        // always at least 12 bytes forward
        offset = chunk_end;
    }

    sink.finish(status)
}

/// An `iTXt` chunk holding the XMP packet under its well-known keyword is
/// an XMP block; anything else is generic text. The compression flag
/// follows the NUL-terminated keyword.
fn itxt_classify(data: &[u8]) -> (Option<ContainerBlockKind>, BlockCompression) {
    let keyword_end = data.iter().position(|b| *b == 0);
    let (kind, flag_pos) = match keyword_end {
        Some(end) if &data[..end] == XMP_KEYWORD => (ContainerBlockKind::Xmp, end + 1),
        Some(end) => (ContainerBlockKind::Text, end + 1),
        None => return (Some(ContainerBlockKind::Text), BlockCompression::None),
    };
    let compression = match data.get(flag_pos) {
        Some(1) => BlockCompression::Deflate,
        _ => BlockCompression::None,
    };
    (Some(kind), compression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    fn chunk(ty: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(ty);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]); // crc, not validated
        out
    }

    fn png_with(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut file = PNG_SIGNATURE.to_vec();
        file.extend_from_slice(&chunk(b"IHDR", &[0; 13]));
        for c in chunks {
            file.extend_from_slice(c);
        }
        file.extend_from_slice(&chunk(b"IEND", &[]));
        file
    }

    #[test]
    fn finds_exif_and_iccp() {
        let file = png_with(&[
            chunk(b"eXIf", b"II*\0"),
            chunk(b"iCCP", b"name\0\0deflate-data"),
        ]);
        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 2);
        assert_eq!(out[0].kind, ContainerBlockKind::Exif);
        assert_eq!(out[0].compression, BlockCompression::None);
        assert_eq!(out[1].kind, ContainerBlockKind::Icc);
        assert_eq!(out[1].compression, BlockCompression::Deflate);
        assert_eq!(out[1].id, FourCc::new(b"iCCP").to_u32());
    }

    #[test]
    fn itxt_xmp_keyword() {
        let mut data = XMP_KEYWORD.to_vec();
        data.extend_from_slice(b"\0\0\0\0\0<x:xmpmeta/>");
        let file = png_with(&[chunk(b"iTXt", &data)]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_png(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Xmp);
        assert_eq!(out[0].compression, BlockCompression::None);
    }

    #[test]
    fn itxt_compressed_text() {
        let file = png_with(&[chunk(b"iTXt", b"Comment\0\x01\0\0\0compressed")]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_png(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Text);
        assert_eq!(out[0].compression, BlockCompression::Deflate);
    }

    #[test]
    fn truncated_chunk_is_malformed() {
        let mut file = PNG_SIGNATURE.to_vec();
        file.extend_from_slice(&1000u32.to_be_bytes());
        file.extend_from_slice(b"eXIf");
        file.extend_from_slice(&[0; 8]);
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_png(&file, &mut out).status, ScanStatus::Malformed);
    }
}
