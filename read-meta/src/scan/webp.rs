//! RIFF/WebP chunk scanning.

use meta_types::FourCc;

use crate::MetaData;

use super::{
    BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat, ScanResult, ScanStatus,
};

const CHUNK_EXIF: FourCc = FourCc::new(b"EXIF");
const CHUNK_XMP: FourCc = FourCc::new(b"XMP ");
const CHUNK_ICCP: FourCc = FourCc::new(b"ICCP");

/// Scans a RIFF/WebP byte stream and emits all metadata chunks found.
pub fn scan_webp(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if bytes.len() < 12 || !bytes.starts_with(b"RIFF") || &bytes[8..12] != b"WEBP" {
        return ScanResult::UNSUPPORTED;
    }

    let data = MetaData::new(bytes);
    let mut sink = BlockSink::new(out);
    let mut status = ScanStatus::Ok;
    let mut offset = 12usize;

    while offset + 8 <= bytes.len() {
        let chunk_type = FourCc::new(&[
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        let Some(chunk_len) = data.read_le_at::<u32>(offset as u64 + 4) else {
            status = ScanStatus::Malformed;
            break;
        };
        let data_offset = offset + 8;
        let Some(data_end) = data_offset.checked_add(chunk_len as usize) else {
            status = ScanStatus::Malformed;
            break;
        };
        if data_end > bytes.len() {
            status = ScanStatus::Malformed;
            break;
        }

        let kind = match chunk_type {
            CHUNK_EXIF => Some(ContainerBlockKind::Exif),
            CHUNK_XMP => Some(ContainerBlockKind::Xmp),
            CHUNK_ICCP => Some(ContainerBlockKind::Icc),
            _ => None,
        };
        if let Some(kind) = kind {
            sink.push(ContainerBlockRef {
                format: ContainerFormat::Webp,
                kind,
                outer_offset: offset as u64,
                outer_size: (data_end - offset) as u64,
                data_offset: data_offset as u64,
                data_size: chunk_len as u64,
                id: chunk_type.to_u32(),
                ..Default::default()
            });
        }

        // chunks are padded to even sizes; always at least 8 bytes forward
        offset = data_end.saturating_add(chunk_len as usize & 1);
    }

    sink.finish(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    fn webp_with(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut body = b"WEBP".to_vec();
        for (ty, data) in chunks {
            body.extend_from_slice(*ty);
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(data);
            if data.len() % 2 == 1 {
                body.push(0);
            }
        }
        let mut file = b"RIFF".to_vec();
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend_from_slice(&body);
        file
    }

    #[test]
    fn finds_metadata_chunks() {
        let file = webp_with(&[
            (b"VP8 ", b"not-metadata"),
            (b"EXIF", b"II*\0abc"),
            (b"XMP ", b"<x/>"),
            (b"ICCP", b"profile"),
        ]);
        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 3);
        assert_eq!(out[0].kind, ContainerBlockKind::Exif);
        assert_eq!(out[1].kind, ContainerBlockKind::Xmp);
        assert_eq!(out[2].kind, ContainerBlockKind::Icc);
        let xmp = &file[out[1].data_offset as usize..][..out[1].data_size as usize];
        assert_eq!(xmp, b"<x/>");
    }

    #[test]
    fn odd_sized_chunks_stay_aligned() {
        let file = webp_with(&[(b"XMP ", b"odd"), (b"EXIF", b"even")]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_webp(&file, &mut out);
        assert_eq!(result.written, 2);
        assert_eq!(out[1].kind, ContainerBlockKind::Exif);
    }

    #[test]
    fn chunk_overrunning_file_is_malformed() {
        let mut file = b"RIFF".to_vec();
        file.extend_from_slice(&100u32.to_le_bytes());
        file.extend_from_slice(b"WEBPEXIF");
        file.extend_from_slice(&1000u32.to_le_bytes());
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_webp(&file, &mut out).status, ScanStatus::Malformed);
    }
}
