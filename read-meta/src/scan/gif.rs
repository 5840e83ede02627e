//! GIF extension-block scanning.

use super::{
    group_hash, BlockChunking, BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat,
    ScanResult, ScanStatus,
};

const APP_ID_XMP: &[u8; 11] = b"XMP DataXMP";
const APP_ID_ICC: &[u8; 11] = b"ICCRGBG1012";

/// Walk a length-prefixed sub-block sequence starting at `offset`.
///
/// Returns the offset one past the terminating zero-length block, or `None`
/// if the sequence runs off the end of `bytes`.
fn skip_sub_blocks(bytes: &[u8], mut offset: usize) -> Option<usize> {
    loop {
        let len = *bytes.get(offset)? as usize;
        offset += 1;
        if len == 0 {
            return Some(offset);
        }
        offset = offset.checked_add(len)?;
        if offset > bytes.len() {
            return None;
        }
    }
}

fn color_table_len(flags: u8) -> usize {
    if flags & 0x80 != 0 {
        3usize << ((flags & 0x07) + 1)
    } else {
        0
    }
}

/// Scans a GIF byte stream and emits all metadata extension blocks found.
///
/// Only the XMP and ICC application extensions carry metadata; their
/// sub-block payloads are emitted undecoded with
/// [`BlockChunking::GifSubBlocks`].
pub fn scan_gif(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if !bytes.starts_with(b"GIF87a") && !bytes.starts_with(b"GIF89a") {
        return ScanResult::UNSUPPORTED;
    }

    let mut sink = BlockSink::new(out);
    let mut status = ScanStatus::Ok;

    // logical screen descriptor + optional global color table
    if bytes.len() < 13 {
        return sink.finish(ScanStatus::Malformed);
    }
    let mut offset = 13 + color_table_len(bytes[10]);

    while offset < bytes.len() {
        match bytes[offset] {
            // trailer
            0x3B => break,
            // image descriptor: 9 fixed bytes, optional local color table,
            // LZW minimum code size, then image sub-blocks
            0x2C => {
                if offset + 10 > bytes.len() {
                    status = ScanStatus::Malformed;
                    break;
                }
                let lct = color_table_len(bytes[offset + 9]);
                let Some(data_start) = offset
                    .checked_add(10)
                    .and_then(|v| v.checked_add(lct))
                    .and_then(|v| v.checked_add(1))
                else {
                    status = ScanStatus::Malformed;
                    break;
                };
                match skip_sub_blocks(bytes, data_start) {
                    Some(next) => offset = next,
                    None => {
                        status = ScanStatus::Malformed;
                        break;
                    }
                }
            }
            // extension block
            0x21 => {
                if offset + 2 > bytes.len() {
                    status = ScanStatus::Malformed;
                    break;
                }
                let label = bytes[offset + 1];
                let Some(next) = scan_extension(bytes, offset, label, &mut sink) else {
                    status = ScanStatus::Malformed;
                    break;
                };
                offset = next;
            }
            _ => {
                status = ScanStatus::Malformed;
                break;
            }
        }
    }

    sink.finish(status)
}

/// Handle one extension block at `offset`; returns the offset of the next
/// block, or `None` when malformed. Application extensions with a known
/// metadata identifier are emitted; everything else is skipped.
fn scan_extension(bytes: &[u8], offset: usize, label: u8, sink: &mut BlockSink) -> Option<usize> {
    if label != 0xFF {
        return skip_sub_blocks(bytes, offset + 2);
    }

    let header_len = *bytes.get(offset + 2)? as usize;
    let app_id_start = offset + 3;
    let sub_start = app_id_start.checked_add(header_len)?;
    if sub_start > bytes.len() {
        return None;
    }
    let app_id = &bytes[app_id_start..sub_start];
    let next = skip_sub_blocks(bytes, sub_start)?;

    let kind = match app_id {
        id if header_len == 11 && id == APP_ID_XMP => Some(ContainerBlockKind::Xmp),
        id if header_len == 11 && id == APP_ID_ICC => Some(ContainerBlockKind::Icc),
        _ => None,
    };
    if let Some(kind) = kind {
        sink.push(ContainerBlockRef {
            format: ContainerFormat::Gif,
            kind,
            chunking: BlockChunking::GifSubBlocks,
            outer_offset: offset as u64,
            outer_size: (next - offset) as u64,
            data_offset: sub_start as u64,
            data_size: (next - sub_start) as u64,
            id: 0xFF,
            group: group_hash(app_id),
            ..Default::default()
        });
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    fn sub_blocks(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(255) {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        out.push(0);
        out
    }

    fn gif_with_app_ext(app_id: &[u8; 11], data: &[u8]) -> Vec<u8> {
        let mut file = b"GIF89a".to_vec();
        file.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]); // LSD, no GCT
        file.push(0x21);
        file.push(0xFF);
        file.push(11);
        file.extend_from_slice(app_id);
        file.extend_from_slice(&sub_blocks(data));
        file.push(0x3B);
        file
    }

    #[test]
    fn finds_xmp_application_extension() {
        let file = gif_with_app_ext(APP_ID_XMP, b"<x:xmpmeta/>");
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Xmp);
        assert_eq!(out[0].chunking, BlockChunking::GifSubBlocks);
        assert_eq!(out[0].group, group_hash(APP_ID_XMP));
        // data region covers the raw sub-block stream incl. terminator
        assert_eq!(out[0].data_size, 12 + 2);
    }

    #[test]
    fn finds_icc_application_extension() {
        let file = gif_with_app_ext(APP_ID_ICC, &[0xAA; 300]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_gif(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Icc);
        // 255-byte block + 45-byte block + terminator
        assert_eq!(out[0].data_size, 1 + 255 + 1 + 45 + 1);
    }

    #[test]
    fn unknown_extensions_are_skipped() {
        let mut file = b"GIF89a".to_vec();
        file.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]);
        file.extend_from_slice(&[0x21, 0xFE, 3, b'h', b'e', b'y', 0]); // comment
        file.push(0x3B);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_gif(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 0);
    }

    #[test]
    fn runaway_sub_blocks_are_malformed() {
        let mut file = b"GIF89a".to_vec();
        file.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]);
        file.extend_from_slice(&[0x21, 0xFF, 11]);
        file.extend_from_slice(APP_ID_XMP);
        file.push(200); // length prefix pointing past the end
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_gif(&file, &mut out).status, ScanStatus::Malformed);
    }
}
