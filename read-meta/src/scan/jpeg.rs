//! JPEG marker-segment scanning.

use crate::MetaData;

use super::{
    group_hash, BlockChunking, BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat,
    ScanResult, ScanStatus,
};

const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_APP2: u8 = 0xE2;
const MARKER_APP4: u8 = 0xE4;
const MARKER_APP11: u8 = 0xEB;
const MARKER_APP13: u8 = 0xED;
const MARKER_COM: u8 = 0xFE;

const SIG_JFIF: &[u8] = b"JFIF\0";
const SIG_JFXX: &[u8] = b"JFXX\0";
const SIG_EXIF: &[u8] = b"Exif\0\0";
const SIG_XMP: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const SIG_XMP_EXT: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const SIG_MPF: &[u8] = b"MPF\0";
const SIG_ICC: &[u8] = b"ICC_PROFILE\0";
const SIG_FLIR: &[u8] = b"FLIR\0";
const SIG_PSIRB: &[u8] = b"Photoshop 3.0\0";

// 32-byte ASCII GUID + u32 full length + u32 chunk offset.
const XMP_EXT_HEADER_LEN: usize = 32 + 4 + 4;

/// Scans a JPEG byte stream and emits all metadata segments found.
///
/// Walks marker segments from SOI up to SOS/EOI. Unknown APPn segments and
/// all non-metadata markers are skipped; entropy-coded data is never
/// entered.
pub fn scan_jpeg(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return ScanResult::UNSUPPORTED;
    }

    let data = MetaData::new(bytes);
    let mut sink = BlockSink::new(out);
    let mut status = ScanStatus::Ok;
    let mut xmp_ext_parts = 0u32;
    let mut offset = 2usize;

    while offset + 2 <= bytes.len() {
        if bytes[offset] != 0xFF {
            status = ScanStatus::Malformed;
            break;
        }
        let marker = bytes[offset + 1];
        match marker {
            // fill byte before a marker
            0xFF => {
                offset += 1;
                continue;
            }
            // standalone markers
            0x01 | 0xD0..=0xD8 => {
                offset += 2;
                continue;
            }
            // EOI, or SOS: entropy-coded data follows
            0xD9 | 0xDA => break,
            _ => {}
        }

        let Some(seg_len) = data.read_be_at::<u16>(offset as u64 + 2) else {
            status = ScanStatus::Malformed;
            break;
        };
        if seg_len < 2 {
            status = ScanStatus::Malformed;
            break;
        }
        let seg_end = offset + 2 + seg_len as usize;
        let payload_offset = offset + 4;
        let Some(payload) =
            data.subrange(payload_offset as u64, seg_end.saturating_sub(payload_offset) as u64)
        else {
            status = ScanStatus::Malformed;
            break;
        };
        emit_segment(
            marker,
            offset,
            seg_end,
            payload_offset,
            payload,
            &mut xmp_ext_parts,
            &mut sink,
        );

        // seg_len >= 2, so this strictly increases
        offset = seg_end;
    }

    sink.finish(status)
}

fn segment_block(
    marker: u8,
    seg_offset: usize,
    seg_end: usize,
    kind: ContainerBlockKind,
    data_offset: usize,
    data_end: usize,
) -> ContainerBlockRef {
    ContainerBlockRef {
        format: ContainerFormat::Jpeg,
        kind,
        outer_offset: seg_offset as u64,
        outer_size: (seg_end - seg_offset) as u64,
        data_offset: data_offset as u64,
        data_size: (data_end - data_offset) as u64,
        id: 0xFF00 | marker as u32,
        ..Default::default()
    }
}

fn emit_segment(
    marker: u8,
    seg_offset: usize,
    seg_end: usize,
    payload_offset: usize,
    payload: &[u8],
    xmp_ext_parts: &mut u32,
    sink: &mut BlockSink,
) {
    match marker {
        MARKER_APP0 => {
            if payload.starts_with(SIG_JFIF) || payload.starts_with(SIG_JFXX) {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Comment,
                    payload_offset + SIG_JFIF.len(),
                    seg_end,
                ));
            }
        }
        MARKER_APP1 => {
            if payload.starts_with(SIG_EXIF) {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Exif,
                    payload_offset + SIG_EXIF.len(),
                    seg_end,
                ));
            } else if payload.starts_with(SIG_XMP_EXT) {
                emit_extended_xmp(
                    marker,
                    seg_offset,
                    seg_end,
                    payload_offset,
                    payload,
                    xmp_ext_parts,
                    sink,
                );
            } else if payload.starts_with(SIG_XMP) {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Xmp,
                    payload_offset + SIG_XMP.len(),
                    seg_end,
                ));
            } else if payload.starts_with(SIG_MPF) {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Mpf,
                    payload_offset + SIG_MPF.len(),
                    seg_end,
                ));
            } else if payload.starts_with(SIG_FLIR) {
                emit_flir(marker, seg_offset, seg_end, payload_offset, payload, sink);
            }
        }
        MARKER_APP2 => {
            if payload.starts_with(SIG_ICC) && payload.len() >= SIG_ICC.len() + 2 {
                let seq = payload[SIG_ICC.len()];
                let total = payload[SIG_ICC.len() + 1];
                let mut block = segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Icc,
                    payload_offset + SIG_ICC.len() + 2,
                    seg_end,
                );
                block.chunking = BlockChunking::JpegApp2SeqTotal;
                block.part_index = u32::from(seq).saturating_sub(1);
                block.part_count = u32::from(total);
                block.group = group_hash(b"ICC_PROFILE");
                sink.push(block);
            } else if payload.starts_with(SIG_MPF) {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Mpf,
                    payload_offset + SIG_MPF.len(),
                    seg_end,
                ));
            }
        }
        MARKER_APP4 => {
            if payload.starts_with(SIG_FLIR) {
                emit_flir(marker, seg_offset, seg_end, payload_offset, payload, sink);
            } else if !payload.is_empty() {
                // vendor thermal data (e.g. DJI) rides in bare APP4
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::MakerNote,
                    payload_offset,
                    seg_end,
                ));
            }
        }
        MARKER_APP11 => {
            // ISO 19566-5: "JP" marker, box instance, packet sequence,
            // then JUMBF box bytes
            if payload.len() >= 8 && payload.starts_with(b"JP") {
                sink.push(segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::Jumbf,
                    payload_offset + 8,
                    seg_end,
                ));
            }
        }
        MARKER_APP13 => {
            if payload.starts_with(SIG_PSIRB) {
                let mut block = segment_block(
                    marker,
                    seg_offset,
                    seg_end,
                    ContainerBlockKind::PhotoshopIrb,
                    payload_offset + SIG_PSIRB.len(),
                    seg_end,
                );
                block.chunking = BlockChunking::PsIrb8Bim;
                sink.push(block);
            }
        }
        MARKER_COM => {
            sink.push(segment_block(
                marker,
                seg_offset,
                seg_end,
                ContainerBlockKind::Comment,
                payload_offset,
                seg_end,
            ));
        }
        _ => {}
    }
}

fn emit_extended_xmp(
    marker: u8,
    seg_offset: usize,
    seg_end: usize,
    payload_offset: usize,
    payload: &[u8],
    xmp_ext_parts: &mut u32,
    sink: &mut BlockSink,
) {
    let header_end = SIG_XMP_EXT.len() + XMP_EXT_HEADER_LEN;
    if payload.len() < header_end {
        return;
    }
    let guid = &payload[SIG_XMP_EXT.len()..SIG_XMP_EXT.len() + 32];
    let header = MetaData::new(payload);
    let full_len = header
        .read_be_at::<u32>(SIG_XMP_EXT.len() as u64 + 32)
        .unwrap_or(0);
    let chunk_offset = header
        .read_be_at::<u32>(SIG_XMP_EXT.len() as u64 + 36)
        .unwrap_or(0);

    let mut block = segment_block(
        marker,
        seg_offset,
        seg_end,
        ContainerBlockKind::XmpExtended,
        payload_offset + header_end,
        seg_end,
    );
    block.chunking = BlockChunking::JpegXmpExtendedGuidOffset;
    block.part_index = *xmp_ext_parts;
    block.logical_offset = chunk_offset as u64;
    block.logical_size = full_len as u64;
    block.group = group_hash(guid);
    sink.push(block);
    *xmp_ext_parts = xmp_ext_parts.saturating_add(1);
}

fn emit_flir(
    marker: u8,
    seg_offset: usize,
    seg_end: usize,
    payload_offset: usize,
    payload: &[u8],
    sink: &mut BlockSink,
) {
    // "FLIR\0" preamble, one pad byte, then part index and (total - 1)
    if payload.len() < 8 {
        return;
    }
    let part_index = payload[6];
    let part_total = payload[7] as u32 + 1;
    let mut block = segment_block(
        marker,
        seg_offset,
        seg_end,
        ContainerBlockKind::MakerNote,
        payload_offset + 8,
        seg_end,
    );
    block.part_index = u32::from(part_index);
    block.part_count = part_total;
    block.group = group_hash(SIG_FLIR);
    sink.push(block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn jpeg_with(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut file = vec![0xFF, 0xD8];
        for seg in segments {
            file.extend_from_slice(seg);
        }
        file.extend_from_slice(&[0xFF, 0xD9]);
        file
    }

    #[test]
    fn finds_exif_and_xmp_app1() {
        let mut exif = SIG_EXIF.to_vec();
        exif.extend_from_slice(b"II*\0rest-of-tiff");
        let mut xmp = SIG_XMP.to_vec();
        xmp.extend_from_slice(b"<x:xmpmeta/>");
        let file = jpeg_with(&[segment(0xE1, &exif), segment(0xE1, &xmp)]);

        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_jpeg(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 2);

        assert_eq!(out[0].kind, ContainerBlockKind::Exif);
        assert_eq!(out[0].id, 0xFFE1);
        let data = &file[out[0].data_offset as usize..][..out[0].data_size as usize];
        assert_eq!(data, b"II*\0rest-of-tiff");

        assert_eq!(out[1].kind, ContainerBlockKind::Xmp);
        let data = &file[out[1].data_offset as usize..][..out[1].data_size as usize];
        assert_eq!(data, b"<x:xmpmeta/>");
    }

    #[test]
    fn icc_chunking_records_seq_and_total() {
        let mut icc = SIG_ICC.to_vec();
        icc.push(2); // seq (1-based)
        icc.push(3); // total
        icc.extend_from_slice(&[0xAB; 10]);
        let file = jpeg_with(&[segment(0xE2, &icc)]);

        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_jpeg(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Icc);
        assert_eq!(out[0].chunking, BlockChunking::JpegApp2SeqTotal);
        assert_eq!(out[0].part_index, 1);
        assert_eq!(out[0].part_count, 3);
        assert_eq!(out[0].group, group_hash(b"ICC_PROFILE"));
        assert_eq!(out[0].data_size, 10);
    }

    #[test]
    fn extended_xmp_groups_by_guid() {
        let guid = [b'A'; 32];
        let mut seg_payload = SIG_XMP_EXT.to_vec();
        seg_payload.extend_from_slice(&guid);
        seg_payload.extend_from_slice(&2000u32.to_be_bytes()); // full length
        seg_payload.extend_from_slice(&100u32.to_be_bytes()); // offset
        seg_payload.extend_from_slice(b"chunk-bytes");
        let file = jpeg_with(&[segment(0xE1, &seg_payload)]);

        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_jpeg(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::XmpExtended);
        assert_eq!(out[0].chunking, BlockChunking::JpegXmpExtendedGuidOffset);
        assert_eq!(out[0].logical_size, 2000);
        assert_eq!(out[0].logical_offset, 100);
        assert_eq!(out[0].group, group_hash(&guid));
        assert_eq!(out[0].data_size, 11);
    }

    #[test]
    fn truncated_segment_is_malformed() {
        let mut file = vec![0xFF, 0xD8, 0xFF, 0xE1, 0xFF, 0xFF];
        file.extend_from_slice(&[0u8; 4]);
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_jpeg(&file, &mut out).status, ScanStatus::Malformed);
    }

    #[test]
    fn output_truncation_reports_needed() {
        let com = segment(0xFE, b"one");
        let file = jpeg_with(&[com.clone(), com.clone(), com]);
        let mut out = [ContainerBlockRef::default(); 1];
        let result = scan_jpeg(&file, &mut out);
        assert_eq!(result.status, ScanStatus::OutputTruncated);
        assert_eq!(result.written, 1);
        assert_eq!(result.needed, 3);
    }

    #[test]
    fn auto_dispatches_jpeg() {
        let file = jpeg_with(&[segment(0xFE, b"hi")]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Comment);
    }
}
