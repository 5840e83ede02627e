//! JPEG 2000 (JP2) box scanning.

use meta_types::FourCc;

use crate::bmff::{parse_box, MAX_BOX_COUNT};
use crate::MetaData;

use super::{
    BlockChunking, BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat, ScanResult,
    ScanStatus, JP2_SIGNATURE,
};

const BOX_XML: FourCc = FourCc::new(b"xml ");
const BOX_UUID: FourCc = FourCc::new(b"uuid");
const BOX_JUMB: FourCc = FourCc::new(b"jumb");

const UUID_XMP: [u8; 16] = [
    0xBE, 0x7A, 0xCF, 0xCB, 0x97, 0xA9, 0x42, 0xE8, 0x9C, 0x71, 0x99, 0x94, 0x91, 0xE3, 0xAF, 0xAC,
];
// "JpgTiffExif->JP2"
const UUID_EXIF: [u8; 16] = [
    0x4A, 0x70, 0x67, 0x54, 0x69, 0x66, 0x66, 0x45, 0x78, 0x69, 0x66, 0x2D, 0x3E, 0x4A, 0x50, 0x32,
];
const UUID_IPTC: [u8; 16] = [
    0x33, 0xC7, 0xA4, 0xD2, 0xB8, 0x1D, 0x47, 0x23, 0xA0, 0xBA, 0xF1, 0xA3, 0xE0, 0x97, 0xAD, 0x38,
];
const UUID_C2PA: [u8; 16] = [
    0xD8, 0xFE, 0xC3, 0xD6, 0x1B, 0x0E, 0x48, 0x3C, 0x92, 0x97, 0x58, 0x28, 0x87, 0x7E, 0xC4, 0x81,
];

/// Scans a JP2 byte stream and emits metadata boxes found at the top level.
pub fn scan_jp2(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if !bytes.starts_with(&JP2_SIGNATURE) {
        return ScanResult::UNSUPPORTED;
    }

    let data = MetaData::new(bytes);
    let mut sink = BlockSink::new(out);
    let mut status = ScanStatus::Ok;
    let end = data.len();
    let mut offset = 0u64;
    let mut seen = 0u32;

    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            status = ScanStatus::Malformed;
            break;
        }
        let Some(parsed) = parse_box(data, offset, end) else {
            status = ScanStatus::Malformed;
            break;
        };

        match parsed.box_type {
            BOX_XML => sink.push(block(&parsed, ContainerBlockKind::Xmp, BlockChunking::None)),
            BOX_JUMB => sink.push(block(
                &parsed,
                ContainerBlockKind::Jumbf,
                BlockChunking::None,
            )),
            BOX_UUID => {
                let kind = match parsed.uuid {
                    Some(UUID_XMP) => Some(ContainerBlockKind::Xmp),
                    Some(UUID_EXIF) => Some(ContainerBlockKind::Exif),
                    Some(UUID_IPTC) => Some(ContainerBlockKind::IptcIim),
                    Some(UUID_C2PA) => Some(ContainerBlockKind::Jumbf),
                    _ => None,
                };
                if let Some(kind) = kind {
                    sink.push(block(&parsed, kind, BlockChunking::Jp2UuidPayload));
                }
            }
            _ => {}
        }

        // box size is at least its header size, so this strictly increases
        offset = parsed.end();
    }

    sink.finish(status)
}

fn block(
    parsed: &crate::bmff::BmffBox,
    kind: ContainerBlockKind,
    chunking: BlockChunking,
) -> ContainerBlockRef {
    ContainerBlockRef {
        format: ContainerFormat::Jp2,
        kind,
        chunking,
        outer_offset: parsed.offset,
        outer_size: parsed.size,
        data_offset: parsed.payload_offset(),
        data_size: parsed.payload_size(),
        id: parsed.box_type.to_u32(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    fn boxed(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32 + 8).to_be_bytes().to_vec();
        out.extend_from_slice(box_type);
        out.extend_from_slice(payload);
        out
    }

    fn jp2_with(boxes: &[Vec<u8>]) -> Vec<u8> {
        let mut file = JP2_SIGNATURE.to_vec();
        file.extend_from_slice(&boxed(b"ftyp", b"jp2 \0\0\0\0jp2 "));
        for b in boxes {
            file.extend_from_slice(b);
        }
        file
    }

    #[test]
    fn finds_xml_and_uuid_boxes() {
        let mut xmp_uuid = UUID_XMP.to_vec();
        xmp_uuid.extend_from_slice(b"<x:xmpmeta/>");
        let mut exif_uuid = UUID_EXIF.to_vec();
        exif_uuid.extend_from_slice(b"II*\0");
        let file = jp2_with(&[
            boxed(b"xml ", b"<gml/>"),
            boxed(b"uuid", &xmp_uuid),
            boxed(b"uuid", &exif_uuid),
        ]);

        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 3);
        assert_eq!(out[0].kind, ContainerBlockKind::Xmp);
        assert_eq!(out[0].chunking, BlockChunking::None);
        assert_eq!(out[1].kind, ContainerBlockKind::Xmp);
        assert_eq!(out[1].chunking, BlockChunking::Jp2UuidPayload);
        assert_eq!(out[2].kind, ContainerBlockKind::Exif);
        // payload excludes the 16-byte uuid
        let data = &file[out[2].data_offset as usize..][..out[2].data_size as usize];
        assert_eq!(data, b"II*\0");
    }

    #[test]
    fn unknown_uuid_is_skipped() {
        let mut unknown = [0x42u8; 16].to_vec();
        unknown.extend_from_slice(b"private");
        let file = jp2_with(&[boxed(b"uuid", &unknown)]);
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_jp2(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 0);
    }

    #[test]
    fn bad_box_size_is_malformed() {
        let mut file = JP2_SIGNATURE.to_vec();
        file.extend_from_slice(&1000u32.to_be_bytes());
        file.extend_from_slice(b"xml ");
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_jp2(&file, &mut out).status, ScanStatus::Malformed);
    }
}
