//! JPEG XL container scanning.

use meta_types::FourCc;

use crate::bmff::{parse_box, BmffBox, MAX_BOX_COUNT};
use crate::MetaData;

use super::{
    BlockChunking, BlockCompression, BlockSink, ContainerBlockKind, ContainerBlockRef,
    ContainerFormat, ScanResult, ScanStatus, JXL_BOX_SIGNATURE,
};

const BOX_EXIF: FourCc = FourCc::new(b"Exif");
const BOX_XML: FourCc = FourCc::new(b"xml ");
const BOX_JUMB: FourCc = FourCc::new(b"jumb");
const BOX_BROB: FourCc = FourCc::new(b"brob");

/// Scans a JPEG XL byte stream and emits metadata boxes found.
///
/// A naked codestream (`FF 0A`) is valid JXL but carries no container
/// metadata, so it scans to zero blocks.
pub fn scan_jxl(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    if bytes.starts_with(&[0xFF, 0x0A]) {
        return BlockSink::new(out).finish(ScanStatus::Ok);
    }
    if !bytes.starts_with(&JXL_BOX_SIGNATURE) {
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
            BOX_EXIF => {
                let mut block = block(&parsed, ContainerBlockKind::Exif);
                block.chunking = BlockChunking::BmffExifTiffOffsetU32Be;
                block.aux_u32 = data.read_be_at::<u32>(parsed.payload_offset()).unwrap_or(0);
                sink.push(block);
            }
            BOX_XML => sink.push(block(&parsed, ContainerBlockKind::Xmp)),
            BOX_JUMB => sink.push(block(&parsed, ContainerBlockKind::Jumbf)),
            BOX_BROB => {
                if let Some(real_type) = data.read_be_at::<u32>(parsed.payload_offset()) {
                    let kind = match &real_type.to_be_bytes() {
                        b"Exif" => ContainerBlockKind::Exif,
                        b"xml " => ContainerBlockKind::Xmp,
                        b"jumb" => ContainerBlockKind::Jumbf,
                        _ => ContainerBlockKind::CompressedMetadata,
                    };
                    let mut block = block(&parsed, kind);
                    block.compression = BlockCompression::Brotli;
                    block.chunking = BlockChunking::BrobU32BeRealTypePrefix;
                    block.aux_u32 = real_type;
                    sink.push(block);
                }
            }
            _ => {}
        }

        // box size is at least its header size, so this strictly increases
        offset = parsed.end();
    }

    sink.finish(status)
}

fn block(parsed: &BmffBox, kind: ContainerBlockKind) -> ContainerBlockRef {
    ContainerBlockRef {
        format: ContainerFormat::Jxl,
        kind,
        outer_offset: parsed.offset,
        outer_size: parsed.size,
        data_offset: parsed.payload_offset(),
        data_size: parsed.payload_size(),
        id: parsed.box_type.to_u32(),
        ..Default::default()
    }
}
