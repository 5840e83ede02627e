//! ISO-BMFF (HEIF/AVIF/CR3) scanning.
//!
//! Verifies the leading `ftyp`, then walks the box tree looking for the
//! first `meta` box and resolves its `iinf`/`iloc`/`idat` structures to the
//! byte ranges of EXIF, XMP, and JUMBF items.

use meta_types::FourCc;

use crate::bmff::{
    is_container_box, parse_box, parse_ftyp, BmffBox, FOURCC_FTYP, FOURCC_META, MAX_BOX_COUNT,
    MAX_BOX_DEPTH,
};
use crate::{Cursor, MetaData};

use super::{
    BlockChunking, BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat, ScanResult,
    ScanStatus,
};

const BOX_IINF: FourCc = FourCc::new(b"iinf");
const BOX_ILOC: FourCc = FourCc::new(b"iloc");
const BOX_IDAT: FourCc = FourCc::new(b"idat");
const BOX_INFE: FourCc = FourCc::new(b"infe");
const ITEM_EXIF: FourCc = FourCc::new(b"Exif");
const ITEM_MIME: FourCc = FourCc::new(b"mime");
const ITEM_JUMB: FourCc = FourCc::new(b"jumb");

const MIME_XMP: &[u8] = b"application/rdf+xml";

/// At most this many `iloc` entries are indexed per `meta` box.
const MAX_LOCATED_ITEMS: usize = 256;

/// Scans an ISO-BMFF container and emits metadata items found within the
/// first `meta` box.
pub fn scan_bmff(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    let data = MetaData::new(bytes);
    let Some(ftyp) = parse_box(data, 0, data.len()) else {
        return ScanResult::UNSUPPORTED;
    };
    if ftyp.box_type != FOURCC_FTYP {
        return ScanResult::UNSUPPORTED;
    }
    let format = parse_ftyp(data, &ftyp)
        .map(|info| info.format)
        .unwrap_or(ContainerFormat::Unknown);

    let mut sink = BlockSink::new(out);
    let mut seen = 0u32;
    let status = match scan_tree(data, 0, data.len(), 0, format, &mut seen, &mut sink) {
        Ok(_) => ScanStatus::Ok,
        Err(()) => ScanStatus::Malformed,
    };

    // items are discovered in `iinf` order; report them in byte order
    let written = sink.written_mut();
    for i in 1..written.len() {
        let mut j = i;
        while j > 0 && written[j - 1].outer_offset > written[j].outer_offset {
            written.swap(j - 1, j);
            j -= 1;
        }
    }

    sink.finish(status)
}

/// Walk boxes looking for the first `meta`; returns `Ok(true)` once it has
/// been handled.
fn scan_tree(
    data: MetaData,
    mut offset: u64,
    end: u64,
    depth: u32,
    format: ContainerFormat,
    seen: &mut u32,
    sink: &mut BlockSink,
) -> Result<bool, ()> {
    if depth > MAX_BOX_DEPTH {
        return Err(());
    }

    while offset + 8 <= end {
        *seen += 1;
        if *seen > MAX_BOX_COUNT {
            return Err(());
        }
        let Some(parsed) = parse_box(data, offset, end) else {
            return Err(());
        };

        if parsed.box_type == FOURCC_META {
            scan_meta_items(data, &parsed, format, sink);
            return Ok(true);
        }
        if is_container_box(parsed.box_type) {
            let child_offset = parsed.payload_offset();
            let child_end = parsed.end();
            if child_offset < child_end
                && scan_tree(data, child_offset, child_end, depth + 1, format, seen, sink)?
            {
                return Ok(true);
            }
        }

        // box size is at least its header size, so this strictly increases
        offset = parsed.end();
    }
    Ok(false)
}

/// One indexed `iloc` entry, already resolved to a file-absolute range.
#[derive(Clone, Copy, Default)]
struct LocatedItem {
    item_id: u32,
    offset: u64,
    size: u64,
}

fn scan_meta_items(data: MetaData, meta: &BmffBox, format: ContainerFormat, sink: &mut BlockSink) {
    if meta.payload_size() < 4 {
        return;
    }
    let child_start = meta.payload_offset() + 4; // FullBox header
    let child_end = meta.end();

    let mut iinf = None;
    let mut iloc = None;
    let mut idat = None;
    let mut offset = child_start;
    let mut seen = 0u32;
    while offset + 8 <= child_end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            return;
        }
        let Some(child) = parse_box(data, offset, child_end) else {
            break;
        };
        match child.box_type {
            BOX_IINF => iinf = Some(child),
            BOX_ILOC => iloc = Some(child),
            BOX_IDAT => idat = Some(child),
            _ => {}
        }
        offset = child.end();
    }

    let (Some(iinf), Some(iloc)) = (iinf, iloc) else {
        return;
    };

    let mut located = [LocatedItem::default(); MAX_LOCATED_ITEMS];
    let located_count = index_item_locations(data, &iloc, idat.as_ref(), &mut located);
    let located = &located[..located_count];

    emit_interesting_items(data, &iinf, located, format, sink);
}

/// Read an `iloc` field whose width is declared in the header nibbles;
/// sizes other than 0, 4, and 8 are invalid.
fn read_sized(cursor: &mut Cursor, size: u8) -> Option<u64> {
    match size {
        0 => Some(0),
        4 => cursor.read_be::<u32>().map(u64::from),
        8 => cursor.read_be::<u64>(),
        _ => None,
    }
}

/// Parse `iloc` into a bounded table of file-absolute item ranges.
///
/// Only single-`extent`-resolvable items land in the table: construction
/// method 0 (file offsets) and method 1 (offsets into `idat`). Anything
/// unresolvable is skipped, and entries beyond the table capacity are
/// dropped.
fn index_item_locations(
    data: MetaData,
    iloc: &BmffBox,
    idat: Option<&BmffBox>,
    out: &mut [LocatedItem; MAX_LOCATED_ITEMS],
) -> usize {
    if iloc.payload_size() < 8 {
        return 0;
    }
    let payload_offset = iloc.payload_offset();

    let Some(version) = data.read_be_at::<u8>(payload_offset) else {
        return 0;
    };
    if version > 2 {
        return 0;
    }
    let Some(sizes) = data.read_be_at::<u8>(payload_offset + 4) else {
        return 0;
    };
    let offset_size = sizes >> 4;
    let length_size = sizes & 0x0F;
    let Some(more_sizes) = data.read_be_at::<u8>(payload_offset + 5) else {
        return 0;
    };
    let base_offset_size = more_sizes >> 4;
    let index_size = if version > 0 { more_sizes & 0x0F } else { 0 };

    // item records are confined to the iloc box
    let mut cursor = data.cursor(payload_offset + 6, iloc.end());
    let item_count = if version < 2 {
        match cursor.read_be::<u16>() {
            Some(count) => count as u32,
            None => return 0,
        }
    } else {
        match cursor.read_be::<u32>() {
            Some(count) => count,
            None => return 0,
        }
    };

    let mut written = 0usize;
    'items: for _ in 0..item_count.min(MAX_BOX_COUNT) {
        let item_id = if version < 2 {
            match cursor.read_be::<u16>() {
                Some(id) => id as u32,
                None => break,
            }
        } else {
            match cursor.read_be::<u32>() {
                Some(id) => id,
                None => break,
            }
        };

        let mut construction_method = 0u8;
        if version > 0 {
            let Some(word) = cursor.read_be::<u16>() else {
                break;
            };
            construction_method = (word & 0x0F) as u8;
        }
        cursor.skip(2); // data_reference_index
        let Some(base_offset) = read_sized(&mut cursor, base_offset_size) else {
            break;
        };
        let Some(extent_count) = cursor.read_be::<u16>() else {
            break;
        };

        let mut first_extent = None;
        for extent in 0..extent_count {
            cursor.skip(index_size as u64);
            let Some(extent_offset) = read_sized(&mut cursor, offset_size) else {
                break 'items;
            };
            let Some(extent_length) = read_sized(&mut cursor, length_size) else {
                break 'items;
            };
            if extent == 0 {
                first_extent = Some((extent_offset, extent_length));
            }
        }

        let Some((extent_offset, extent_length)) = first_extent else {
            continue;
        };
        let absolute = match construction_method {
            0 => base_offset.checked_add(extent_offset),
            1 => idat.and_then(|idat| {
                idat.payload_offset()
                    .checked_add(base_offset)
                    .and_then(|v| v.checked_add(extent_offset))
                    // idat-relative extents must stay inside idat
                    .filter(|v| {
                        v.checked_add(extent_length)
                            .is_some_and(|e| e <= idat.end())
                    })
            }),
            _ => None,
        };
        let Some(absolute) = absolute else {
            continue;
        };
        let in_range = absolute
            .checked_add(extent_length)
            .is_some_and(|end| end <= data.len());
        if !in_range || extent_length == 0 {
            continue;
        }

        if written < out.len() {
            out[written] = LocatedItem {
                item_id,
                offset: absolute,
                size: extent_length,
            };
            written += 1;
        }
    }
    written
}

fn find_located(located: &[LocatedItem], item_id: u32) -> Option<&LocatedItem> {
    located.iter().find(|item| item.item_id == item_id)
}

/// Walk `iinf` item entries and emit blocks for EXIF, XMP, and JUMBF items.
fn emit_interesting_items(
    data: MetaData,
    iinf: &BmffBox,
    located: &[LocatedItem],
    format: ContainerFormat,
    sink: &mut BlockSink,
) {
    if iinf.payload_size() < 4 {
        return;
    }
    let Some(version) = data.read_be_at::<u8>(iinf.payload_offset()) else {
        return;
    };
    let mut offset = iinf.payload_offset() + if version == 0 { 4 + 2 } else { 4 + 4 };
    let end = iinf.end();

    let mut seen = 0u32;
    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            return;
        }
        let Some(infe) = parse_box(data, offset, end) else {
            break;
        };
        if infe.box_type == BOX_INFE {
            emit_item(data, &infe, located, format, sink);
        }
        offset = infe.end();
    }
}

fn emit_item(
    data: MetaData,
    infe: &BmffBox,
    located: &[LocatedItem],
    format: ContainerFormat,
    sink: &mut BlockSink,
) {
    let payload_offset = infe.payload_offset();
    let Some(version) = data.read_be_at::<u8>(payload_offset) else {
        return;
    };
    // versions 0/1 predate item_type and never carry the items we emit
    if version < 2 {
        return;
    }
    let header_len = if version == 2 { 12 } else { 14 };
    if infe.payload_size() < header_len {
        return;
    }

    let (item_id, mut offset) = if version == 2 {
        match data.read_be_at::<u16>(payload_offset + 4) {
            Some(id) => (id as u32, payload_offset + 6),
            None => return,
        }
    } else {
        match data.read_be_at::<u32>(payload_offset + 4) {
            Some(id) => (id, payload_offset + 8),
            None => return,
        }
    };
    // item_protection_index
    offset += 2;
    let Some(item_type) = data.read_be_at::<u32>(offset) else {
        return;
    };
    let item_type = FourCc::from_u32(item_type);
    offset += 4;

    let kind = match item_type {
        ITEM_EXIF => ContainerBlockKind::Exif,
        ITEM_JUMB => ContainerBlockKind::Jumbf,
        ITEM_MIME => {
            // item_name, then content_type, both NUL-terminated
            let Some(name_end) = find_nul(data, offset, infe.end()) else {
                return;
            };
            let Some(content_end) = find_nul(data, name_end + 1, infe.end()) else {
                return;
            };
            let content_type = data.subrange(name_end + 1, content_end - (name_end + 1));
            if content_type != Some(MIME_XMP) {
                return;
            }
            ContainerBlockKind::Xmp
        }
        _ => return,
    };

    let Some(location) = find_located(located, item_id) else {
        return;
    };

    let mut block = ContainerBlockRef {
        format,
        kind,
        outer_offset: location.offset,
        outer_size: location.size,
        data_offset: location.offset,
        data_size: location.size,
        id: item_type.to_u32(),
        ..Default::default()
    };
    if kind == ContainerBlockKind::Exif {
        block.chunking = BlockChunking::BmffExifTiffOffsetU32Be;
        block.aux_u32 = data.read_be_at::<u32>(location.offset).unwrap_or(0);
    }
    sink.push(block);
}

/// Offset of the next NUL byte in `[offset, end)`, if any.
fn find_nul(data: MetaData, offset: u64, end: u64) -> Option<u64> {
    let stop = end.min(data.len());
    if offset > stop {
        return None;
    }
    data.subrange(offset, stop - offset)?
        .iter()
        .position(|b| *b == 0)
        .map(|pos| offset + pos as u64)
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

    fn full_box(box_type: &[u8; 4], version: u8, payload: &[u8]) -> Vec<u8> {
        let mut body = vec![version, 0, 0, 0];
        body.extend_from_slice(payload);
        boxed(box_type, &body)
    }

    fn heic_ftyp() -> Vec<u8> {
        let mut payload = b"heic".to_vec();
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(b"mif1");
        boxed(b"ftyp", &payload)
    }

    fn infe_v2(item_id: u16, item_type: &[u8; 4], name_and_mime: &[u8]) -> Vec<u8> {
        let mut payload = item_id.to_be_bytes().to_vec();
        payload.extend_from_slice(&0u16.to_be_bytes()); // protection
        payload.extend_from_slice(item_type);
        payload.extend_from_slice(name_and_mime);
        full_box(b"infe", 2, &payload)
    }

    /// iloc v0 with one item: 4-byte offsets/lengths, no base offset.
    fn iloc_one_item(item_id: u16, offset: u32, length: u32) -> Vec<u8> {
        let mut payload = vec![0x44, 0x00]; // offset_size=4, length_size=4, base=0
        payload.extend_from_slice(&1u16.to_be_bytes()); // item_count
        payload.extend_from_slice(&item_id.to_be_bytes());
        payload.extend_from_slice(&0u16.to_be_bytes()); // data_reference_index
        payload.extend_from_slice(&1u16.to_be_bytes()); // extent_count
        payload.extend_from_slice(&offset.to_be_bytes());
        payload.extend_from_slice(&length.to_be_bytes());
        full_box(b"iloc", 0, &payload)
    }

    #[test]
    fn resolves_exif_item_to_file_range() {
        // layout: ftyp, meta(iinf+iloc), mdat with the exif payload
        let ftyp = heic_ftyp();

        let infe = infe_v2(1, b"Exif", b"\0");
        let mut iinf_payload = 1u16.to_be_bytes().to_vec();
        iinf_payload.extend_from_slice(&infe);
        let iinf = full_box(b"iinf", 0, &iinf_payload);

        // exif payload: 4-byte tiff offset prefix then the tiff bytes
        let mut exif_payload = 4u32.to_be_bytes().to_vec();
        exif_payload.extend_from_slice(b"padII*\0....");

        let mut meta_children = iinf.clone();
        // iloc offset filled in after we know where mdat lands
        let meta_stub_len = |iloc: &[u8]| {
            let mut children = iinf.clone();
            children.extend_from_slice(iloc);
            let meta = full_box(b"meta", 0, &children);
            ftyp.len() + meta.len() + 8
        };
        let exif_file_offset = meta_stub_len(&iloc_one_item(1, 0, 0)) as u32;
        let iloc = iloc_one_item(1, exif_file_offset, exif_payload.len() as u32);
        meta_children.extend_from_slice(&iloc);
        let meta = full_box(b"meta", 0, &meta_children);

        let mut file = ftyp;
        file.extend_from_slice(&meta);
        file.extend_from_slice(&boxed(b"mdat", &exif_payload));

        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].format, ContainerFormat::Heif);
        assert_eq!(out[0].kind, ContainerBlockKind::Exif);
        assert_eq!(out[0].chunking, BlockChunking::BmffExifTiffOffsetU32Be);
        assert_eq!(out[0].aux_u32, 4);
        assert_eq!(out[0].data_offset, exif_file_offset as u64);
        assert_eq!(out[0].data_size, exif_payload.len() as u64);
    }

    #[test]
    fn resolves_mime_xmp_item() {
        let ftyp = heic_ftyp();
        let infe = infe_v2(7, b"mime", b"\0application/rdf+xml\0");
        let mut iinf_payload = 1u16.to_be_bytes().to_vec();
        iinf_payload.extend_from_slice(&infe);
        let iinf = full_box(b"iinf", 0, &iinf_payload);

        let xmp_payload = b"<x:xmpmeta/>";
        let mut children = iinf.clone();
        let probe_len = {
            let mut c = iinf.clone();
            c.extend_from_slice(&iloc_one_item(7, 0, 0));
            ftyp.len() + full_box(b"meta", 0, &c).len() + 8
        };
        children.extend_from_slice(&iloc_one_item(
            7,
            probe_len as u32,
            xmp_payload.len() as u32,
        ));
        let meta = full_box(b"meta", 0, &children);

        let mut file = ftyp;
        file.extend_from_slice(&meta);
        file.extend_from_slice(&boxed(b"mdat", xmp_payload));

        let mut out = [ContainerBlockRef::default(); 8];
        let result = scan_bmff(&file, &mut out);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Xmp);
        let data = &file[out[0].data_offset as usize..][..out[0].data_size as usize];
        assert_eq!(data, xmp_payload);
    }

    #[test]
    fn missing_meta_scans_to_nothing() {
        let mut file = heic_ftyp();
        file.extend_from_slice(&boxed(b"mdat", b"pixels"));
        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_bmff(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 0);
    }

    #[test]
    fn non_ftyp_start_is_unsupported() {
        let file = boxed(b"mdat", b"pixels");
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_bmff(&file, &mut out).status, ScanStatus::Unsupported);
    }

    #[test]
    fn box_size_escaping_parent_is_malformed() {
        let mut file = heic_ftyp();
        file.extend_from_slice(&9999u32.to_be_bytes());
        file.extend_from_slice(b"meta");
        let mut out = [ContainerBlockRef::default(); 4];
        assert_eq!(scan_bmff(&file, &mut out).status, ScanStatus::Malformed);
    }

    #[test]
    fn iloc_records_stay_confined_to_their_box() {
        // an iloc declaring more items than its payload holds must not
        // read location data out of the following box
        let ftyp = heic_ftyp();
        let infe = infe_v2(1, b"Exif", b"\0");
        let mut iinf_payload = 1u16.to_be_bytes().to_vec();
        iinf_payload.extend_from_slice(&infe);
        let iinf = full_box(b"iinf", 0, &iinf_payload);

        let mut iloc_payload = vec![0x44, 0x00];
        iloc_payload.extend_from_slice(&2u16.to_be_bytes()); // claims two items
        iloc_payload.extend_from_slice(&1u16.to_be_bytes()); // item 1 only
        iloc_payload.extend_from_slice(&0u16.to_be_bytes());
        iloc_payload.extend_from_slice(&1u16.to_be_bytes());
        iloc_payload.extend_from_slice(&0u32.to_be_bytes());
        iloc_payload.extend_from_slice(&0u32.to_be_bytes()); // zero length: dropped
        let iloc = full_box(b"iloc", 0, &iloc_payload);

        let mut children = iinf;
        children.extend_from_slice(&iloc);
        let meta = full_box(b"meta", 0, &children);

        let mut file = ftyp;
        file.extend_from_slice(&meta);
        file.extend_from_slice(&boxed(b"mdat", &[0xAB; 64]));

        let mut out = [ContainerBlockRef::default(); 4];
        let result = scan_bmff(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 0);
    }
}
