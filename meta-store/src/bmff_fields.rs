//! Projecting a BMFF meta-box walk into derived store entries.
//!
//! The walker in `read-meta` reduces a HEIF/AVIF/CR3 file to a bounded
//! summary of its primary-item graph; this module turns that summary into
//! `BmffField` entries, flagged [`EntryFlags::DERIVED`], in a fixed
//! emission order so downstream consumers see a stable field sequence.

use read_meta::bmff::walk::{
    summarize, AuxItemInfo, PrimarySummary, SubtypeInterpretation, SubtypeKind,
};

use crate::store::{BlockId, BlockInfo, Entry, MetaStore, Origin, WireFamily, WireType};
use crate::value::{MetaValue, TextEncoding};
use crate::{EntryFlags, MetaKey, INVALID_BLOCK_ID};

const FOURCC_AUXL: u32 = u32::from_be_bytes(*b"auxl");

struct FieldWriter<'a> {
    store: &'a mut MetaStore,
    block: BlockId,
    order: u32,
}

impl FieldWriter<'_> {
    fn emit(&mut self, field: &str, value: MetaValue, wire_count: u32) {
        let key = MetaKey::bmff_field(self.store.arena_mut(), field);
        self.store.add_entry(Entry {
            key,
            value,
            origin: Origin {
                block: self.block,
                order_in_block: self.order,
                wire_type: WireType::new(WireFamily::Other, 0),
                wire_count,
            },
            flags: EntryFlags::DERIVED,
        });
        self.order += 1;
    }

    fn emit_u32(&mut self, field: &str, value: u32) {
        self.emit(field, MetaValue::u32(value), 1);
    }

    fn emit_u16(&mut self, field: &str, value: u16) {
        self.emit(field, MetaValue::u16(value), 1);
    }

    fn emit_u8(&mut self, field: &str, value: u8) {
        self.emit(field, MetaValue::u8(value), 1);
    }

    fn emit_text(&mut self, field: &str, value: &str) {
        let value = MetaValue::text(self.store.arena_mut(), value, TextEncoding::Ascii);
        self.emit(field, value, 1);
    }

    fn emit_text_bytes(&mut self, field: &str, value: &[u8]) {
        let value = MetaValue::text_bytes(self.store.arena_mut(), value, TextEncoding::Ascii);
        self.emit(field, value, 1);
    }

    fn emit_u32_array(&mut self, field: &str, values: &[u32]) {
        let value = MetaValue::u32_array(self.store.arena_mut(), values);
        self.emit(field, value, values.len() as u32);
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push(char::from_digit((byte >> 4) as u32, 16).unwrap().to_ascii_uppercase());
        out.push(char::from_digit((byte & 0xF) as u32, 16).unwrap().to_ascii_uppercase());
    }
    out
}

fn uuid_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().take(16).enumerate() {
        out.push(char::from_digit((byte >> 4) as u32, 16).unwrap().to_ascii_uppercase());
        out.push(char::from_digit((byte & 0xF) as u32, 16).unwrap().to_ascii_uppercase());
        if matches!(i, 3 | 5 | 7 | 9) {
            out.push('-');
        }
    }
    out
}

/// Emit the subtype presentation set under `prefix` (`.subtype_kind`,
/// optional `.subtype_text`/`.subtype_u32`, and `.subtype_hex`).
fn emit_subtype(writer: &mut FieldWriter, prefix: &str, info: &AuxItemInfo) {
    let interp: SubtypeInterpretation = info.interpret_subtype();
    writer.emit_text(&format!("{prefix}.subtype_kind"), interp.kind.name());
    match interp.kind {
        SubtypeKind::FourCc | SubtypeKind::Ascii => {
            writer.emit_text_bytes(&format!("{prefix}.subtype_text"), info.aux_subtype());
        }
        SubtypeKind::Uuid => {
            let text = uuid_string(info.aux_subtype());
            writer.emit_text(&format!("{prefix}.subtype_text"), &text);
        }
        _ => {}
    }
    if let Some(value) = interp.value {
        writer.emit_u32(&format!("{prefix}.subtype_u32"), value);
    }
    let hex = hex_string(info.aux_subtype());
    writer.emit_text(&format!("{prefix}.subtype_hex"), &hex);
}

/// Walk `bytes` as a BMFF file and append derived fields to `store`.
///
/// Nothing is added unless the file carries a recognized `ftyp`; primary
/// item fields additionally require a decodable `meta` box. The caller is
/// responsible for calling [`MetaStore::finalize`] afterwards.
pub fn derive_bmff_fields(bytes: &[u8], store: &mut MetaStore) {
    let Some(summary) = summarize(bytes) else {
        return;
    };

    let block = store.add_block(BlockInfo::default());
    if block == INVALID_BLOCK_ID {
        return;
    }
    let mut writer = FieldWriter {
        store,
        block,
        order: 0,
    };

    writer.emit_u32("ftyp.major_brand", summary.ftyp.major_brand);
    writer.emit_u32("ftyp.minor_version", summary.ftyp.minor_version);
    let compat = &summary.ftyp.compat_brands[..summary.ftyp.compat_count as usize];
    if !compat.is_empty() {
        writer.emit_u32_array("ftyp.compat_brands", compat);
    }

    let Some(primary) = summary.primary else {
        return;
    };
    emit_primary(&mut writer, &primary);
}

fn emit_primary(writer: &mut FieldWriter, primary: &PrimarySummary) {
    writer.emit_u32("meta.primary_item_id", primary.item_id);
    if let Some((width, height)) = primary.width_height {
        writer.emit_u32("primary.width", width);
        writer.emit_u32("primary.height", height);
    }
    if let Some(rotation) = primary.rotation_degrees {
        writer.emit_u16("primary.rotation_degrees", rotation);
    }
    if let Some(mirror) = primary.mirror {
        writer.emit_u8("primary.mirror", mirror);
    }

    if primary.edge_total == 0 {
        return;
    }

    writer.emit_u32("iref.edge_count", primary.edge_total);
    if primary.edges_truncated {
        writer.emit_u8("iref.edge_truncated", 1);
    }

    for edge in primary.edges() {
        writer.emit_u32("iref.ref_type", edge.ref_type.to_u32());
        writer.emit_u32("iref.from_item_id", edge.from_item_id);
        writer.emit_u32("iref.to_item_id", edge.to_item_id);
        if edge.ref_type.to_u32() != FOURCC_AUXL {
            continue;
        }

        writer.emit_u32("iref.auxl.from_item_id", edge.from_item_id);
        writer.emit_u32("iref.auxl.to_item_id", edge.to_item_id);
        writer.emit_text(
            "iref.auxl.semantic",
            primary.aux_semantic(edge.to_item_id).name(),
        );
        if let Some(info) = primary.aux_item(edge.to_item_id) {
            if !info.aux_type().is_empty() {
                writer.emit_text_bytes("iref.auxl.type", info.aux_type());
            }
            if !info.aux_subtype().is_empty() {
                emit_subtype(writer, "iref.auxl", info);
            }
        }
    }

    for info in primary.aux_items() {
        writer.emit_u32("aux.item_id", info.item_id);
        writer.emit_text("aux.semantic", info.semantic.name());
        if !info.aux_type().is_empty() {
            writer.emit_text_bytes("aux.type", info.aux_type());
        }
        if !info.aux_subtype().is_empty() {
            emit_subtype(writer, "aux", info);
            writer.emit_u32("aux.subtype_len", u32::from(info.aux_subtype_total_len));
            if info.aux_subtype_truncated {
                writer.emit_u8("aux.subtype_truncated", 1);
            }
        }
    }

    for (item_id, semantic) in primary
        .auxl_item_ids()
        .iter()
        .zip(primary.auxl_item_semantics())
    {
        writer.emit_u32("primary.auxl_item_id", *item_id);
        writer.emit_text("primary.auxl_semantic", semantic.name());
    }
    for item_id in primary.alpha_item_ids() {
        writer.emit_u32("primary.alpha_item_id", *item_id);
    }
    for item_id in primary.depth_item_ids() {
        writer.emit_u32("primary.depth_item_id", *item_id);
    }
    for item_id in primary.disparity_item_ids() {
        writer.emit_u32("primary.disparity_item_id", *item_id);
    }
    for item_id in primary.matte_item_ids() {
        writer.emit_u32("primary.matte_item_id", *item_id);
    }
    for item_id in primary.dimg_item_ids() {
        writer.emit_u32("primary.dimg_item_id", *item_id);
    }
    for item_id in primary.thmb_item_ids() {
        writer.emit_u32("primary.thmb_item_id", *item_id);
    }
    for item_id in primary.cdsc_item_ids() {
        writer.emit_u32("primary.cdsc_item_id", *item_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetaKeyView;
    use meta_test_data::bmff::{self, BmffFileBuilder};

    fn bmff_key(field: &str) -> MetaKeyView {
        MetaKeyView::BmffField { field }
    }

    fn u32_values(store: &MetaStore, field: &str) -> Vec<u32> {
        store
            .find_all(&bmff_key(field))
            .iter()
            .filter_map(|&id| store.entry(id)?.value.as_u32())
            .collect()
    }

    fn text_values<'a>(store: &'a MetaStore, field: &str) -> Vec<&'a str> {
        store
            .find_all(&bmff_key(field))
            .iter()
            .filter_map(|&id| store.entry(id)?.value.text_str(store.arena()))
            .collect()
    }

    #[test]
    fn emits_ftyp_and_primary_props() {
        let file = BmffFileBuilder::new()
            .ftyp(b"heic", 0, &[*b"mif1"])
            .meta(
                bmff::MetaBoxBuilder::new()
                    .pitm(1)
                    .ipco(&[bmff::ispe(640, 480), bmff::irot(1)])
                    .ipma(1, &[1, 2]),
            )
            .build();

        let mut store = MetaStore::new();
        derive_bmff_fields(&file, &mut store);
        store.finalize();

        assert_eq!(
            u32_values(&store, "ftyp.major_brand"),
            vec![u32::from_be_bytes(*b"heic")]
        );
        assert_eq!(u32_values(&store, "ftyp.minor_version"), vec![0]);
        assert_eq!(u32_values(&store, "meta.primary_item_id"), vec![1]);
        assert_eq!(u32_values(&store, "primary.width"), vec![640]);
        assert_eq!(u32_values(&store, "primary.height"), vec![480]);

        let rotation = store.find_all(&bmff_key("primary.rotation_degrees"));
        assert_eq!(rotation.len(), 1);
        let entry = store.entry(rotation[0]).unwrap();
        assert_eq!(entry.value, MetaValue::u16(90));
        assert!(entry.flags.contains(EntryFlags::DERIVED));

        let compat = store.find_all(&bmff_key("ftyp.compat_brands"));
        assert_eq!(compat.len(), 1);
        let brands: &[u32] = store
            .entry(compat[0])
            .unwrap()
            .value
            .array_as(store.arena())
            .unwrap();
        assert_eq!(brands, &[u32::from_be_bytes(*b"mif1")]);
    }

    #[test]
    fn emits_iref_edges_and_auxl_buckets() {
        let file = BmffFileBuilder::new()
            .ftyp(b"heic", 0, &[*b"mif1"])
            .meta(
                bmff::MetaBoxBuilder::new()
                    .pitm(1)
                    .iref_auxl(1, &[2, 3]),
            )
            .build();

        let mut store = MetaStore::new();
        derive_bmff_fields(&file, &mut store);
        store.finalize();

        assert_eq!(u32_values(&store, "iref.edge_count"), vec![2]);
        assert_eq!(
            u32_values(&store, "iref.ref_type"),
            vec![FOURCC_AUXL, FOURCC_AUXL]
        );
        assert_eq!(u32_values(&store, "iref.from_item_id"), vec![1, 1]);
        assert_eq!(u32_values(&store, "iref.to_item_id"), vec![2, 3]);
        assert_eq!(u32_values(&store, "primary.auxl_item_id"), vec![2, 3]);
        assert_eq!(
            text_values(&store, "primary.auxl_semantic"),
            vec!["unknown", "unknown"]
        );
        assert!(u32_values(&store, "primary.alpha_item_id").is_empty());
    }

    #[test]
    fn alpha_semantic_reaches_typed_bucket() {
        let file = BmffFileBuilder::new()
            .ftyp(b"heic", 0, &[*b"mif1"])
            .meta(
                bmff::MetaBoxBuilder::new()
                    .pitm(1)
                    .iref_auxl(1, &[2])
                    .ipco(&[bmff::auxc("urn:mpeg:hevc:2015:auxid:1", &[])])
                    .ipma(2, &[1]),
            )
            .build();

        let mut store = MetaStore::new();
        derive_bmff_fields(&file, &mut store);
        store.finalize();

        assert_eq!(u32_values(&store, "primary.alpha_item_id"), vec![2]);
        assert_eq!(text_values(&store, "primary.auxl_semantic"), vec!["alpha"]);
        assert_eq!(u32_values(&store, "aux.item_id"), vec![2]);
        assert_eq!(text_values(&store, "aux.semantic"), vec!["alpha"]);
        assert_eq!(
            text_values(&store, "iref.auxl.semantic"),
            vec!["alpha"]
        );
        assert_eq!(
            text_values(&store, "aux.type"),
            vec!["urn:mpeg:hevc:2015:auxid:1"]
        );
    }

    #[test]
    fn non_bmff_bytes_add_nothing() {
        let mut store = MetaStore::new();
        derive_bmff_fields(b"GIF89a not bmff", &mut store);
        store.finalize();
        assert!(store.entries().is_empty());
        assert_eq!(store.block_count(), 0);
    }
}
