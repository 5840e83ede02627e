//! Normalized key identifiers for metadata entries.
//!
//! Every metadata namespace gets a [`MetaKey`] variant; variant order is
//! the primary sort key, so it is part of the API contract and new
//! variants go at the end.

use std::cmp::Ordering;

use meta_types::{ByteArena, ByteSpan};

/// An owned metadata key.
///
/// String-like parts are arena spans, so a key is a small plain value and
/// a store's keys are compact. Keys only make sense together with the
/// arena they were created against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaKey {
    /// An EXIF/TIFF tag within a named IFD token (e.g. `ifd0`, `exififd`,
    /// or an `mk_`-prefixed MakerNote pseudo-IFD).
    ExifTag { ifd: ByteSpan, tag: u16 },
    /// An IPTC-IIM record/dataset pair.
    IptcDataset { record: u16, dataset: u16 },
    /// An XMP property under a schema namespace.
    XmpProperty {
        schema_ns: ByteSpan,
        property_path: ByteSpan,
    },
    /// A fixed-offset ICC profile header field.
    IccHeaderField { offset: u32 },
    /// An ICC tag table entry.
    IccTag { signature: u32 },
    /// A Photoshop image resource block id.
    PhotoshopIrb { resource_id: u16 },
    /// A GeoTIFF key id.
    GeotiffKey { key_id: u16 },
    /// A named PrintIM field.
    PrintImField { field: ByteSpan },
    /// A named field derived from BMFF structure.
    BmffField { field: ByteSpan },
    /// A named JUMBF box field.
    JumbfField { field: ByteSpan },
    /// A key inside a JUMBF-carried CBOR map.
    JumbfCborKey { key: ByteSpan },
}

/// A borrowed metadata key, for lookups without touching an arena.
///
/// Compares against [`MetaKey`] with the same total order; see
/// [`compare_key_view`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKeyView<'a> {
    ExifTag { ifd: &'a str, tag: u16 },
    IptcDataset { record: u16, dataset: u16 },
    XmpProperty {
        schema_ns: &'a str,
        property_path: &'a str,
    },
    IccHeaderField { offset: u32 },
    IccTag { signature: u32 },
    PhotoshopIrb { resource_id: u16 },
    GeotiffKey { key_id: u16 },
    PrintImField { field: &'a str },
    BmffField { field: &'a str },
    JumbfField { field: &'a str },
    JumbfCborKey { key: &'a str },
}

impl MetaKey {
    pub fn exif_tag(arena: &mut ByteArena, ifd: &str, tag: u16) -> MetaKey {
        MetaKey::ExifTag {
            ifd: arena.append_str(ifd),
            tag,
        }
    }

    pub fn xmp_property(arena: &mut ByteArena, schema_ns: &str, property_path: &str) -> MetaKey {
        MetaKey::XmpProperty {
            schema_ns: arena.append_str(schema_ns),
            property_path: arena.append_str(property_path),
        }
    }

    pub fn printim_field(arena: &mut ByteArena, field: &str) -> MetaKey {
        MetaKey::PrintImField {
            field: arena.append_str(field),
        }
    }

    pub fn bmff_field(arena: &mut ByteArena, field: &str) -> MetaKey {
        MetaKey::BmffField {
            field: arena.append_str(field),
        }
    }

    pub fn jumbf_field(arena: &mut ByteArena, field: &str) -> MetaKey {
        MetaKey::JumbfField {
            field: arena.append_str(field),
        }
    }

    pub fn jumbf_cbor_key(arena: &mut ByteArena, key: &str) -> MetaKey {
        MetaKey::JumbfCborKey {
            key: arena.append_str(key),
        }
    }

    /// Re-append any arena-backed fields into `dst`, producing a key valid
    /// against that arena.
    pub(crate) fn deep_copy(&self, src: &ByteArena, dst: &mut ByteArena) -> MetaKey {
        let copy = |dst: &mut ByteArena, span: ByteSpan| {
            let bytes = src.span(span);
            dst.append(bytes)
        };
        match *self {
            MetaKey::ExifTag { ifd, tag } => MetaKey::ExifTag {
                ifd: copy(dst, ifd),
                tag,
            },
            MetaKey::XmpProperty {
                schema_ns,
                property_path,
            } => MetaKey::XmpProperty {
                schema_ns: copy(dst, schema_ns),
                property_path: copy(dst, property_path),
            },
            MetaKey::PrintImField { field } => MetaKey::PrintImField {
                field: copy(dst, field),
            },
            MetaKey::BmffField { field } => MetaKey::BmffField {
                field: copy(dst, field),
            },
            MetaKey::JumbfField { field } => MetaKey::JumbfField {
                field: copy(dst, field),
            },
            MetaKey::JumbfCborKey { key } => MetaKey::JumbfCborKey {
                key: copy(dst, key),
            },
            other => other,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MetaKey::ExifTag { .. } => 0,
            MetaKey::IptcDataset { .. } => 1,
            MetaKey::XmpProperty { .. } => 2,
            MetaKey::IccHeaderField { .. } => 3,
            MetaKey::IccTag { .. } => 4,
            MetaKey::PhotoshopIrb { .. } => 5,
            MetaKey::GeotiffKey { .. } => 6,
            MetaKey::PrintImField { .. } => 7,
            MetaKey::BmffField { .. } => 8,
            MetaKey::JumbfField { .. } => 9,
            MetaKey::JumbfCborKey { .. } => 10,
        }
    }
}

impl MetaKeyView<'_> {
    fn rank(&self) -> u8 {
        match self {
            MetaKeyView::ExifTag { .. } => 0,
            MetaKeyView::IptcDataset { .. } => 1,
            MetaKeyView::XmpProperty { .. } => 2,
            MetaKeyView::IccHeaderField { .. } => 3,
            MetaKeyView::IccTag { .. } => 4,
            MetaKeyView::PhotoshopIrb { .. } => 5,
            MetaKeyView::GeotiffKey { .. } => 6,
            MetaKeyView::PrintImField { .. } => 7,
            MetaKeyView::BmffField { .. } => 8,
            MetaKeyView::JumbfField { .. } => 9,
            MetaKeyView::JumbfCborKey { .. } => 10,
        }
    }
}

/// Order two owned keys resolved against `arena`.
///
/// The variant is the primary key; within a variant, fields compare in
/// declaration order, strings by byte.
pub fn compare_key(arena: &ByteArena, a: &MetaKey, b: &MetaKey) -> Ordering {
    let rank = a.rank().cmp(&b.rank());
    if rank != Ordering::Equal {
        return rank;
    }
    match (*a, *b) {
        (MetaKey::ExifTag { ifd: ifd_a, tag: tag_a }, MetaKey::ExifTag { ifd: ifd_b, tag: tag_b }) => {
            arena
                .span(ifd_a)
                .cmp(arena.span(ifd_b))
                .then(tag_a.cmp(&tag_b))
        }
        (
            MetaKey::IptcDataset {
                record: rec_a,
                dataset: ds_a,
            },
            MetaKey::IptcDataset {
                record: rec_b,
                dataset: ds_b,
            },
        ) => rec_a.cmp(&rec_b).then(ds_a.cmp(&ds_b)),
        (
            MetaKey::XmpProperty {
                schema_ns: ns_a,
                property_path: path_a,
            },
            MetaKey::XmpProperty {
                schema_ns: ns_b,
                property_path: path_b,
            },
        ) => arena
            .span(ns_a)
            .cmp(arena.span(ns_b))
            .then_with(|| arena.span(path_a).cmp(arena.span(path_b))),
        (MetaKey::IccHeaderField { offset: a }, MetaKey::IccHeaderField { offset: b }) => a.cmp(&b),
        (MetaKey::IccTag { signature: a }, MetaKey::IccTag { signature: b }) => a.cmp(&b),
        (MetaKey::PhotoshopIrb { resource_id: a }, MetaKey::PhotoshopIrb { resource_id: b }) => {
            a.cmp(&b)
        }
        (MetaKey::GeotiffKey { key_id: a }, MetaKey::GeotiffKey { key_id: b }) => a.cmp(&b),
        (MetaKey::PrintImField { field: a }, MetaKey::PrintImField { field: b })
        | (MetaKey::BmffField { field: a }, MetaKey::BmffField { field: b })
        | (MetaKey::JumbfField { field: a }, MetaKey::JumbfField { field: b })
        | (MetaKey::JumbfCborKey { key: a }, MetaKey::JumbfCborKey { key: b }) => {
            arena.span(a).cmp(arena.span(b))
        }
        _ => Ordering::Equal,
    }
}

/// Order a borrowed key against an owned key with the same total order as
/// [`compare_key`] applied to the view's materialized form.
pub fn compare_key_view(arena: &ByteArena, view: &MetaKeyView, owned: &MetaKey) -> Ordering {
    let rank = view.rank().cmp(&owned.rank());
    if rank != Ordering::Equal {
        return rank;
    }
    match (*view, *owned) {
        (
            MetaKeyView::ExifTag { ifd, tag },
            MetaKey::ExifTag {
                ifd: ifd_b,
                tag: tag_b,
            },
        ) => ifd
            .as_bytes()
            .cmp(arena.span(ifd_b))
            .then(tag.cmp(&tag_b)),
        (
            MetaKeyView::IptcDataset { record, dataset },
            MetaKey::IptcDataset {
                record: rec_b,
                dataset: ds_b,
            },
        ) => record.cmp(&rec_b).then(dataset.cmp(&ds_b)),
        (
            MetaKeyView::XmpProperty {
                schema_ns,
                property_path,
            },
            MetaKey::XmpProperty {
                schema_ns: ns_b,
                property_path: path_b,
            },
        ) => schema_ns
            .as_bytes()
            .cmp(arena.span(ns_b))
            .then_with(|| property_path.as_bytes().cmp(arena.span(path_b))),
        (MetaKeyView::IccHeaderField { offset }, MetaKey::IccHeaderField { offset: b }) => {
            offset.cmp(&b)
        }
        (MetaKeyView::IccTag { signature }, MetaKey::IccTag { signature: b }) => signature.cmp(&b),
        (MetaKeyView::PhotoshopIrb { resource_id }, MetaKey::PhotoshopIrb { resource_id: b }) => {
            resource_id.cmp(&b)
        }
        (MetaKeyView::GeotiffKey { key_id }, MetaKey::GeotiffKey { key_id: b }) => key_id.cmp(&b),
        (MetaKeyView::PrintImField { field }, MetaKey::PrintImField { field: b })
        | (MetaKeyView::BmffField { field }, MetaKey::BmffField { field: b })
        | (MetaKeyView::JumbfField { field }, MetaKey::JumbfField { field: b })
        | (MetaKeyView::JumbfCborKey { key: field }, MetaKey::JumbfCborKey { key: b }) => {
            field.as_bytes().cmp(arena.span(b))
        }
        _ => Ordering::Equal,
    }
}

impl Default for MetaKey {
    fn default() -> Self {
        MetaKey::ExifTag {
            ifd: ByteSpan::EMPTY,
            tag: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_order_is_primary() {
        let arena = ByteArena::new();
        let exif = MetaKey::ExifTag {
            ifd: ByteSpan::EMPTY,
            tag: 0xFFFF,
        };
        let iptc = MetaKey::IptcDataset {
            record: 0,
            dataset: 0,
        };
        assert_eq!(compare_key(&arena, &exif, &iptc), Ordering::Less);
        assert_eq!(compare_key(&arena, &iptc, &exif), Ordering::Greater);
    }

    #[test]
    fn exif_keys_compare_by_ifd_then_tag() {
        let mut arena = ByteArena::new();
        let a = MetaKey::exif_tag(&mut arena, "exififd", 0x9000);
        let b = MetaKey::exif_tag(&mut arena, "ifd0", 0x0100);
        let c = MetaKey::exif_tag(&mut arena, "ifd0", 0x0110);
        assert_eq!(compare_key(&arena, &a, &b), Ordering::Less);
        assert_eq!(compare_key(&arena, &b, &c), Ordering::Less);
        assert_eq!(compare_key(&arena, &c, &c), Ordering::Equal);
    }

    #[test]
    fn view_comparison_matches_owned() {
        let mut arena = ByteArena::new();
        let owned = MetaKey::exif_tag(&mut arena, "ifd0", 0x010F);
        let equal = MetaKeyView::ExifTag {
            ifd: "ifd0",
            tag: 0x010F,
        };
        let smaller = MetaKeyView::ExifTag {
            ifd: "ifd0",
            tag: 0x010E,
        };
        let other_ifd = MetaKeyView::ExifTag {
            ifd: "ifd1",
            tag: 0x010F,
        };
        assert_eq!(compare_key_view(&arena, &equal, &owned), Ordering::Equal);
        assert_eq!(compare_key_view(&arena, &smaller, &owned), Ordering::Less);
        assert_eq!(
            compare_key_view(&arena, &other_ifd, &owned),
            Ordering::Greater
        );
    }

    #[test]
    fn string_fields_compare_by_byte() {
        let mut arena = ByteArena::new();
        let a = MetaKey::bmff_field(&mut arena, "aux.item_id");
        let b = MetaKey::bmff_field(&mut arena, "aux.semantic");
        assert_eq!(compare_key(&arena, &a, &b), Ordering::Less);

        let view = MetaKeyView::BmffField { field: "aux.item_id" };
        assert_eq!(compare_key_view(&arena, &view, &a), Ordering::Equal);
    }

    #[test]
    fn deep_copy_rewrites_spans() {
        let mut src = ByteArena::new();
        let key = MetaKey::exif_tag(&mut src, "gpsifd", 0x0002);
        let mut dst = ByteArena::new();
        dst.append(b"noise");
        let copied = key.deep_copy(&src, &mut dst);
        match copied {
            MetaKey::ExifTag { ifd, tag } => {
                assert_eq!(dst.span(ifd), b"gpsifd");
                assert_eq!(tag, 0x0002);
                assert_ne!(ifd.offset, 0);
            }
            _ => panic!("variant changed in deep copy"),
        }
    }
}
