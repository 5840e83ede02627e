//! The metadata store: entries, blocks, and lookup indices.

use std::cmp::Ordering;

use meta_types::ByteArena;

use crate::key::{compare_key, compare_key_view, MetaKey, MetaKeyView};
use crate::value::MetaValue;
use crate::EntryFlags;

pub type BlockId = u32;
pub type EntryId = u32;

pub const INVALID_BLOCK_ID: BlockId = u32::MAX;
pub const INVALID_ENTRY_ID: EntryId = u32::MAX;

/// The wire-format family a value came from (used for round-trip
/// encoding).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WireFamily {
    #[default]
    None,
    Tiff,
    Other,
}

/// Wire-format element type + family (e.g. TIFF type code 2 = ASCII).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireType {
    pub family: WireFamily,
    pub code: u16,
}

impl WireType {
    pub const fn new(family: WireFamily, code: u16) -> Self {
        WireType { family, code }
    }
}

/// Where an [`Entry`] came from inside the original container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    pub block: BlockId,
    pub order_in_block: u32,
    pub wire_type: WireType,
    pub wire_count: u32,
}

impl Default for Origin {
    fn default() -> Self {
        Origin {
            block: INVALID_BLOCK_ID,
            order_in_block: 0,
            wire_type: WireType::default(),
            wire_count: 0,
        }
    }
}

/// A single metadata entry (key/value) with provenance.
///
/// Duplicate keys are allowed and preserved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    pub key: MetaKey,
    pub value: MetaValue,
    pub origin: Origin,
    pub flags: EntryFlags,
}

/// Container-block identity associating [`Origin::block`] with its source.
///
/// The fields are scanner-assigned and opaque to the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockInfo {
    pub format: u32,
    pub container: u32,
    pub id: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct KeySpan {
    start: u32,
    count: u32,
    repr: EntryId,
}

#[derive(Clone, Copy, Debug, Default)]
struct BlockSpan {
    start: u32,
    count: u32,
}

/// Stores decoded metadata entries grouped into blocks.
///
/// Lifecycle:
/// - Build phase: [`add_block`](Self::add_block) and
///   [`add_entry`](Self::add_entry).
/// - [`finalize`](Self::finalize) builds the lookup indices; from then on
///   the store is read-only and build calls return the invalid-id
///   sentinels.
///
/// Indices:
/// - [`entries_in_block`](Self::entries_in_block) returns entries sorted
///   by [`Origin::order_in_block`].
/// - [`find_all`](Self::find_all) returns all entries matching a key
///   (duplicates preserved, tombstones excluded).
#[derive(Clone, Default)]
pub struct MetaStore {
    arena: ByteArena,
    entries: Vec<Entry>,
    blocks: Vec<BlockInfo>,

    entries_by_block: Vec<EntryId>,
    block_spans: Vec<BlockSpan>,

    entries_by_key: Vec<EntryId>,
    key_spans: Vec<KeySpan>,

    finalized: bool,
}

impl MetaStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn arena(&self) -> &ByteArena {
        &self.arena
    }

    /// The arena keys and values for this store are created against.
    pub fn arena_mut(&mut self) -> &mut ByteArena {
        &mut self.arena
    }

    /// Adds a new block and returns its id, or [`INVALID_BLOCK_ID`] after
    /// finalize.
    pub fn add_block(&mut self, info: BlockInfo) -> BlockId {
        if self.finalized {
            log::warn!("add_block called on a finalized store");
            return INVALID_BLOCK_ID;
        }
        let id = self.blocks.len() as BlockId;
        self.blocks.push(info);
        id
    }

    /// Appends an entry and returns its id, or [`INVALID_ENTRY_ID`] after
    /// finalize.
    pub fn add_entry(&mut self, entry: Entry) -> EntryId {
        if self.finalized {
            log::warn!("add_entry called on a finalized store");
            return INVALID_ENTRY_ID;
        }
        let id = self.entries.len() as EntryId;
        self.entries.push(entry);
        id
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Builds the lookup indices and marks the store finalized.
    pub fn finalize(&mut self) {
        self.clear_indices();
        self.rebuild_block_index();
        self.rebuild_key_index();
        self.finalized = true;
    }

    /// Rebuilds indices in place; idempotent, preserves entry ids.
    pub fn rehash(&mut self) {
        self.clear_indices();
        self.rebuild_block_index();
        self.rebuild_key_index();
        self.finalized = true;
    }

    pub fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    pub fn block_info(&self, id: BlockId) -> Option<&BlockInfo> {
        self.blocks.get(id as usize)
    }

    /// The full entry vector, including tombstoned entries (ids are
    /// stable).
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry by id, with no tombstone filter.
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id as usize)
    }

    /// All live entries in `block`, ordered by [`Origin::order_in_block`]
    /// (ties keep insertion order). Empty when out of range or not yet
    /// finalized.
    pub fn entries_in_block(&self, block: BlockId) -> &[EntryId] {
        let Some(span) = self.block_spans.get(block as usize) else {
            return &[];
        };
        let start = span.start as usize;
        let end = start + span.count as usize;
        self.entries_by_block.get(start..end).unwrap_or(&[])
    }

    /// All live entry ids matching `key`, duplicates preserved in
    /// insertion order. Empty when there is no match or the store is not
    /// finalized.
    ///
    /// This is a binary search over the distinct-key spans using each
    /// span's representative entry for the comparison.
    pub fn find_all(&self, key: &MetaKeyView) -> &[EntryId] {
        if !self.finalized || self.key_spans.is_empty() {
            return &[];
        }

        let mut lo = 0usize;
        let mut hi = self.key_spans.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let span = self.key_spans[mid];
            let repr = &self.entries[span.repr as usize];
            match compare_key_view(&self.arena, key, &repr.key) {
                Ordering::Equal => {
                    let start = span.start as usize;
                    let end = start + span.count as usize;
                    return self.entries_by_key.get(start..end).unwrap_or(&[]);
                }
                Ordering::Less => hi = mid,
                Ordering::Greater => lo = mid + 1,
            }
        }
        &[]
    }

    pub(crate) fn reset_for_edit(&mut self) {
        self.clear_indices();
        self.finalized = false;
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub(crate) fn blocks(&self) -> &[BlockInfo] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<BlockInfo> {
        &mut self.blocks
    }

    fn clear_indices(&mut self) {
        self.entries_by_block.clear();
        self.block_spans.clear();
        self.entries_by_key.clear();
        self.key_spans.clear();
    }

    fn live_entry_ids(&self) -> Vec<EntryId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.flags.any(EntryFlags::DELETED))
            .map(|(id, _)| id as EntryId)
            .collect()
    }

    fn rebuild_block_index(&mut self) {
        let block_count = self.blocks.len();
        let mut spans = vec![BlockSpan::default(); block_count];

        let entries = &self.entries;
        let mut ids = self.live_entry_ids();
        ids.sort_by(|&a, &b| {
            let ea = &entries[a as usize].origin;
            let eb = &entries[b as usize].origin;
            ea.block
                .cmp(&eb.block)
                .then(ea.order_in_block.cmp(&eb.order_in_block))
                .then(a.cmp(&b))
        });

        for (pos, &id) in ids.iter().enumerate() {
            let block = entries[id as usize].origin.block as usize;
            if block >= block_count {
                continue;
            }
            let span = &mut spans[block];
            if span.count == 0 {
                span.start = pos as u32;
            }
            span.count += 1;
        }

        // give empty blocks a stable start so spans stay monotonic
        let mut next_start = ids.len() as u32;
        for span in spans.iter_mut().rev() {
            if span.count == 0 {
                span.start = next_start;
            } else {
                next_start = span.start;
            }
        }

        self.entries_by_block = ids;
        self.block_spans = spans;
    }

    fn rebuild_key_index(&mut self) {
        let entries = &self.entries;
        let arena = &self.arena;
        let mut ids = self.live_entry_ids();
        ids.sort_by(|&a, &b| {
            compare_key(arena, &entries[a as usize].key, &entries[b as usize].key).then(a.cmp(&b))
        });

        let mut spans = Vec::new();
        if !ids.is_empty() {
            let mut run_start = 0u32;
            let mut run_repr = ids[0];
            for pos in 1..ids.len() as u32 {
                let current = ids[pos as usize];
                let cmp = compare_key(
                    arena,
                    &entries[run_repr as usize].key,
                    &entries[current as usize].key,
                );
                if cmp != Ordering::Equal {
                    spans.push(KeySpan {
                        start: run_start,
                        count: pos - run_start,
                        repr: run_repr,
                    });
                    run_start = pos;
                    run_repr = current;
                }
            }
            let end = ids.len() as u32;
            spans.push(KeySpan {
                start: run_start,
                count: end - run_start,
                repr: run_repr,
            });
        }

        self.entries_by_key = ids;
        self.key_spans = spans;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::TextEncoding;

    fn text_entry(store: &mut MetaStore, block: BlockId, order: u32, tag: u16, text: &str) -> Entry {
        let key = MetaKey::exif_tag(store.arena_mut(), "ifd0", tag);
        let value = MetaValue::text(store.arena_mut(), text, TextEncoding::Ascii);
        Entry {
            key,
            value,
            origin: Origin {
                block,
                order_in_block: order,
                wire_type: WireType::new(WireFamily::Tiff, 2),
                wire_count: text.len() as u32,
            },
            flags: EntryFlags::NONE,
        }
    }

    #[test]
    fn duplicate_keys_are_preserved_in_order() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let e1 = text_entry(&mut store, block, 0, 0x010F, "Canon");
        store.add_entry(e1);
        let e2 = text_entry(&mut store, block, 1, 0x010F, "CANON");
        store.add_entry(e2);
        store.finalize();

        let key = MetaKeyView::ExifTag {
            ifd: "ifd0",
            tag: 0x010F,
        };
        let ids = store.find_all(&key);
        assert_eq!(ids, &[0, 1]);
    }

    #[test]
    fn block_entries_are_ordered_by_origin() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let a = text_entry(&mut store, block, 10, 0x010F, "A");
        store.add_entry(a);
        let b = text_entry(&mut store, block, 0, 0x0110, "B");
        store.add_entry(b);
        let c = text_entry(&mut store, block, 5, 0x0111, "C");
        store.add_entry(c);
        store.finalize();

        assert_eq!(store.entries_in_block(block), &[1, 2, 0]);
    }

    #[test]
    fn lookup_misses_return_empty() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let entry = text_entry(&mut store, block, 0, 0x010F, "Canon");
        store.add_entry(entry);
        store.finalize();

        let miss = MetaKeyView::ExifTag {
            ifd: "ifd0",
            tag: 0x0110,
        };
        assert!(store.find_all(&miss).is_empty());
        let other_variant = MetaKeyView::GeotiffKey { key_id: 0x010F };
        assert!(store.find_all(&other_variant).is_empty());
        assert!(store.entries_in_block(99).is_empty());
        assert!(store.entry(99).is_none());
    }

    #[test]
    fn lookup_before_finalize_is_empty() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let entry = text_entry(&mut store, block, 0, 0x010F, "Canon");
        store.add_entry(entry);

        let key = MetaKeyView::ExifTag {
            ifd: "ifd0",
            tag: 0x010F,
        };
        assert!(store.find_all(&key).is_empty());
    }

    #[test]
    fn build_after_finalize_returns_invalid_ids() {
        let mut store = MetaStore::new();
        store.finalize();
        assert_eq!(store.add_block(BlockInfo::default()), INVALID_BLOCK_ID);
        assert_eq!(store.add_entry(Entry::default()), INVALID_ENTRY_ID);
    }

    #[test]
    fn index_coverage_over_many_keys() {
        let mut store = MetaStore::new();
        let block_a = store.add_block(BlockInfo::default());
        let block_b = store.add_block(BlockInfo::default());
        for i in 0..50u16 {
            let block = if i % 2 == 0 { block_a } else { block_b };
            let entry = text_entry(&mut store, block, u32::from(50 - i), i % 7, "v");
            store.add_entry(entry);
        }
        store.finalize();

        let by_block: usize = (0..store.block_count())
            .map(|b| store.entries_in_block(b).len())
            .sum();
        assert_eq!(by_block, 50);

        let by_key: usize = (0..7u16)
            .map(|tag| {
                store
                    .find_all(&MetaKeyView::ExifTag { ifd: "ifd0", tag })
                    .len()
            })
            .sum();
        assert_eq!(by_key, 50);

        // per-block order is non-decreasing
        for b in 0..store.block_count() {
            let orders: Vec<u32> = store
                .entries_in_block(b)
                .iter()
                .map(|&id| store.entry(id).unwrap().origin.order_in_block)
                .collect();
            assert!(orders.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn rehash_is_idempotent() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let entry = text_entry(&mut store, block, 0, 0x010F, "Canon");
        store.add_entry(entry);
        store.finalize();

        let before = store.entries_in_block(block).to_vec();
        store.rehash();
        assert_eq!(store.entries_in_block(block), &before[..]);
        assert!(store.is_finalized());
    }

    #[test]
    fn wire_type_is_preserved() {
        let mut store = MetaStore::new();
        let block = store.add_block(BlockInfo::default());
        let key = MetaKey::exif_tag(store.arena_mut(), "ifd0", 0x010E);
        let value = MetaValue::text(store.arena_mut(), "Привет", TextEncoding::Utf8);
        let id = store.add_entry(Entry {
            key,
            value,
            origin: Origin {
                block,
                order_in_block: 0,
                wire_type: WireType::new(WireFamily::Tiff, 129),
                wire_count: "Привет".len() as u32,
            },
            flags: EntryFlags::NONE,
        });
        store.finalize();

        let entry = store.entry(id).unwrap();
        assert_eq!(entry.origin.wire_type.code, 129);
        match entry.value {
            MetaValue::Text { encoding, .. } => assert_eq!(encoding, TextEncoding::Utf8),
            _ => panic!("expected text value"),
        }
    }
}
