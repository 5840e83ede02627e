//! The structural edit pipeline: pure, snapshot-producing edits.
//!
//! A [`MetaEdit`] collects operations against a base store without
//! touching it; [`commit`] replays them onto a copy and [`compact`] drops
//! tombstones. Both deep-copy keys and values into the new store's arena
//! so every snapshot is self-contained.

use meta_types::ByteArena;

use crate::store::{Entry, EntryId, MetaStore};
use crate::value::MetaValue;
use crate::EntryFlags;

/// One edit operation. Keys/values inside ops reference the owning
/// [`MetaEdit`]'s arena.
#[derive(Clone, Copy, Debug)]
pub enum EditOp {
    AddEntry { entry: Entry },
    SetValue { target: EntryId, value: MetaValue },
    Tombstone { target: EntryId },
}

/// An ordered list of edit operations plus the arena their strings and
/// payloads live in.
#[derive(Clone, Default)]
pub struct MetaEdit {
    arena: ByteArena,
    ops: Vec<EditOp>,
}

impl MetaEdit {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn arena(&self) -> &ByteArena {
        &self.arena
    }

    /// The arena to create keys/values for this edit against.
    pub fn arena_mut(&mut self) -> &mut ByteArena {
        &mut self.arena
    }

    pub fn reserve_ops(&mut self, count: usize) {
        self.ops.reserve(count);
    }

    /// Append `entry` to the store on commit.
    pub fn add_entry(&mut self, entry: Entry) {
        self.ops.push(EditOp::AddEntry { entry });
    }

    /// Replace `target`'s value on commit; its key is left untouched.
    pub fn set_value(&mut self, target: EntryId, value: MetaValue) {
        self.ops.push(EditOp::SetValue { target, value });
    }

    /// Mark `target` deleted on commit. The entry keeps its id and stays
    /// addressable; it just disappears from the indices.
    pub fn tombstone(&mut self, target: EntryId) {
        self.ops.push(EditOp::Tombstone { target });
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }
}

fn copy_value(value: &MetaValue, src: &ByteArena, dst: &mut ByteArena) -> MetaValue {
    match *value {
        MetaValue::Array {
            elem_type,
            count,
            span,
        } => {
            let bytes = src.span(span);
            let copied = dst.allocate(bytes.len() as u32, elem_type.alignment());
            dst.span_mut(copied).copy_from_slice(bytes);
            MetaValue::Array {
                elem_type,
                count,
                span: copied,
            }
        }
        MetaValue::Bytes { span, count } => MetaValue::Bytes {
            span: dst.append(src.span(span)),
            count,
        },
        MetaValue::Text {
            span,
            count,
            encoding,
        } => MetaValue::Text {
            span: dst.append(src.span(span)),
            count,
            encoding,
        },
        other => other,
    }
}

fn copy_entry(entry: &Entry, src: &ByteArena, dst: &mut ByteArena) -> Entry {
    Entry {
        key: entry.key.deep_copy(src, dst),
        value: copy_value(&entry.value, src, dst),
        origin: entry.origin,
        flags: entry.flags,
    }
}

/// Apply `edits` to a copy of `base` and return the finalized result.
///
/// Edits apply in slice order; within one [`MetaEdit`], ops apply in the
/// order they were recorded. Added entries and replaced values are
/// deep-copied into the new store's arena. Out-of-range targets are
/// ignored (a tombstone racing a compact is common).
pub fn commit(base: &MetaStore, edits: &[MetaEdit]) -> MetaStore {
    let mut out = base.clone();
    out.reset_for_edit();

    for edit in edits {
        for op in edit.ops() {
            match op {
                EditOp::AddEntry { entry } => {
                    let copied = copy_entry(entry, edit.arena(), out.arena_mut());
                    out.entries_mut().push(copied);
                }
                EditOp::SetValue { target, value } => {
                    let target = *target as usize;
                    if target >= out.entries_mut().len() {
                        log::warn!("set_value target {target} out of range, ignored");
                        continue;
                    }
                    let copied = copy_value(value, edit.arena(), out.arena_mut());
                    let entry = &mut out.entries_mut()[target];
                    entry.value = copied;
                    entry.flags |= EntryFlags::DIRTY;
                }
                EditOp::Tombstone { target } => {
                    let target = *target as usize;
                    if target >= out.entries_mut().len() {
                        log::warn!("tombstone target {target} out of range, ignored");
                        continue;
                    }
                    out.entries_mut()[target].flags |= EntryFlags::DELETED | EntryFlags::DIRTY;
                }
            }
        }
    }

    out.finalize();
    out
}

/// Produce a finalized copy of `base` with all tombstoned entries
/// removed, preserving the relative order of the rest.
///
/// Entry ids are renumbered; they are not stable across a compact.
pub fn compact(base: &MetaStore) -> MetaStore {
    let mut out = MetaStore::new();
    *out.blocks_mut() = base.blocks().to_vec();

    for entry in base.entries() {
        if entry.flags.any(EntryFlags::DELETED) {
            continue;
        }
        let copied = copy_entry(entry, base.arena(), out.arena_mut());
        out.entries_mut().push(copied);
    }

    out.finalize();
    out
}
