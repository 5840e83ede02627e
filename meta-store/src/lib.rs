//! A normalized, arena-backed store of image-file metadata.
//!
//! Decoders push `(key, value, provenance)` entries into a [`MetaStore`]
//! during its build phase; [`MetaStore::finalize`] then builds block- and
//! key-ordered indices for read-only queries. Edits never mutate a
//! finalized store: [`commit`] and [`compact`] produce new snapshots.
//!
//! Strings and payloads live in a per-store [`ByteArena`] and are named by
//! `(offset, len)` spans, so stores are plain movable values and the deep
//! copy performed by the edit pipeline is a re-append.

#![deny(rustdoc::broken_intra_doc_links)]

mod bmff_fields;
mod edit;
mod flags;
mod key;
pub mod names;
mod store;
mod value;

pub use bmff_fields::derive_bmff_fields;
pub use edit::{commit, compact, EditOp, MetaEdit};
pub use flags::EntryFlags;
pub use key::{compare_key, compare_key_view, MetaKey, MetaKeyView};
pub use store::{
    BlockId, BlockInfo, Entry, EntryId, MetaStore, Origin, WireFamily, WireType, INVALID_BLOCK_ID,
    INVALID_ENTRY_ID,
};
pub use value::{MetaElementType, MetaValue, TextEncoding};

pub use meta_types::{ByteArena, ByteSpan};
