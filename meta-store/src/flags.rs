//! Flags attached to metadata entries.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Per-entry flags used during edits and provenance tracking.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryFlags(u8);

impl EntryFlags {
    pub const NONE: EntryFlags = EntryFlags(0);
    /// Entry is logically removed (kept for stable ids / provenance).
    pub const DELETED: EntryFlags = EntryFlags(1 << 0);
    /// Entry was modified or added relative to an origin snapshot.
    pub const DIRTY: EntryFlags = EntryFlags(1 << 1);
    /// Entry was derived from other data (e.g. BMFF summary fields).
    pub const DERIVED: EntryFlags = EntryFlags(1 << 2);

    /// `true` if any bit of `test` is present in `self`.
    pub const fn any(self, test: EntryFlags) -> bool {
        self.0 & test.0 != 0
    }

    /// `true` if every bit of `test` is present in `self`.
    pub const fn contains(self, test: EntryFlags) -> bool {
        self.0 & test.0 == test.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EntryFlags {
    type Output = EntryFlags;

    fn bitor(self, rhs: EntryFlags) -> EntryFlags {
        EntryFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntryFlags {
    fn bitor_assign(&mut self, rhs: EntryFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EntryFlags {
    type Output = EntryFlags;

    fn bitand(self, rhs: EntryFlags) -> EntryFlags {
        EntryFlags(self.0 & rhs.0)
    }
}

impl fmt::Debug for EntryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EntryFlags(NONE)");
        }
        let mut first = true;
        write!(f, "EntryFlags(")?;
        for (flag, name) in [
            (EntryFlags::DELETED, "DELETED"),
            (EntryFlags::DIRTY, "DIRTY"),
            (EntryFlags::DERIVED, "DERIVED"),
        ] {
            if self.any(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                first = false;
                write!(f, "{name}")?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_operations() {
        let flags = EntryFlags::DELETED | EntryFlags::DIRTY;
        assert!(flags.any(EntryFlags::DELETED));
        assert!(flags.contains(EntryFlags::DELETED | EntryFlags::DIRTY));
        assert!(!flags.any(EntryFlags::DERIVED));
        assert!(EntryFlags::NONE.is_empty());
    }

    #[test]
    fn or_assign() {
        let mut flags = EntryFlags::NONE;
        flags |= EntryFlags::DELETED | EntryFlags::DIRTY;
        assert!(flags.contains(EntryFlags::DIRTY));
    }
}
