//! The path table's record types (§3). The teacher conflates `MergedInfo` and
//! `ConflictInfo` behind one allocation, discriminated by a `clean` flag; the spec's own
//! design notes (§9) call that out as a hazard and ask for a sum type instead, which is
//! what `Entry` is.

use crate::hash::Oid;
use crate::interner::DirName;
use crate::mode::Mode;

/// `{mode, oid}` identifying a single object at a single position (base/side1/side2).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub mode: Mode,
    pub oid: Oid,
}

impl VersionInfo {
    pub const NULL: Self = Self { mode: Mode::NULL, oid: Oid::UNKNOWN };

    pub fn is_null(self) -> bool {
        self.mode.is_null()
    }
}

/// indices into the three-element per-side arrays carried by [`ConflictInfo`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum Side {
    Base = 0,
    Side1 = 1,
    Side2 = 2,
}

pub const ALL_SIDES: [Side; 3] = [Side::Base, Side::Side1, Side::Side2];

/// the resolved form of a path (§3)
#[derive(Clone, Debug)]
pub struct MergedInfo {
    pub result: VersionInfo,
    pub directory_name: DirName,
    /// byte offset of this entry's basename within its full path (cheap slicing
    /// instead of re-splitting the path on every tree-writer step, §4.7)
    pub basename_offset: usize,
    pub is_null: bool,
    pub clean: bool,
}

impl MergedInfo {
    pub fn new(result: VersionInfo, directory_name: DirName, basename_offset: usize) -> Self {
        debug_assert!(!result.is_null(), "a null result must go through MergedInfo::null");
        Self { result, directory_name, basename_offset, is_null: false, clean: true }
    }

    pub fn null(directory_name: DirName, basename_offset: usize) -> Self {
        Self {
            result: VersionInfo::NULL,
            directory_name,
            basename_offset,
            is_null: true,
            clean: true,
        }
    }
}

bitflags::bitflags! {
    #[derive(Default)]
    pub struct SideMask: u8 {
        const BASE  = 1 << 0;
        const SIDE1 = 1 << 1;
        const SIDE2 = 1 << 2;
    }
}

impl SideMask {
    pub fn of(side: Side) -> Self {
        match side {
            Side::Base => SideMask::BASE,
            Side::Side1 => SideMask::SIDE1,
            Side::Side2 => SideMask::SIDE2,
        }
    }

    pub fn has(self, side: Side) -> bool {
        self.contains(Self::of(side))
    }

    pub fn count(self) -> u32 {
        self.bits().count_ones()
    }
}

/// which of `{base,side1}`, `{base,side2}`, `{side1,side2}` are byte-identical,
/// encoded exactly as the spec does: 3 (base==side1), 5 (base==side2), 6 (side1==side2)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct MatchMask(u8);

impl MatchMask {
    pub const NONE: Self = Self(0);
    pub const BASE_SIDE1: Self = Self(3);
    pub const BASE_SIDE2: Self = Self(5);
    pub const SIDE1_SIDE2: Self = Self(6);

    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// the provisional/conflicted form of a path (§3). Embeds a [`MergedInfo`] that callers
/// mutate as the engine converges on a resolution.
#[derive(Clone, Debug)]
pub struct ConflictInfo {
    pub merged: MergedInfo,
    pub stages: [VersionInfo; 3],
    pub pathnames: [Option<String>; 3],
    pub df_conflict: bool,
    pub path_conflict: bool,
    pub filemask: SideMask,
    pub dirmask: SideMask,
    pub match_mask: MatchMask,
    pub processed: bool,
}

impl ConflictInfo {
    pub fn new(directory_name: DirName, basename_offset: usize) -> Self {
        Self {
            merged: MergedInfo {
                result: VersionInfo::NULL,
                directory_name,
                basename_offset,
                is_null: true,
                clean: false,
            },
            stages: [VersionInfo::NULL; 3],
            pathnames: [None, None, None],
            df_conflict: false,
            path_conflict: false,
            filemask: SideMask::empty(),
            dirmask: SideMask::empty(),
            match_mask: MatchMask::NONE,
            processed: false,
        }
    }

    pub fn set(&mut self, side: Side, path: &str, version: VersionInfo, is_dir: bool) {
        self.stages[side as usize] = version;
        self.pathnames[side as usize] = Some(path.to_owned());
        if is_dir {
            self.dirmask.insert(SideMask::of(side));
            self.filemask.remove(SideMask::of(side));
        } else {
            self.filemask.insert(SideMask::of(side));
            self.dirmask.remove(SideMask::of(side));
        }
    }

    pub fn clear(&mut self, side: Side) {
        self.stages[side as usize] = VersionInfo::NULL;
        self.pathnames[side as usize] = None;
        self.filemask.remove(SideMask::of(side));
        self.dirmask.remove(SideMask::of(side));
    }

    pub fn base(&self) -> VersionInfo {
        self.stages[Side::Base as usize]
    }

    pub fn side1(&self) -> VersionInfo {
        self.stages[Side::Side1 as usize]
    }

    pub fn side2(&self) -> VersionInfo {
        self.stages[Side::Side2 as usize]
    }
}

/// the path table's record: either fully resolved, or still being worked on.
/// Modeled as a sum type per the spec's own design notes (§9) rather than the
/// teacher's clean-flag-discriminated single allocation.
#[derive(Clone, Debug)]
pub enum Entry {
    Resolved(MergedInfo),
    Provisional(Box<ConflictInfo>),
}

impl Entry {
    pub fn merged(&self) -> &MergedInfo {
        match self {
            Entry::Resolved(info) => info,
            Entry::Provisional(conflict) => &conflict.merged,
        }
    }

    pub fn merged_mut(&mut self) -> &mut MergedInfo {
        match self {
            Entry::Resolved(info) => info,
            Entry::Provisional(conflict) => &mut conflict.merged,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.merged().clean
    }

    pub fn as_conflict(&self) -> Option<&ConflictInfo> {
        match self {
            Entry::Resolved(_) => None,
            Entry::Provisional(conflict) => Some(conflict),
        }
    }

    pub fn as_conflict_mut(&mut self) -> Option<&mut ConflictInfo> {
        match self {
            Entry::Resolved(_) => None,
            Entry::Provisional(conflict) => Some(conflict),
        }
    }

    /// unwraps into a `ConflictInfo`, wrapping an already-resolved entry's result as a
    /// clean `merged` with no stage set. Used where two entries that arrived by
    /// different paths need to be combined into one record (§4.2 step 4).
    pub fn into_conflict(self) -> ConflictInfo {
        match self {
            Entry::Provisional(conflict) => *conflict,
            Entry::Resolved(info) => {
                let mut conflict = ConflictInfo::new(info.directory_name.clone(), info.basename_offset);
                conflict.merged = info;
                conflict
            }
        }
    }

    /// promotes a clean provisional entry into a resolved one, or is a no-op if
    /// already resolved. Used once the per-path resolver (§4.3) has settled an entry.
    pub fn finalize(self) -> Entry {
        match self {
            Entry::Resolved(info) => Entry::Resolved(info),
            Entry::Provisional(conflict) =>
                if conflict.merged.clean {
                    Entry::Resolved(conflict.merged)
                } else {
                    Entry::Provisional(conflict)
                },
        }
    }
}

/// a path whose resolution was not clean, surfaced to the caller (§4.3, §7). Owns
/// everything it needs so a working-copy/index adapter can consume it without the
/// engine instance (or its path table) still being alive.
#[derive(Clone, Debug)]
pub struct UnmergedEntry {
    pub path: String,
    pub stages: [VersionInfo; 3],
    pub pathnames: [Option<String>; 3],
    pub df_conflict: bool,
    pub path_conflict: bool,
}

impl UnmergedEntry {
    pub fn from_conflict(path: &str, conflict: &ConflictInfo) -> Self {
        Self {
            path: path.to_owned(),
            stages: conflict.stages,
            pathnames: conflict.pathnames.clone(),
            df_conflict: conflict.df_conflict,
            path_conflict: conflict.path_conflict,
        }
    }
}
