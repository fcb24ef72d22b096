//! The per-path resolver (§4.3): walks every not-yet-clean path-table entry, in
//! reverse-lexicographic key order (the same order the tree writer uses, §4.7), and
//! settles each one to a final `MergedInfo`, collecting the unclean ones into the
//! *Unmerged* set (§3, §7).

use crate::content_merge::{self, ContentMergeInputs};
use crate::diagnostics::Diagnostics;
use crate::entry::{ConflictInfo, Entry, MatchMask, MergedInfo, Side, SideMask, UnmergedEntry, VersionInfo};
use crate::error::MergeResult;
use crate::opts::MergeOptions;
use crate::table::PathTable;
use crate::traits::{ContentMerger, ObjectStore, SubmoduleMerger};
use crate::unique_path::unique_path;

/// git's own default conflict-marker run length; doubled per recursion level (§4.8).
const BASE_MARKER_SIZE: usize = 7;

pub fn marker_size(depth: usize) -> usize {
    BASE_MARKER_SIZE << depth.min(16)
}

pub struct Resolver<'a> {
    store: &'a mut dyn ObjectStore,
    content_merger: &'a dyn ContentMerger,
    submodule_merger: &'a dyn SubmoduleMerger,
    diagnostics: &'a mut Diagnostics,
    opts: &'a MergeOptions,
    depth: usize,
}

impl<'a> Resolver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a mut dyn ObjectStore,
        content_merger: &'a dyn ContentMerger,
        submodule_merger: &'a dyn SubmoduleMerger,
        diagnostics: &'a mut Diagnostics,
        opts: &'a MergeOptions,
        depth: usize,
    ) -> Self {
        Self { store, content_merger, submodule_merger, diagnostics, opts, depth }
    }

    /// resolves every unclean entry, returning the unmerged set (§4.3's last sentence).
    pub fn resolve_all(&mut self, table: &mut PathTable) -> MergeResult<Vec<UnmergedEntry>> {
        let mut paths: Vec<String> = table.keys().cloned().collect();
        paths.sort_unstable_by(|a, b| b.cmp(a));

        for path in &paths {
            if matches!(table.get(path), Some(Entry::Provisional(c)) if !c.merged.clean) {
                self.resolve_one(table, path)?;
            }
        }

        let mut unmerged = Vec::new();
        for path in &paths {
            if let Some(Entry::Provisional(conflict)) = table.get(path) {
                if !conflict.merged.clean {
                    unmerged.push(UnmergedEntry::from_conflict(path, conflict));
                }
            }
        }
        Ok(unmerged)
    }

    fn resolve_one(&mut self, table: &mut PathTable, path: &str) -> MergeResult<()> {
        let conflict = match table.get(path) {
            Some(Entry::Provisional(c)) => (**c).clone(),
            _ => return Ok(()),
        };

        // "filemask == 0": placeholder for a recursed-into directory; no file-level
        // resolution to do. It's clean by construction — nothing here ever blocks a
        // merge from completing, the real content lives at deeper paths.
        if conflict.filemask.is_empty() && !conflict.df_conflict {
            if let Some(Entry::Provisional(c)) = table.get_mut(path) {
                c.merged.clean = true;
            }
            return Ok(());
        }

        if conflict.df_conflict {
            return self.resolve_df_conflict(table, path, conflict);
        }

        if !conflict.match_mask.is_none() {
            self.resolve_matched(table, path, &conflict);
            return Ok(());
        }

        let filemask = conflict.filemask;
        if filemask.bits() >= 6 {
            self.resolve_content_merge(table, path, &conflict)?;
        } else if filemask == SideMask::BASE | SideMask::SIDE1 || filemask == SideMask::BASE | SideMask::SIDE2 {
            self.resolve_modify_delete(table, path, &conflict);
        } else if filemask == SideMask::SIDE1 || filemask == SideMask::SIDE2 {
            self.resolve_add_one_side(table, path, &conflict);
        } else if filemask == SideMask::BASE {
            self.resolve_deleted_both(table, path, &conflict);
        } else {
            bug!("unexpected filemask {:?} at `{}`", filemask, path);
        }
        Ok(())
    }

    /// whether anything in the table still hangs off `dir_handle` as its containing
    /// directory — a cheap proxy for "did the directory side's subtree end up with
    /// any surviving content" (§4.3's "directory chose nothing" test).
    fn directory_has_content(table: &PathTable, dir_handle: &crate::interner::DirName) -> bool {
        table.iter().any(|(_, entry)| {
            let info = entry.merged();
            !info.is_null && info.directory_name.is_same_directory(dir_handle)
        })
    }

    /// D/F conflict handling (§4.3). "Directory chose nothing" (the directory side's
    /// subtree ended up empty) clears the flag and falls through to an ordinary file
    /// resolution. Otherwise every file-side presence is relocated to a synthetic,
    /// branch-disambiguated path (§4.6) and the original entry becomes a bare
    /// directory placeholder with `filemask == 0`.
    fn resolve_df_conflict(&mut self, table: &mut PathTable, path: &str, mut conflict: ConflictInfo) -> MergeResult<()> {
        let dir_handle = table.intern_dir(path);
        if !Self::directory_has_content(table, &dir_handle) {
            conflict.df_conflict = false;
            table.insert(path.to_owned(), Entry::Provisional(Box::new(conflict)));
            return self.resolve_one(table, path);
        }

        // the file-in-base-only case ("filemask == 1, drop the file") falls out of
        // this uniformly: base is never relocated, just cleared.
        if conflict.filemask.has(Side::Base) {
            conflict.clear(Side::Base);
        }

        for side in [Side::Side1, Side::Side2] {
            if !conflict.filemask.has(side) {
                continue;
            }
            let branch = if side == Side::Side1 { self.opts.branch1.as_str() } else { self.opts.branch2.as_str() };
            let synthetic_path = unique_path(table, path, branch);
            table.ensure_parent_chain(&synthetic_path);
            let file_version = conflict.stages[side as usize];
            let dir = conflict.merged.directory_name.clone();
            let offset = crate::table::basename_offset(&synthetic_path);
            self.diagnostics.warn(format!(
                "CONFLICT (file/directory): `{}` is a directory on one side, placing the conflicting file at `{}`",
                path, synthetic_path,
            ));
            table.insert(
                synthetic_path,
                Entry::Resolved(MergedInfo {
                    result: file_version,
                    directory_name: dir,
                    basename_offset: offset,
                    is_null: file_version.is_null(),
                    clean: false,
                }),
            );
            conflict.clear(side);
        }

        conflict.df_conflict = false;
        conflict.merged.is_null = true;
        conflict.merged.clean = !conflict.path_conflict;
        table.insert(path.to_owned(), Entry::Provisional(Box::new(conflict)).finalize());
        Ok(())
    }

    fn resolve_matched(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo) {
        let side = match conflict.match_mask {
            MatchMask::SIDE1_SIDE2 => Side::Side1,
            MatchMask::BASE_SIDE1 => Side::Side2,
            MatchMask::BASE_SIDE2 => Side::Side1,
            _ => bug!("resolve_matched called with an empty match_mask at `{}`", path),
        };
        let is_null = conflict.filemask.bits() == conflict.match_mask.as_u8();
        let result = if is_null { VersionInfo::NULL } else { conflict.stages[side as usize] };
        self.finalize(table, path, conflict, result, true);
    }

    fn resolve_content_merge(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo) -> MergeResult<()> {
        let outcome = content_merge::merge_content(
            &mut *self.store,
            self.content_merger,
            self.submodule_merger,
            &mut *self.diagnostics,
            self.depth,
            ContentMergeInputs {
                path,
                base: conflict.base(),
                side1: conflict.side1(),
                side2: conflict.side2(),
                ancestor_label: &self.opts.ancestor,
                branch1: &self.opts.branch1,
                branch2: &self.opts.branch2,
                variant: self.opts.recursive_variant,
                marker_size: marker_size(self.depth),
            },
        )?;
        self.finalize(table, path, conflict, outcome.result, outcome.clean);
        Ok(())
    }

    fn resolve_modify_delete(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo) {
        let surviving = if conflict.filemask.has(Side::Side1) { Side::Side1 } else { Side::Side2 };
        let result = conflict.stages[surviving as usize];
        self.diagnostics.warn(format!(
            "CONFLICT (modify/delete): `{}` deleted on one side, modified on the other",
            path
        ));
        self.finalize(table, path, conflict, result, false);
    }

    fn resolve_add_one_side(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo) {
        let side = if conflict.filemask.has(Side::Side1) { Side::Side1 } else { Side::Side2 };
        let result = conflict.stages[side as usize];
        self.finalize(table, path, conflict, result, !conflict.path_conflict);
    }

    fn resolve_deleted_both(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo) {
        let clean = !conflict.path_conflict;
        self.finalize(table, path, conflict, VersionInfo::NULL, clean);
    }

    fn finalize(&mut self, table: &mut PathTable, path: &str, conflict: &ConflictInfo, result: VersionInfo, clean: bool) {
        let dir = conflict.merged.directory_name.clone();
        let offset = conflict.merged.basename_offset;
        let info = if result.is_null() {
            let mut info = MergedInfo::null(dir, offset);
            info.clean = clean;
            info
        } else {
            let mut info = MergedInfo::new(result, dir, offset);
            info.clean = clean;
            info
        };
        if clean {
            table.insert(path.to_owned(), Entry::Resolved(info));
        } else {
            let mut c = conflict.clone();
            c.merged = info;
            table.insert(path.to_owned(), Entry::Provisional(Box::new(c)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::interner::DirInterner;
    use crate::mode::{FileMode, Mode};
    use crate::opts::Verbosity;
    use crate::traits::{
        ContentMergeLabels, ContentMergeOutcome, MergeVariant, NullSubmoduleMerger, RawTreeEntry,
    };
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        blobs: RefCell<HashMap<Oid, Vec<u8>>>,
    }

    impl ObjectStore for FakeStore {
        fn read_blob(&self, oid: Oid) -> MergeResult<Vec<u8>> {
            Ok(self.blobs.borrow().get(&oid).cloned().unwrap_or_default())
        }
        fn write_blob(&mut self, bytes: &[u8]) -> MergeResult<Oid> {
            let oid = crate::hash::hash_bytes(bytes);
            self.blobs.borrow_mut().insert(oid, bytes.to_vec());
            Ok(oid)
        }
        fn read_tree(&self, _oid: Oid) -> MergeResult<Vec<RawTreeEntry>> {
            unimplemented!()
        }
        fn write_tree(&mut self, _entries: &[RawTreeEntry]) -> MergeResult<Oid> {
            unimplemented!()
        }
    }

    struct TakeSide2;
    impl ContentMerger for TakeSide2 {
        fn three_way(
            &self,
            base: &[u8],
            side1: &[u8],
            side2: &[u8],
            _labels: ContentMergeLabels<'_>,
            _variant: MergeVariant,
            _marker_size: usize,
        ) -> MergeResult<ContentMergeOutcome> {
            let clean = side1 == side2 || side1 == base || side2 == base;
            Ok(ContentMergeOutcome { bytes: side2.to_vec(), clean })
        }
    }

    fn version(byte: u8) -> VersionInfo {
        VersionInfo { mode: Mode::from(FileMode::Regular), oid: Oid::new([byte; 20]) }
    }

    fn base_conflict(root: crate::interner::DirName) -> ConflictInfo {
        ConflictInfo::new(root, 0)
    }

    fn new_resolver<'a>(
        store: &'a mut dyn ObjectStore,
        content_merger: &'a dyn ContentMerger,
        submodule_merger: &'a dyn SubmoduleMerger,
        diagnostics: &'a mut Diagnostics,
        opts: &'a MergeOptions,
    ) -> Resolver<'a> {
        Resolver::new(store, content_merger, submodule_merger, diagnostics, opts, 0)
    }

    #[test]
    fn resolve_matched_side1_side2_takes_side1() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");
        let mut conflict = base_conflict(root);
        conflict.set(Side::Base, "a", version(1), false);
        conflict.set(Side::Side1, "a", version(2), false);
        conflict.set(Side::Side2, "a", version(2), false);
        conflict.match_mask = MatchMask::SIDE1_SIDE2;

        let mut store = FakeStore::default();
        let merger = TakeSide2;
        let submodules = NullSubmoduleMerger;
        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let opts = MergeOptions::default();
        let mut resolver = new_resolver(&mut store, &merger, &submodules, &mut diagnostics, &opts);
        resolver.resolve_matched(&mut table, "a", &conflict);

        match table.get("a") {
            Some(Entry::Resolved(info)) => {
                assert!(info.clean);
                assert_eq!(info.result.oid, Oid::new([2; 20]));
            }
            other => panic!("expected a resolved entry, got {:?}", other),
        }
    }

    #[test]
    fn resolve_matched_base_side1_is_null_when_side2_also_absent() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");
        let mut conflict = base_conflict(root);
        conflict.set(Side::Base, "a", version(1), false);
        conflict.set(Side::Side1, "a", version(1), false);
        conflict.match_mask = MatchMask::BASE_SIDE1;

        let mut store = FakeStore::default();
        let merger = TakeSide2;
        let submodules = NullSubmoduleMerger;
        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let opts = MergeOptions::default();
        let mut resolver = new_resolver(&mut store, &merger, &submodules, &mut diagnostics, &opts);
        resolver.resolve_matched(&mut table, "a", &conflict);

        match table.get("a") {
            Some(Entry::Resolved(info)) => {
                assert!(info.clean);
                assert!(info.is_null);
            }
            other => panic!("expected a resolved null entry, got {:?}", other),
        }
    }

    #[test]
    fn resolve_content_merge_records_unclean_three_way_conflict() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");
        let mut conflict = base_conflict(root);
        conflict.set(Side::Base, "a", version(1), false);
        conflict.set(Side::Side1, "a", version(2), false);
        conflict.set(Side::Side2, "a", version(3), false);

        let mut store = FakeStore::default();
        let merger = TakeSide2;
        let submodules = NullSubmoduleMerger;
        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let opts = MergeOptions::default();
        let mut resolver = new_resolver(&mut store, &merger, &submodules, &mut diagnostics, &opts);
        resolver.resolve_content_merge(&mut table, "a", &conflict).unwrap();

        match table.get("a") {
            Some(Entry::Provisional(c)) => assert!(!c.merged.clean),
            other => panic!("expected an unclean provisional entry, got {:?}", other),
        }
    }

    #[test]
    fn resolve_modify_delete_keeps_surviving_side_and_is_unclean() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");
        let mut conflict = base_conflict(root);
        conflict.set(Side::Base, "a", version(1), false);
        conflict.set(Side::Side1, "a", version(2), false);

        let mut store = FakeStore::default();
        let merger = TakeSide2;
        let submodules = NullSubmoduleMerger;
        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let opts = MergeOptions::default();
        let mut resolver = new_resolver(&mut store, &merger, &submodules, &mut diagnostics, &opts);
        resolver.resolve_modify_delete(&mut table, "a", &conflict);

        match table.get("a") {
            Some(Entry::Provisional(c)) => {
                assert!(!c.merged.clean);
                assert_eq!(c.merged.result.oid, Oid::new([2; 20]));
            }
            other => panic!("expected an unclean provisional entry, got {:?}", other),
        }
    }

    #[test]
    fn resolve_df_conflict_relocates_both_file_sides() {
        let mut table = PathTable::new();
        let dir_handle = table.intern_dir("");
        let mut conflict = ConflictInfo::new(dir_handle, 0);
        conflict.set(Side::Side1, "a", version(2), false);
        conflict.set(Side::Side2, "a", version(3), false);
        conflict.df_conflict = true;
        // a live sibling under "a" so `directory_has_content` reports true
        table.insert(
            "a/x",
            Entry::Resolved(MergedInfo::new(version(9), table.intern_dir("a"), 2)),
        );

        let mut store = FakeStore::default();
        let merger = TakeSide2;
        let submodules = NullSubmoduleMerger;
        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let mut opts = MergeOptions::default();
        opts.branch1 = "ours".to_owned();
        opts.branch2 = "theirs".to_owned();
        let mut resolver = new_resolver(&mut store, &merger, &submodules, &mut diagnostics, &opts);
        resolver.resolve_df_conflict(&mut table, "a", conflict).unwrap();

        assert!(table.contains("a~ours"));
        assert!(table.contains("a~theirs"));
        match table.get("a") {
            Some(Entry::Resolved(info)) => assert!(info.is_null),
            other => panic!("expected the directory placeholder to be a clean null entry, got {:?}", other),
        }
    }
}
