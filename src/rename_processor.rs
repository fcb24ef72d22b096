//! Rename-pair processing (§4.2 "Sorting and processing"): groups the combined,
//! sorted rename pairs by `old_path` and rewires the path table so that the per-path
//! resolver (§4.3) sees an ordinary three-way (or add/add) situation at each affected
//! target — this stage never calls into content merging itself.

use crate::entry::{Entry, Side, VersionInfo};
use crate::error::MergeResult;
use crate::rename::SidedFilePair;
use crate::table::PathTable;
use itertools::Itertools;

pub struct RenameProcessor<'a> {
    diagnostics: &'a mut crate::diagnostics::Diagnostics,
}

impl<'a> RenameProcessor<'a> {
    pub fn new(diagnostics: &'a mut crate::diagnostics::Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn process(&mut self, table: &mut PathTable, mut pairs: Vec<SidedFilePair>) -> MergeResult<()> {
        pairs.sort_by(|a, b| a.pair.old_path.cmp(&b.pair.old_path).then(a.side.cmp(&b.side)));

        let groups = pairs.into_iter().group_by(|p| p.pair.old_path.clone());
        for (old_path, group) in &groups {
            let group: Vec<SidedFilePair> = group.collect();
            match group.as_slice() {
                [a, b] if a.pair.new_path != b.pair.new_path => self.rename_rename_split(table, &old_path, a, b),
                [a, b] => self.rename_rename_same(table, &old_path, a, b),
                [only] => self.single_rename(table, &old_path, only),
                other => bug!("{} rename pairs share old_path `{}`, expected at most 2", other.len(), old_path),
            }
        }
        Ok(())
    }

    /// rename/rename(1→2): the same original file was renamed to two different
    /// targets. Both targets become three-way conflicts seeded with the true ancestor
    /// and the *other* target's content standing in for the side that isn't physically
    /// there; `old_path` is cleared since nothing occupies it on either side anymore.
    fn rename_rename_split(&mut self, table: &mut PathTable, old_path: &str, a: &SidedFilePair, b: &SidedFilePair) {
        let base_version = base_version_of(table, old_path);
        let version_a = side_version_of(table, &a.pair.new_path, a.side);
        let version_b = side_version_of(table, &b.pair.new_path, b.side);

        self.diagnostics.warn(format!(
            "CONFLICT (rename/rename): `{}` renamed to both `{}` and `{}`",
            old_path, a.pair.new_path, b.pair.new_path,
        ));

        install_synthetic_stage(table, &a.pair.new_path, old_path, base_version, b.side, &b.pair.new_path, version_b);
        install_synthetic_stage(table, &b.pair.new_path, old_path, base_version, a.side, &a.pair.new_path, version_a);
        remove_old_path(table, old_path);
    }

    /// rename/rename(1→1): both sides renamed the same original file to the same
    /// target. The collector already recorded both sides' content there as an add/add;
    /// this just installs the true ancestor so the resolver runs a real three-way merge
    /// instead of treating it as two unrelated additions.
    fn rename_rename_same(&mut self, table: &mut PathTable, old_path: &str, a: &SidedFilePair, b: &SidedFilePair) {
        debug_assert_eq!(a.pair.new_path, b.pair.new_path);
        let target = &a.pair.new_path;
        let base_version = base_version_of(table, old_path);
        if !base_version.is_null() {
            if let Some(conflict) = table.get_mut(target).and_then(Entry::as_conflict_mut) {
                conflict.set(Side::Base, old_path, base_version, false);
            }
        }
        remove_old_path(table, old_path);
    }

    /// a single rename pair, possibly colliding with content the other side
    /// independently placed at the target (§4.2's three named sub-cases).
    fn single_rename(&mut self, table: &mut PathTable, old_path: &str, p: &SidedFilePair) {
        let side = p.side;
        let other = other_side(side);
        let target = p.pair.new_path.clone();

        let old_conflict = table.get(old_path).and_then(Entry::as_conflict);
        let old_entry_other_present =
            old_conflict.map(|c| c.filemask.has(other) || c.dirmask.has(other)).unwrap_or(false);
        let other_version_at_old = old_conflict.map(|c| c.stages[other as usize]).unwrap_or(VersionInfo::NULL);
        let base_version = base_version_of(table, old_path);

        let target_other_present = table
            .get(&target)
            .and_then(Entry::as_conflict)
            .map(|c| c.filemask.has(other) || c.dirmask.has(other))
            .unwrap_or(false);

        if target_other_present && !old_entry_other_present {
            // rename/add/delete: the original is genuinely gone on both sides, and the
            // target's collision is unrelated content the other side added independently.
            // Leave the target looking like a plain add/add; just clear the old path.
            remove_old_path(table, old_path);
            return;
        }

        // either no collision, or the other side kept (and possibly modified) the
        // original in place (rename/add) — either way the target needs the real
        // ancestor so the resolver treats it as a genuine three-way comparison
        if let Some(conflict) = table.get_mut(&target).and_then(Entry::as_conflict_mut) {
            if !base_version.is_null() {
                conflict.set(Side::Base, old_path, base_version, false);
            }
            if old_entry_other_present {
                conflict.set(other, old_path, other_version_at_old, false);
            }
        }

        if !target_other_present {
            // unambiguous rename: the old location is fully superseded
            remove_old_path(table, old_path);
        }
        // else: collision with the original kept in place — leave `old_path` as-is, it
        // continues to track the other side's (possibly modified) version independently
    }
}

fn other_side(side: Side) -> Side {
    match side {
        Side::Side1 => Side::Side2,
        Side::Side2 => Side::Side1,
        Side::Base => bug!("a rename pair can never originate from the base side"),
    }
}

fn base_version_of(table: &PathTable, path: &str) -> VersionInfo {
    match table.get(path) {
        Some(Entry::Provisional(conflict)) => conflict.base(),
        _ => VersionInfo::NULL,
    }
}

fn side_version_of(table: &PathTable, path: &str, side: Side) -> VersionInfo {
    match table.get(path) {
        Some(Entry::Provisional(conflict)) => conflict.stages[side as usize],
        Some(Entry::Resolved(info)) => info.result,
        None => VersionInfo::NULL,
    }
}

#[allow(clippy::too_many_arguments)]
fn install_synthetic_stage(
    table: &mut PathTable,
    target: &str,
    old_path: &str,
    base_version: VersionInfo,
    other_side: Side,
    other_path: &str,
    other_version: VersionInfo,
) {
    let Some(conflict) = table.get_mut(target).and_then(Entry::as_conflict_mut) else {
        bug!("expected a provisional entry at rename target `{}`", target);
    };
    if !base_version.is_null() {
        conflict.set(Side::Base, old_path, base_version, false);
    }
    conflict.set(other_side, other_path, other_version, false);
    conflict.path_conflict = true;
}

fn remove_old_path(table: &mut PathTable, old_path: &str) {
    if let Some(entry) = table.get(old_path) {
        let dir = entry.merged().directory_name.clone();
        let offset = entry.merged().basename_offset;
        table.insert(old_path.to_owned(), Entry::Resolved(crate::entry::MergedInfo::null(dir, offset)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::entry::ConflictInfo;
    use crate::hash::Oid;
    use crate::interner::DirInterner;
    use crate::mode::{FileMode, Mode};
    use crate::opts::Verbosity;
    use crate::traits::{FilePair, RenameStatus};

    fn regular(oid: u8) -> VersionInfo {
        VersionInfo { mode: Mode::from(FileMode::Regular), oid: Oid::new([oid; 20]) }
    }

    #[test]
    fn plain_rename_carries_base_and_clears_old_path() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");

        let mut old_conflict = ConflictInfo::new(root.clone(), 0);
        old_conflict.set(Side::Base, "old", regular(1), false);
        table.insert("old", Entry::Provisional(Box::new(old_conflict)));

        let mut new_conflict = ConflictInfo::new(root, 0);
        new_conflict.set(Side::Side1, "new", regular(2), false);
        table.insert("new", Entry::Provisional(Box::new(new_conflict)));

        let mut diagnostics = Diagnostics::new(Verbosity::Quiet, false);
        let mut processor = RenameProcessor::new(&mut diagnostics);
        let pair = SidedFilePair {
            side: Side::Side1,
            pair: FilePair {
                old_path: "old".into(),
                new_path: "new".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
        };
        processor.process(&mut table, vec![pair]).unwrap();

        let new_entry = table.get("new").unwrap().as_conflict().unwrap();
        assert_eq!(new_entry.base(), regular(1));
        assert_eq!(new_entry.side1(), regular(2));

        match table.get("old").unwrap() {
            Entry::Resolved(info) => assert!(info.is_null),
            other => panic!("expected old_path to resolve to null, got {:?}", other),
        }
    }
}
