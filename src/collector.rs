//! The collector (§4.1): a synchronized three-tree walk that produces one path-table
//! entry per file or directory touched by any of the three trees, applying the cheap
//! early-resolution rules before any rename work happens.
//!
//! The walk itself is an explicit stack-free recursion over a three-way merge-join of
//! each directory's (already basename-sorted) entries, in the spirit of the teacher's
//! `TreeDiffer`/`GenericDiffer` merge-join pattern (`diff.rs`, `diff/tree_diff.rs`),
//! generalized here from a two-way join to a three-way one.

use crate::diagnostics::Diagnostics;
use crate::entry::{ConflictInfo, Entry, MatchMask, MergedInfo, Side, SideMask, VersionInfo};
use crate::error::MergeResult;
use crate::hash::Oid;
use crate::interner::DirName;
use crate::table::{basename_offset, PathTable};
use crate::traits::{ObjectStore, RawTreeEntry};

pub struct Collector<'a> {
    store: &'a dyn ObjectStore,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Collector<'a> {
    pub fn new(store: &'a dyn ObjectStore, diagnostics: &'a mut Diagnostics) -> Self {
        Self { store, diagnostics }
    }

    pub fn collect(
        &mut self,
        table: &mut PathTable,
        base: Oid,
        side1: Oid,
        side2: Oid,
    ) -> MergeResult<()> {
        let root = table.intern_dir("");
        self.walk(table, "", root, base, side1, side2, false)
    }

    fn entries_of(&self, oid: Oid) -> MergeResult<Vec<RawTreeEntry>> {
        if oid.is_null() {
            return Ok(Vec::new());
        }
        let mut entries = self.store.read_tree(oid)?;
        // re-sort on plain name order for the merge-join below, independent of
        // whatever basename tie-break the store's own listing uses (§4.7 is the only
        // stage that cares about that tie-break)
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        table: &mut PathTable,
        dir_path: &str,
        dir_name: DirName,
        base_tree: Oid,
        side1_tree: Oid,
        side2_tree: Oid,
        inside_possibly_renamed_dir: bool,
    ) -> MergeResult<()> {
        let base_entries = self.entries_of(base_tree)?;
        let side1_entries = self.entries_of(side1_tree)?;
        let side2_entries = self.entries_of(side2_tree)?;

        for (name, [b, s1, s2]) in merge_join(&base_entries, &side1_entries, &side2_entries) {
            let full_path =
                if dir_path.is_empty() { name.clone() } else { format!("{}/{}", dir_path, name) };
            self.visit(
                table,
                &full_path,
                dir_name.clone(),
                b,
                s1,
                s2,
                inside_possibly_renamed_dir,
            )?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &mut self,
        table: &mut PathTable,
        full_path: &str,
        dir_name: DirName,
        b: Option<RawTreeEntry>,
        s1: Option<RawTreeEntry>,
        s2: Option<RawTreeEntry>,
        inside_possibly_renamed_dir: bool,
    ) -> MergeResult<()> {
        let dirmask_full = side_mask(&b, &s1, &s2, |e| e.mode.is_tree());
        let basename_offset = basename_offset(full_path);

        enum Outcome {
            Resolved(VersionInfo),
            Dropped,
            Conflict(Box<ConflictInfo>),
        }

        let outcome = if b.is_some()
            && s1.is_some()
            && s2.is_some()
            && eq(b.as_ref(), s1.as_ref())
            && eq(s1.as_ref(), s2.as_ref())
        {
            // rule 1: all three identical
            Outcome::Resolved(version_of(b.as_ref().unwrap()))
        } else if is_file(&b) && is_file(&s1) && is_file(&s2) && eq(s1.as_ref(), s2.as_ref()) {
            // rule 2: three files, sides match
            Outcome::Resolved(version_of(s1.as_ref().unwrap()))
        } else if !inside_possibly_renamed_dir && eq(b.as_ref(), s1.as_ref()) && b.is_some() {
            // rule 3: side1 matches base
            match &s2 {
                None => Outcome::Dropped,
                Some(s2_entry) if is_dir_opt(&b) || s2_entry.mode.is_tree() => {
                    // "either side is a directory": cannot early-resolve, even when
                    // both are directories with merely-differing contents — side2 may
                    // have added or modified files under this path. Clear base/side1
                    // from the mask entirely (they agree and carry nothing new) and
                    // fall through with only side2 recorded, so the subtree is still
                    // visited instead of silently vanishing.
                    let mut conflict = ConflictInfo::new(dir_name.clone(), basename_offset);
                    conflict.set(Side::Side2, full_path, version_of(s2_entry), s2_entry.mode.is_tree());
                    conflict.df_conflict = is_dir_opt(&b) != s2_entry.mode.is_tree();
                    Outcome::Conflict(Box::new(conflict))
                }
                Some(s2_entry) => Outcome::Resolved(version_of(s2_entry)),
            }
        } else if !inside_possibly_renamed_dir && eq(b.as_ref(), s2.as_ref()) && b.is_some() {
            // rule 4: side2 matches base
            match &s1 {
                None => Outcome::Dropped,
                Some(s1_entry) if is_dir_opt(&b) || s1_entry.mode.is_tree() => {
                    // mirror of rule 3 above, with side1 the one potentially carrying
                    // new content under a directory that base/side2 left untouched.
                    let mut conflict = ConflictInfo::new(dir_name.clone(), basename_offset);
                    conflict.set(Side::Side1, full_path, version_of(s1_entry), s1_entry.mode.is_tree());
                    conflict.df_conflict = is_dir_opt(&b) != s1_entry.mode.is_tree();
                    Outcome::Conflict(Box::new(conflict))
                }
                Some(s1_entry) => Outcome::Resolved(version_of(s1_entry)),
            }
        } else {
            // rule 5: fallback
            let mut conflict = ConflictInfo::new(dir_name.clone(), basename_offset);
            conflict.match_mask = match_mask(&b, &s1, &s2);
            if let Some(e) = &b {
                conflict.set(Side::Base, full_path, version_of(e), e.mode.is_tree());
            }
            if let Some(e) = &s1 {
                conflict.set(Side::Side1, full_path, version_of(e), e.mode.is_tree());
            }
            if let Some(e) = &s2 {
                conflict.set(Side::Side2, full_path, version_of(e), e.mode.is_tree());
            }
            conflict.df_conflict = !conflict.filemask.is_empty() && !conflict.dirmask.is_empty();
            Outcome::Conflict(Box::new(conflict))
        };

        let dropped = matches!(&outcome, Outcome::Dropped);
        let skip_recursion = matches!(&outcome, Outcome::Resolved(_)) && dirmask_full.bits() == 7;

        match outcome {
            Outcome::Resolved(version) =>
                if version.is_null() {
                    table.insert(full_path, Entry::Resolved(MergedInfo::null(dir_name.clone(), basename_offset)));
                } else {
                    table.insert(
                        full_path,
                        Entry::Resolved(MergedInfo::new(version, dir_name.clone(), basename_offset)),
                    );
                },
            Outcome::Dropped => {}
            Outcome::Conflict(conflict) => table.insert(full_path, Entry::Provisional(conflict)),
        }

        if dropped {
            return Ok(());
        }

        // §4.1 "possible directory-rename sources": dirmask == {base,side1} or {base,side2}
        let is_possible_rename_source =
            dirmask_full == SideMask::BASE | SideMask::SIDE1 || dirmask_full == SideMask::BASE | SideMask::SIDE2;
        if is_possible_rename_source {
            table.possible_dir_rename_sources.insert(full_path.to_owned());
        }
        let child_inside_flag = inside_possibly_renamed_dir || is_possible_rename_source;

        if !skip_recursion && !dirmask_full.is_empty() {
            let child_base = tree_oid_if_dir(&b);
            let child_side1 = tree_oid_if_dir(&s1);
            let child_side2 = tree_oid_if_dir(&s2);
            let child_dir_name = table.intern_dir(full_path);
            self.walk(
                table,
                full_path,
                child_dir_name,
                child_base,
                child_side1,
                child_side2,
                child_inside_flag,
            )?;
        }

        Ok(())
    }
}

fn version_of(entry: &RawTreeEntry) -> VersionInfo {
    VersionInfo { mode: entry.mode, oid: entry.oid }
}

fn tree_oid_if_dir(entry: &Option<RawTreeEntry>) -> Oid {
    match entry {
        Some(e) if e.mode.is_tree() => e.oid,
        _ => Oid::UNKNOWN,
    }
}

fn is_file(entry: &Option<RawTreeEntry>) -> bool {
    matches!(entry, Some(e) if !e.mode.is_tree())
}

fn is_dir_opt(entry: &Option<RawTreeEntry>) -> bool {
    matches!(entry, Some(e) if e.mode.is_tree())
}

fn eq(a: Option<&RawTreeEntry>, b: Option<&RawTreeEntry>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.mode == b.mode && a.oid == b.oid,
        _ => false,
    }
}

fn side_mask(
    b: &Option<RawTreeEntry>,
    s1: &Option<RawTreeEntry>,
    s2: &Option<RawTreeEntry>,
    pred: impl Fn(&RawTreeEntry) -> bool,
) -> SideMask {
    let mut mask = SideMask::empty();
    if b.as_ref().is_some_and(&pred) {
        mask.insert(SideMask::BASE);
    }
    if s1.as_ref().is_some_and(&pred) {
        mask.insert(SideMask::SIDE1);
    }
    if s2.as_ref().is_some_and(&pred) {
        mask.insert(SideMask::SIDE2);
    }
    mask
}

fn match_mask(
    b: &Option<RawTreeEntry>,
    s1: &Option<RawTreeEntry>,
    s2: &Option<RawTreeEntry>,
) -> MatchMask {
    if eq(b.as_ref(), s1.as_ref()) {
        MatchMask::BASE_SIDE1
    } else if eq(b.as_ref(), s2.as_ref()) {
        MatchMask::BASE_SIDE2
    } else if eq(s1.as_ref(), s2.as_ref()) {
        MatchMask::SIDE1_SIDE2
    } else {
        MatchMask::NONE
    }
}

/// three-way merge-join of already name-sorted entry lists, yielding one group per
/// distinct name with `None` in whichever slots don't have that name.
#[allow(clippy::type_complexity)]
fn merge_join(
    base: &[RawTreeEntry],
    side1: &[RawTreeEntry],
    side2: &[RawTreeEntry],
) -> Vec<(String, [Option<RawTreeEntry>; 3])> {
    let (mut i, mut j, mut k) = (0, 0, 0);
    let mut out = Vec::new();
    while i < base.len() || j < side1.len() || k < side2.len() {
        let name = [base.get(i), side1.get(j), side2.get(k)]
            .into_iter()
            .flatten()
            .map(|e| e.name.as_str())
            .min()
            .expect("at least one side has an entry remaining")
            .to_owned();
        let b = take_if_matches(base, &mut i, &name);
        let s1 = take_if_matches(side1, &mut j, &name);
        let s2 = take_if_matches(side2, &mut k, &name);
        out.push((name, [b, s1, s2]));
    }
    out
}

fn take_if_matches(entries: &[RawTreeEntry], idx: &mut usize, name: &str) -> Option<RawTreeEntry> {
    if entries.get(*idx).is_some_and(|e| e.name == name) {
        let entry = entries[*idx].clone();
        *idx += 1;
        Some(entry)
    } else {
        None
    }
}
