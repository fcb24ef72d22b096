//! The rename engine (§4.2): per-side rename detection, directory-rename inference by
//! majority vote, and application of inferred directory renames to the path table
//! before the combined rename set reaches the rename processor (`rename_processor.rs`).

use crate::diagnostics::Diagnostics;
use crate::entry::{Entry, Side};
use crate::error::MergeResult;
use crate::hash::Oid;
use crate::opts::{DetectDirectoryRenames, DetectRenames, MergeOptions};
use crate::table::{parent_of, PathTable};
use crate::traits::{FilePair, ObjectStore, RenameDetectOpts, RenameDetector, RenameStatus};
use rustc_hash::FxHashMap;

/// one inferred `old_dir -> new_dir` relocation, with the vote tally's uniqueness.
#[derive(Clone, Debug)]
pub struct DirRenameEntry {
    pub new_dir: String,
    pub non_unique: bool,
}

/// §3 "Directory-rename map": `old_dir -> {new_dir, non_unique}`, one map per side.
#[derive(Default)]
pub struct DirRenameMap(FxHashMap<String, DirRenameEntry>);

impl DirRenameMap {
    pub fn get(&self, old_dir: &str) -> Option<&DirRenameEntry> {
        self.0.get(old_dir)
    }
}

/// maximal common trailing component-run between `old` and `new` (§4.2 step 1);
/// returns the remaining `(old_dir, new_dir)` prefixes.
fn split_common_suffix(old: &str, new: &str) -> (String, String) {
    let old_comps: Vec<&str> = if old.is_empty() { Vec::new() } else { old.split('/').collect() };
    let new_comps: Vec<&str> = if new.is_empty() { Vec::new() } else { new.split('/').collect() };
    let (mut i, mut j) = (old_comps.len(), new_comps.len());
    while i > 0 && j > 0 && old_comps[i - 1] == new_comps[j - 1] {
        i -= 1;
        j -= 1;
    }
    (old_comps[..i].join("/"), new_comps[..j].join("/"))
}

/// §4.2 "Directory-rename inference": only `Renamed` pairs contribute votes — an `Added`
/// pair has no old location to infer a source directory from.
pub fn infer_dir_renames(pairs: &[FilePair]) -> DirRenameMap {
    let mut votes: FxHashMap<String, FxHashMap<String, u32>> = FxHashMap::default();
    for pair in pairs.iter().filter(|p| p.status == RenameStatus::Renamed) {
        let (old_dir, new_dir) = split_common_suffix(&pair.old_path, &pair.new_path);
        if old_dir != new_dir {
            *votes.entry(old_dir).or_default().entry(new_dir).or_insert(0) += 1;
        }
    }

    let mut map = FxHashMap::default();
    for (old_dir, counts) in votes {
        let mut best: Option<(&String, u32)> = None;
        let mut non_unique = false;
        for (new_dir, count) in &counts {
            match best {
                None => best = Some((new_dir, *count)),
                Some((_, best_count)) if *count > best_count => {
                    best = Some((new_dir, *count));
                    non_unique = false;
                }
                Some((_, best_count)) if *count == best_count => non_unique = true,
                _ => {}
            }
        }
        let (new_dir, _) = best.expect("every old_dir has at least one vote");
        map.insert(old_dir, DirRenameEntry { new_dir: new_dir.clone(), non_unique });
    }
    DirRenameMap(map)
}

/// walks `new_path`'s ancestor directories longest-prefix-first against `map`,
/// returning the first (most specific) match (§4.2 "Applying directory renames" step 1).
fn find_longest_match<'m>(map: &'m DirRenameMap, new_path: &str) -> Option<(String, &'m DirRenameEntry)> {
    let mut ancestor = parent_of(new_path).to_owned();
    loop {
        if let Some(entry) = map.get(&ancestor) {
            return Some((ancestor, entry));
        }
        if ancestor.is_empty() {
            return None;
        }
        ancestor = parent_of(&ancestor).to_owned();
    }
}

fn retarget(new_path: &str, old_dir: &str, new_dir: &str) -> String {
    let suffix = if old_dir.is_empty() { new_path } else { &new_path[old_dir.len() + 1..] };
    if new_dir.is_empty() { suffix.to_owned() } else { format!("{}/{}", new_dir, suffix) }
}

/// a rename/add pair annotated with the side it came from, carried through to the
/// rename processor (§4.2 "Sorting and processing": `score` encodes the side).
#[derive(Clone, Debug)]
pub struct SidedFilePair {
    pub side: Side,
    pub pair: FilePair,
}

pub struct RenameEngine<'a> {
    store: &'a dyn ObjectStore,
    detector: &'a dyn RenameDetector,
    diagnostics: &'a mut Diagnostics,
    opts: &'a MergeOptions,
}

impl<'a> RenameEngine<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        detector: &'a dyn RenameDetector,
        diagnostics: &'a mut Diagnostics,
        opts: &'a MergeOptions,
    ) -> Self {
        Self { store, detector, diagnostics, opts }
    }

    /// §4.2 end-to-end for both sides: detect, infer directory renames, apply them to
    /// the path table, and return the surviving `Renamed` pairs (now reflecting any
    /// directory-rename carry) for the rename processor to group by `old_path`.
    pub fn detect_and_apply(
        &mut self,
        table: &mut PathTable,
        base_tree: Oid,
        side1_tree: Oid,
        side2_tree: Oid,
    ) -> MergeResult<Vec<SidedFilePair>> {
        if !self.opts.detect_renames.is_enabled() {
            return Ok(Vec::new());
        }

        let detect_opts = RenameDetectOpts {
            rename_limit: self.opts.rename_limit,
            rename_score: self.opts.rename_score,
            detect_copies: matches!(self.opts.detect_renames, DetectRenames::Copy),
        };
        let mut side1_pairs = self.detector.diff(self.store, base_tree, side1_tree, detect_opts)?;
        let mut side2_pairs = self.detector.diff(self.store, base_tree, side2_tree, detect_opts)?;

        if self.opts.detect_directory_renames != DetectDirectoryRenames::None {
            let side1_dirs = infer_dir_renames(&side1_pairs);
            let side2_dirs = infer_dir_renames(&side2_pairs);
            // side1's directory renames pull along side2's untouched files (and vice
            // versa) — the side that didn't rename the directory is the one whose
            // pairs get carried (§4.2, grounded in scenario F's "add carry" expectation)
            self.apply_directory_renames(table, &side1_dirs, &side2_dirs, &mut side2_pairs, Side::Side2)?;
            self.apply_directory_renames(table, &side2_dirs, &side1_dirs, &mut side1_pairs, Side::Side1)?;
        }

        let mut combined: Vec<SidedFilePair> = side1_pairs
            .into_iter()
            .filter(|p| p.status == RenameStatus::Renamed)
            .map(|pair| SidedFilePair { side: Side::Side1, pair })
            .collect();
        combined.extend(
            side2_pairs
                .into_iter()
                .filter(|p| p.status == RenameStatus::Renamed)
                .map(|pair| SidedFilePair { side: Side::Side2, pair }),
        );
        combined.sort_by(|a, b| a.pair.old_path.cmp(&b.pair.old_path).then(a.side.cmp(&b.side)));
        Ok(combined)
    }

    /// applies `renaming_side_dirs` (inferred from the side that actually renamed a
    /// directory) to `carried_side_pairs` (the other side's added/renamed files that
    /// may have been sitting, untouched, under one of those renamed directories).
    fn apply_directory_renames(
        &mut self,
        table: &mut PathTable,
        renaming_side_dirs: &DirRenameMap,
        carried_side_dirs: &DirRenameMap,
        carried_side_pairs: &mut [FilePair],
        carried_side: Side,
    ) -> MergeResult<()> {
        struct Candidate {
            pair_idx: usize,
            old_dir: String,
            target: String,
        }

        let mut candidates = Vec::new();
        for (idx, pair) in carried_side_pairs.iter().enumerate() {
            if !matches!(pair.status, RenameStatus::Added | RenameStatus::Renamed) {
                continue;
            }
            let Some((old_dir, entry)) = find_longest_match(renaming_side_dirs, &pair.new_path) else {
                continue;
            };
            if let Some(own) = carried_side_dirs.get(&old_dir) {
                if own.new_dir != entry.new_dir {
                    self.diagnostics.warn(format!(
                        "directory rename of `{}` is ambiguous between both sides, leaving `{}` in place",
                        old_dir, pair.new_path,
                    ));
                    continue;
                }
            }
            if entry.non_unique {
                self.diagnostics.warn(format!(
                    "directory rename of `{}` has no unique destination, leaving `{}` in place",
                    old_dir, pair.new_path,
                ));
                continue;
            }
            let target = retarget(&pair.new_path, &old_dir, &entry.new_dir);
            candidates.push(Candidate { pair_idx: idx, old_dir, target });
        }

        // §4.5 collision detection: multiple sources landing on the same target
        let mut target_counts: FxHashMap<String, u32> = FxHashMap::default();
        for c in &candidates {
            *target_counts.entry(c.target.clone()).or_insert(0) += 1;
        }

        for c in candidates {
            if target_counts[&c.target] > 1 {
                self.diagnostics.warn(format!(
                    "multiple files would be relocated to `{}` by the `{}` directory rename, skipping",
                    c.target, c.old_dir,
                ));
                continue;
            }
            let from = carried_side_pairs[c.pair_idx].new_path.clone();
            if table.contains(&c.target) && !path_table_entry_is_for(table, &c.target, &from) {
                self.diagnostics.warn(format!(
                    "`{}` already exists, skipping directory-rename relocation of `{}`",
                    c.target, from,
                ));
                continue;
            }
            self.relocate(table, &from, &c.target, carried_side)?;
            carried_side_pairs[c.pair_idx].new_path = c.target;
        }
        Ok(())
    }

    fn relocate(&mut self, table: &mut PathTable, from: &str, to: &str, side: Side) -> MergeResult<()> {
        table.ensure_parent_chain(to);
        let prior = table.rename(from, to);
        if let Some(conflict) = table.get_mut(to).and_then(Entry::as_conflict_mut) {
            if conflict.pathnames[side as usize].is_some() {
                conflict.pathnames[side as usize] = Some(to.to_owned());
            }
        }
        if let Some(prior_entry) = prior {
            let relocated = table.remove(to).unwrap_or_else(|| bug!("just-inserted entry vanished at `{}`", to));
            table.insert(to.to_owned(), merge_displaced_entries(prior_entry, relocated));
        }
        Ok(())
    }
}

/// the `from == to` identity case means the entry currently at `path` was the one we
/// are *about* to relocate there ourselves, not a pre-existing occupant (i.e. not
/// really a collision at all, just this very candidate already having moved).
fn path_table_entry_is_for(table: &PathTable, path: &str, from: &str) -> bool {
    table.get(path).is_none() || path == from
}

/// combines two path-table entries that ended up sharing a key after a directory-rename
/// relocation (§4.2 step 4: "merge the two into one ConflictInfo with combined filemask").
fn merge_displaced_entries(a: Entry, b: Entry) -> Entry {
    let mut conflict = a.into_conflict();
    let other = b.into_conflict();
    for side in crate::entry::ALL_SIDES {
        let present = other.filemask.has(side) || other.dirmask.has(side);
        if present {
            let is_dir = other.dirmask.has(side);
            let path = other.pathnames[side as usize].clone().unwrap_or_default();
            conflict.set(side, &path, other.stages[side as usize], is_dir);
        }
    }
    Entry::Provisional(Box::new(conflict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_suffix_splits_renamed_directory() {
        let (old_dir, new_dir) = split_common_suffix("old/a", "new/a");
        assert_eq!(old_dir, "old");
        assert_eq!(new_dir, "new");
    }

    #[test]
    fn common_suffix_handles_rename_into_root() {
        let (old_dir, new_dir) = split_common_suffix("old/a", "a");
        assert_eq!(old_dir, "old");
        assert_eq!(new_dir, "");
    }

    #[test]
    fn majority_vote_picks_the_largest_count() {
        let pairs = vec![
            FilePair {
                old_path: "old/a".into(),
                new_path: "new/a".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
            FilePair {
                old_path: "old/b".into(),
                new_path: "new/b".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
            FilePair {
                old_path: "old/c".into(),
                new_path: "other/c".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
        ];
        let map = infer_dir_renames(&pairs);
        let entry = map.get("old").unwrap();
        assert_eq!(entry.new_dir, "new");
        assert!(!entry.non_unique);
    }

    #[test]
    fn tied_vote_is_non_unique() {
        let pairs = vec![
            FilePair {
                old_path: "old/a".into(),
                new_path: "new/a".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
            FilePair {
                old_path: "old/b".into(),
                new_path: "other/b".into(),
                status: RenameStatus::Renamed,
                score: 90,
            },
        ];
        let map = infer_dir_renames(&pairs);
        assert!(map.get("old").unwrap().non_unique);
    }
}
