//! The two public operations (§6): `merge_trees` runs the full pipeline once
//! (collector → rename engine/processor → resolver → tree writer); `merge_commits`
//! adds the recursive-driver base-folding of §4.8 on top, and
//! `merge_commits_from_graph` adds the supplemental best-common-ancestor search.

use crate::collector::Collector;
use crate::diagnostics::Diagnostics;
use crate::driver;
use crate::entry::UnmergedEntry;
use crate::error::{MergeEngineError, MergeResult};
use crate::hash::Oid;
use crate::opts::MergeOptions;
use crate::rename::RenameEngine;
use crate::rename_processor::RenameProcessor;
use crate::resolve::Resolver;
use crate::table::PathTable;
use crate::traits::{CommitGraph, ContentMerger, ObjectStore, RenameDetector, SubmoduleMerger};
use crate::writer::TreeWriter;

/// the most merge bases `merge_commits` will fold pairwise in one call (§4.8's driver
/// is iterative, not unbounded — this is a sanity bound against malformed input, not
/// a semantic limit drawn from the source).
pub const MAX_FOLDED_MERGE_BASES: usize = 32;

pub struct MergeOutput {
    pub result_tree: Oid,
    pub clean: bool,
    pub unmerged: Vec<UnmergedEntry>,
    pub diagnostics: Vec<String>,
}

pub struct Collaborators<'a> {
    pub store: &'a mut dyn ObjectStore,
    pub detector: &'a dyn RenameDetector,
    pub content_merger: &'a dyn ContentMerger,
    pub submodule_merger: &'a dyn SubmoduleMerger,
}

/// §6 operation 1: a single three-way tree merge.
pub fn merge_trees(
    collaborators: &mut Collaborators<'_>,
    base: Oid,
    side1: Oid,
    side2: Oid,
    opts: &MergeOptions,
) -> MergeResult<MergeOutput> {
    merge_trees_at_depth(collaborators, base, side1, side2, opts, 0)
}

fn merge_trees_at_depth(
    collaborators: &mut Collaborators<'_>,
    base: Oid,
    side1: Oid,
    side2: Oid,
    opts: &MergeOptions,
    depth: usize,
) -> MergeResult<MergeOutput> {
    let Collaborators { store, detector, content_merger, submodule_merger } = collaborators;
    let mut diagnostics = Diagnostics::new(opts.verbosity, opts.buffer_output);
    let mut table = PathTable::new();

    {
        let mut collector = Collector::new(&**store, &mut diagnostics);
        collector.collect(&mut table, base, side1, side2)?;
    }

    {
        let mut rename_engine = RenameEngine::new(&**store, *detector, &mut diagnostics, opts);
        let pairs = rename_engine.detect_and_apply(&mut table, base, side1, side2)?;
        let mut processor = RenameProcessor::new(&mut diagnostics);
        processor.process(&mut table, pairs)?;
    }

    let unmerged = {
        let mut resolver = Resolver::new(&mut **store, *content_merger, *submodule_merger, &mut diagnostics, opts, depth);
        resolver.resolve_all(&mut table)?
    };

    let result_tree = {
        let mut writer = TreeWriter::new(&mut **store);
        writer.write(&mut table)?
    };

    Ok(MergeOutput {
        result_tree,
        clean: unmerged.is_empty(),
        unmerged,
        diagnostics: diagnostics.take_buffered(),
    })
}

/// §6 operation 2 plus §4.8's recursive driver: folds multiple merge bases pairwise
/// into a single virtual base before running the real merge. `branch1`/`branch2` in
/// `opts` are only used for the outermost merge; the folding steps use the fixed
/// "Temporary merge branch 1/2" labels the teacher's own recursive-merge path uses.
#[allow(clippy::too_many_arguments)]
pub fn merge_commits(
    collaborators: &mut Collaborators<'_>,
    graph: &dyn CommitGraph,
    commit_a: Oid,
    commit_b: Oid,
    merge_bases: &[Oid],
    opts: &MergeOptions,
) -> MergeResult<MergeOutput> {
    if merge_bases.len() > MAX_FOLDED_MERGE_BASES {
        return Err(MergeEngineError::TooManyMergeBases(merge_bases.len()).into());
    }

    let tree_a = graph.tree(commit_a)?;
    let tree_b = graph.tree(commit_b)?;
    let base_tree = fold_merge_bases(collaborators, graph, merge_bases, opts)?;

    merge_trees_at_depth(collaborators, base_tree, tree_a, tree_b, opts, 0)
}

/// §4.8 "recursive driver": B₁ is the starting virtual base; each subsequent base is
/// folded in via a nested merge at depth 1, using the empty tree as that nested
/// merge's own ancestor (no deeper recursive merge-base search is attempted for the
/// bases themselves — see DESIGN.md for why).
fn fold_merge_bases(
    collaborators: &mut Collaborators<'_>,
    graph: &dyn CommitGraph,
    merge_bases: &[Oid],
    opts: &MergeOptions,
) -> MergeResult<Oid> {
    let mut bases = merge_bases.iter();
    let Some(&first) = bases.next() else {
        return Ok(Oid::UNKNOWN);
    };
    let mut virtual_base = graph.tree(first)?;

    let mut fold_opts = opts.clone();
    fold_opts.branch1 = "Temporary merge branch 1".to_owned();
    fold_opts.branch2 = "Temporary merge branch 2".to_owned();

    for &next in bases {
        let next_tree = graph.tree(next)?;
        let folded = merge_trees_at_depth(collaborators, Oid::UNKNOWN, virtual_base, next_tree, &fold_opts, 1)?;
        virtual_base = folded.result_tree;
    }
    Ok(virtual_base)
}

/// §6 operation 3 (supplemental): derives `merge_bases` via the best-common-ancestor
/// search of §4.8 before delegating to `merge_commits`.
pub fn merge_commits_from_graph(
    collaborators: &mut Collaborators<'_>,
    graph: &dyn CommitGraph,
    commit_a: Oid,
    commit_b: Oid,
    opts: &MergeOptions,
) -> MergeResult<MergeOutput> {
    let merge_bases = driver::find_merge_bases(graph, commit_a, commit_b)?;
    merge_commits(collaborators, graph, commit_a, commit_b, &merge_bases, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::VersionInfo;
    use crate::mode::{FileMode, Mode};
    use crate::opts::Verbosity;
    use crate::traits::{
        ContentMergeLabels, ContentMergeOutcome, FilePair, MergeVariant, NullSubmoduleMerger, RawTreeEntry,
        RenameDetectOpts, SubmoduleResolution,
    };
    use quickcheck::Arbitrary;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        blobs: RefCell<HashMap<Oid, Vec<u8>>>,
        trees: RefCell<HashMap<Oid, Vec<RawTreeEntry>>>,
    }

    impl FakeStore {
        fn put_blob(&self, bytes: &[u8]) -> Oid {
            let oid = crate::hash::hash_bytes(bytes);
            self.blobs.borrow_mut().insert(oid, bytes.to_vec());
            oid
        }

        fn put_tree(&self, mut entries: Vec<RawTreeEntry>) -> Oid {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            let bytes: Vec<u8> = entries
                .iter()
                .flat_map(|e| format!("{} {}\0", e.mode, e.name).into_bytes().into_iter().chain(e.oid.as_bytes().to_vec()))
                .collect();
            let oid = crate::hash::hash_bytes(&bytes);
            self.trees.borrow_mut().insert(oid, entries);
            oid
        }
    }

    impl ObjectStore for FakeStore {
        fn read_blob(&self, oid: Oid) -> MergeResult<Vec<u8>> {
            Ok(self.blobs.borrow().get(&oid).cloned().unwrap_or_default())
        }
        fn write_blob(&mut self, bytes: &[u8]) -> MergeResult<Oid> {
            Ok(self.put_blob(bytes))
        }
        fn read_tree(&self, oid: Oid) -> MergeResult<Vec<RawTreeEntry>> {
            Ok(self.trees.borrow().get(&oid).cloned().unwrap_or_default())
        }
        fn write_tree(&mut self, entries: &[RawTreeEntry]) -> MergeResult<Oid> {
            Ok(self.put_tree(entries.to_vec()))
        }
    }

    struct NoRenames;
    impl RenameDetector for NoRenames {
        fn diff(&self, _: &dyn ObjectStore, _: Oid, _: Oid, _: RenameDetectOpts) -> MergeResult<Vec<FilePair>> {
            Ok(Vec::new())
        }
    }

    struct TakeTheirs;
    impl ContentMerger for TakeTheirs {
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

    #[test]
    fn fast_forward_merge_is_clean() {
        let store = FakeStore::default();
        let blob = store.put_blob(b"hello");
        let tree = store.put_tree(vec![RawTreeEntry { name: "a".into(), mode: Mode::from(FileMode::Regular), oid: blob }]);

        let mut store = store;
        let detector = NoRenames;
        let merger = TakeTheirs;
        let submodules = NullSubmoduleMerger;
        let mut collaborators = Collaborators {
            store: &mut store,
            detector: &detector,
            content_merger: &merger,
            submodule_merger: &submodules,
        };
        let opts = MergeOptions { verbosity: Verbosity::Quiet, ..Default::default() };
        let out = merge_trees(&mut collaborators, tree, tree, tree, &opts).unwrap();
        assert!(out.clean);
        assert_eq!(out.result_tree, tree);
        assert!(out.unmerged.is_empty());
    }

    #[test]
    fn content_conflict_is_reported_unmerged() {
        let store = FakeStore::default();
        let base_blob = store.put_blob(b"base");
        let side1_blob = store.put_blob(b"side1");
        let side2_blob = store.put_blob(b"side2");
        let base_tree =
            store.put_tree(vec![RawTreeEntry { name: "a".into(), mode: Mode::from(FileMode::Regular), oid: base_blob }]);
        let side1_tree =
            store.put_tree(vec![RawTreeEntry { name: "a".into(), mode: Mode::from(FileMode::Regular), oid: side1_blob }]);
        let side2_tree =
            store.put_tree(vec![RawTreeEntry { name: "a".into(), mode: Mode::from(FileMode::Regular), oid: side2_blob }]);

        let mut store = store;
        let detector = NoRenames;
        let merger = TakeTheirs;
        let submodules = NullSubmoduleMerger;
        let mut collaborators = Collaborators {
            store: &mut store,
            detector: &detector,
            content_merger: &merger,
            submodule_merger: &submodules,
        };
        let opts = MergeOptions { verbosity: Verbosity::Quiet, ..Default::default() };
        let out = merge_trees(&mut collaborators, base_tree, side1_tree, side2_tree, &opts).unwrap();
        assert!(!out.clean);
        assert_eq!(out.unmerged.len(), 1);
        assert_eq!(out.unmerged[0].path, "a");
        let _ = VersionInfo::NULL;
    }

    /// §8 "Universal properties": a small set of files over a fixed name pool,
    /// including one level of nesting under "d", used to drive the
    /// idempotence/fast-forward/determinism properties below with `quickcheck`
    /// rather than hand-picked fixtures, the way the teacher's own `obj/tree.rs`
    /// property tests are built.
    #[derive(Clone, Debug)]
    struct ArbFiles(Vec<(&'static str, u8)>);

    impl Arbitrary for ArbFiles {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let mut files = Vec::new();
            for name in ["a", "b", "c", "d/a", "d/b"] {
                if bool::arbitrary(g) {
                    files.push((name, u8::arbitrary(g) % 4));
                }
            }
            ArbFiles(files)
        }
    }

    impl ArbFiles {
        fn build(&self, store: &FakeStore) -> Oid {
            let mut root_entries = Vec::new();
            let mut nested = Vec::new();
            for (path, byte) in &self.0 {
                match path.split_once('/') {
                    Some((_, rest)) => nested.push((rest, *byte)),
                    None => root_entries.push(RawTreeEntry {
                        name: (*path).to_owned(),
                        mode: Mode::from(FileMode::Regular),
                        oid: store.put_blob(&[*byte]),
                    }),
                }
            }
            if !nested.is_empty() {
                let nested_entries = nested
                    .iter()
                    .map(|(name, byte)| RawTreeEntry {
                        name: (*name).to_owned(),
                        mode: Mode::from(FileMode::Regular),
                        oid: store.put_blob(&[*byte]),
                    })
                    .collect();
                let dir_oid = store.put_tree(nested_entries);
                root_entries.push(RawTreeEntry { name: "d".to_owned(), mode: Mode::from(FileMode::Tree), oid: dir_oid });
            }
            store.put_tree(root_entries)
        }
    }

    fn run_merge(store: &mut FakeStore, base: Oid, side1: Oid, side2: Oid) -> MergeOutput {
        let detector = NoRenames;
        let merger = TakeTheirs;
        let submodules = NullSubmoduleMerger;
        let mut collaborators = Collaborators {
            store,
            detector: &detector,
            content_merger: &merger,
            submodule_merger: &submodules,
        };
        let opts = MergeOptions { verbosity: Verbosity::Quiet, ..Default::default() };
        merge_trees(&mut collaborators, base, side1, side2, &opts).unwrap()
    }

    /// §8 property 1: merging `{B, S, S}` always yields `S`, clean, with nothing unmerged.
    #[quickcheck_macros::quickcheck]
    fn idempotent_merge_of_identical_sides_is_clean(files: ArbFiles) -> bool {
        let store = FakeStore::default();
        let tree = files.build(&store);
        let mut store = store;
        let out = run_merge(&mut store, tree, tree, tree);
        out.clean && out.result_tree == tree && out.unmerged.is_empty()
    }

    /// §8 property 2: merging `{B, B, S}` always fast-forwards to `S`, clean.
    #[quickcheck_macros::quickcheck]
    fn fast_forward_to_either_side_is_clean(base: ArbFiles, side: ArbFiles) -> bool {
        let store = FakeStore::default();
        let base_tree = base.build(&store);
        let side_tree = side.build(&store);
        let mut store = store;
        let out = run_merge(&mut store, base_tree, base_tree, side_tree);
        out.clean && out.result_tree == side_tree
    }

    /// §8 property 4: identical inputs and options produce a bytewise identical result
    /// across repeated runs.
    #[quickcheck_macros::quickcheck]
    fn merge_is_deterministic_across_runs(base: ArbFiles, side1: ArbFiles, side2: ArbFiles) -> bool {
        let store = FakeStore::default();
        let base_tree = base.build(&store);
        let side1_tree = side1.build(&store);
        let side2_tree = side2.build(&store);
        let mut store = store;
        let first = run_merge(&mut store, base_tree, side1_tree, side2_tree);
        let second = run_merge(&mut store, base_tree, side1_tree, side2_tree);
        first.result_tree == second.result_tree && first.unmerged.len() == second.unmerged.len()
    }
}
