//! Collaborator interfaces (§6). Everything in this file is "addressed only by
//! interface" per §1 — the engine consumes these, it does not implement them.

use crate::error::MergeResult;
use crate::hash::Oid;
use crate::mode::Mode;
use smallvec::SmallVec;

/// one entry of a tree object, as read back from the object store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTreeEntry {
    pub name: String,
    pub mode: Mode,
    pub oid: Oid,
}

/// the content-addressed object store (§1, §6). Writes are idempotent by content hash.
pub trait ObjectStore {
    fn read_blob(&self, oid: Oid) -> MergeResult<Vec<u8>>;
    fn write_blob(&mut self, bytes: &[u8]) -> MergeResult<Oid>;
    /// entries sorted by basename (files before directories at equal basename, i.e.
    /// ties broken as though directory names carried a trailing slash, §4.7)
    fn read_tree(&self, oid: Oid) -> MergeResult<Vec<RawTreeEntry>>;
    fn write_tree(&mut self, entries: &[RawTreeEntry]) -> MergeResult<Oid>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenameStatus {
    Added,
    Renamed,
}

/// a `(old_path, new_path, status, score)` record produced by the external detector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePair {
    pub old_path: String,
    pub new_path: String,
    pub status: RenameStatus,
    pub score: u32,
}

#[derive(Copy, Clone, Debug)]
pub struct RenameDetectOpts {
    pub rename_limit: usize,
    pub rename_score: u32,
    /// whether copy detection should also be requested of the detector (the engine
    /// itself never distinguishes copies from renames, §1 Non-goals — this is passed
    /// straight through because some detectors fold copy candidates into the same
    /// pair stream as renames)
    pub detect_copies: bool,
}

/// file-pair-level rename detection (§1: explicitly out of scope for the engine
/// itself — it consumes pairs, it does not score similarity)
pub trait RenameDetector {
    fn diff(
        &self,
        store: &dyn ObjectStore,
        base_tree: Oid,
        side_tree: Oid,
        opts: RenameDetectOpts,
    ) -> MergeResult<Vec<FilePair>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeVariant {
    Normal,
    Ours,
    Theirs,
}

#[derive(Clone, Debug)]
pub struct ContentMergeLabels<'a> {
    pub path: &'a str,
    pub ancestor: &'a str,
    pub branch1: &'a str,
    pub branch2: &'a str,
}

pub struct ContentMergeOutcome {
    pub bytes: Vec<u8>,
    pub clean: bool,
}

/// the low-level three-way text merge / conflict-marker producer (§1: explicitly out
/// of scope — the engine delegates to this and only inspects `clean`)
pub trait ContentMerger {
    fn three_way(
        &self,
        base: &[u8],
        side1: &[u8],
        side2: &[u8],
        labels: ContentMergeLabels<'_>,
        variant: MergeVariant,
        marker_size: usize,
    ) -> MergeResult<ContentMergeOutcome>;
}

pub enum SubmoduleResolution {
    Resolved(Oid),
    Unresolved { suggestion: Option<Oid> },
}

/// submodule (gitlink) three-way merge (§4.4, §9 "Submodule-merger search")
pub trait SubmoduleMerger {
    fn merge(
        &self,
        path: &str,
        base: Oid,
        side1: Oid,
        side2: Oid,
        search_for_merge: bool,
    ) -> MergeResult<SubmoduleResolution>;
}

/// a submodule merger that never resolves anything, matching the teacher's own
/// unimplemented (`todo!`) submodule-merge arms (`merge.rs`) — submodules are always
/// left as path conflicts when the three oids differ, as §9 prescribes for engines
/// without a real submodule merger.
pub struct NullSubmoduleMerger;

impl SubmoduleMerger for NullSubmoduleMerger {
    fn merge(
        &self,
        _path: &str,
        _base: Oid,
        _side1: Oid,
        _side2: Oid,
        _search_for_merge: bool,
    ) -> MergeResult<SubmoduleResolution> {
        Ok(SubmoduleResolution::Unresolved { suggestion: None })
    }
}

/// commit-parent lookup for the best-common-ancestor search (§4.8 supplemental), plus
/// the commit -> tree resolution `merge_commits`/`merge_commits_from_graph` need to
/// turn commit oids into the tree oids the rest of the engine operates on — a detail
/// the distilled spec left implicit (§6 only lists `parents`/`committer_time`).
pub trait CommitGraph {
    fn parents(&self, commit: Oid) -> MergeResult<SmallVec<[Oid; 2]>>;
    fn committer_time(&self, commit: Oid) -> MergeResult<i64>;
    fn tree(&self, commit: Oid) -> MergeResult<Oid>;
}

/// optional working-tree/index integration point (§1 Non-goals, §6); the core never
/// calls this itself, it is purely a convenience for callers who want to fold it into
/// their own driver
pub trait WorkingTreeAdapter {
    fn apply(
        &mut self,
        result_tree: Oid,
        unmerged: &[crate::entry::UnmergedEntry],
    ) -> MergeResult<()>;
}
