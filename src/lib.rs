//! A three-way tree merge engine, modeled on git's recursive/ort merge strategy:
//! given a base tree and two divergent trees, produces a merged tree plus the set
//! of paths that could not be resolved automatically.
//!
//! The crate is organized as a pipeline (§4): [`collector`] builds the initial
//! path table from a synchronized three-way tree walk, [`rename`] and
//! [`rename_processor`] fold in rename detection, [`resolve`] settles every
//! remaining path, and [`writer`] turns the settled table back into tree objects.
//! [`driver`] adds best-common-ancestor search and [`merge`] ties the whole
//! pipeline together behind the two public entry points.
//!
//! Object storage, rename detection, and content merging are all collaborator
//! interfaces (see [`traits`]) that callers supply; this crate only orchestrates
//! them.

#[macro_use]
mod macros;

pub mod collector;
pub mod content_merge;
pub mod diagnostics;
pub mod driver;
pub mod entry;
pub mod error;
pub mod hash;
pub mod interner;
pub mod merge;
pub mod mode;
pub mod opts;
pub mod rename;
pub mod rename_processor;
pub mod resolve;
pub mod table;
pub mod traits;
pub mod unique_path;
pub mod writer;

pub use entry::{Side, UnmergedEntry, VersionInfo};
pub use error::{MergeEngineError, MergeErrorExt, MergeGenericError, MergeResult};
pub use hash::Oid;
pub use merge::{merge_commits, merge_commits_from_graph, merge_trees, Collaborators, MergeOutput};
pub use mode::{FileMode, Mode};
pub use opts::{DetectDirectoryRenames, DetectRenames, MergeOptions, Verbosity};
pub use traits::{
    CommitGraph, ContentMerger, FilePair, NullSubmoduleMerger, ObjectStore, RawTreeEntry,
    RenameDetectOpts, RenameDetector, RenameStatus, SubmoduleMerger, SubmoduleResolution,
    WorkingTreeAdapter,
};
