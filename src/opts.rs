//! The merge engine's options surface (§6). Grounded in the teacher's `merge.rs`
//! `MergeOpts` (a plain struct with a `DEFAULT` const), not `config.rs` — there is no
//! parsed config file here, this engine has no notion of a repository configuration.

use crate::traits::MergeVariant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DetectRenames {
    Off,
    On,
    /// clamped to `On` — the engine does not detect copies (§1 Non-goals)
    Copy,
}

impl DetectRenames {
    pub fn is_enabled(self) -> bool {
        !matches!(self, DetectRenames::Off)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DetectDirectoryRenames {
    None,
    /// infer directory renames, but only ever record the conflicting ones — don't
    /// silently move files that would split a directory rename's votes
    Conflict,
    True,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub detect_renames: DetectRenames,
    pub detect_directory_renames: DetectDirectoryRenames,
    pub rename_limit: usize,
    pub rename_score: u32,
    pub recursive_variant: MergeVariant,
    pub renormalize: bool,
    pub xdl_opts: u32,
    pub branch1: String,
    pub branch2: String,
    pub ancestor: String,
    pub subtree_shift: Option<String>,
    pub verbosity: Verbosity,
    pub buffer_output: bool,
}

impl MergeOptions {
    pub const DEFAULT_RENAME_LIMIT: usize = 1000;
    pub const DEFAULT_RENAME_SCORE: u32 = 50;
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            detect_renames: DetectRenames::On,
            detect_directory_renames: DetectDirectoryRenames::True,
            rename_limit: Self::DEFAULT_RENAME_LIMIT,
            rename_score: Self::DEFAULT_RENAME_SCORE,
            recursive_variant: MergeVariant::Normal,
            renormalize: false,
            xdl_opts: 0,
            branch1: "HEAD".to_owned(),
            branch2: "MERGE_HEAD".to_owned(),
            ancestor: "merged common ancestors".to_owned(),
            subtree_shift: None,
            verbosity: Verbosity::Normal,
            buffer_output: false,
        }
    }
}
