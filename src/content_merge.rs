//! Three-way content merge (§4.4): mode resolution, type-mismatch fallback, and
//! dispatch to the external collaborators for same-typed content (regular files,
//! symlinks, submodules). This is the only place the engine calls into
//! [`ContentMerger`] or [`SubmoduleMerger`].

use crate::diagnostics::Diagnostics;
use crate::entry::VersionInfo;
use crate::error::MergeResult;
use crate::mode::{FileMode, Mode};
use crate::traits::{
    ContentMergeLabels, ContentMerger, MergeVariant, ObjectStore, SubmoduleMerger,
    SubmoduleResolution,
};

pub struct ContentMergeInputs<'a> {
    pub path: &'a str,
    pub base: VersionInfo,
    pub side1: VersionInfo,
    pub side2: VersionInfo,
    pub ancestor_label: &'a str,
    pub branch1: &'a str,
    pub branch2: &'a str,
    pub variant: MergeVariant,
    pub marker_size: usize,
}

pub struct ContentMergeResult {
    pub result: VersionInfo,
    pub clean: bool,
}

/// §4.4 "Mode resolution": `a` is side1 ("ours"), `b` is side2 ("theirs"), `o` is base.
/// Mirrors git's own `a`/`b`/`o` naming for this exact computation.
fn resolve_mode(o: Mode, a: Mode, b: Mode) -> (Mode, bool) {
    if a == b || a == o {
        (b, true)
    } else {
        (a, b == o)
    }
}

/// rank used to prefer regular files over symlinks, and submodules over either,
/// when the two sides disagree on object *type* (§4.4 "Type mismatch", §9
/// "Type-mismatch resolution order"). Lower ranks win.
fn type_rank(mode: Mode) -> u8 {
    match mode.file_mode() {
        Some(FileMode::Gitlink) => 0,
        Some(FileMode::Regular) | Some(FileMode::Executable) => 1,
        Some(FileMode::Symlink) => 2,
        _ => 3,
    }
}

pub fn merge_content(
    store: &mut dyn ObjectStore,
    content_merger: &dyn ContentMerger,
    submodule_merger: &dyn SubmoduleMerger,
    diagnostics: &mut Diagnostics,
    depth: usize,
    inputs: ContentMergeInputs<'_>,
) -> MergeResult<ContentMergeResult> {
    let ContentMergeInputs {
        path,
        base,
        side1,
        side2,
        ancestor_label,
        branch1,
        branch2,
        variant,
        marker_size,
    } = inputs;

    // §4.4 "Variant override": only meaningful at the outermost call; every
    // recursive call passes `MergeVariant::Normal` (§4.8 depth semantics).
    match variant {
        MergeVariant::Ours => return Ok(ContentMergeResult { result: side1, clean: true }),
        MergeVariant::Theirs => return Ok(ContentMergeResult { result: side2, clean: true }),
        MergeVariant::Normal => {}
    }

    if !side1.mode.is_type_compatible(side2.mode) {
        diagnostics.warn(format!(
            "`{}`: type changed between both sides (mode {} vs {}), keeping higher-priority type",
            path, side1.mode, side2.mode
        ));
        let winner = if type_rank(side1.mode) <= type_rank(side2.mode) { side1 } else { side2 };
        return Ok(ContentMergeResult { result: winner, clean: false });
    }

    let (mode, mode_clean) = resolve_mode(base.mode, side1.mode, side2.mode);

    match side1.mode.file_mode() {
        Some(FileMode::Regular) | Some(FileMode::Executable) => {
            let base_bytes = if base.oid.is_known() { store.read_blob(base.oid)? } else { Vec::new() };
            let side1_bytes = store.read_blob(side1.oid)?;
            let side2_bytes = store.read_blob(side2.oid)?;
            let labels = ContentMergeLabels { path, ancestor: ancestor_label, branch1, branch2 };
            let outcome = content_merger.three_way(
                &base_bytes,
                &side1_bytes,
                &side2_bytes,
                labels,
                variant,
                marker_size,
            )?;
            let oid = store.write_blob(&outcome.bytes)?;
            Ok(ContentMergeResult {
                result: VersionInfo { mode, oid },
                clean: outcome.clean && mode_clean,
            })
        }
        Some(FileMode::Symlink) => {
            // §4.4 "Symlinks: take side1; unclean unless the two sides agree."
            Ok(ContentMergeResult { result: side1, clean: side1.oid == side2.oid && mode_clean })
        }
        Some(FileMode::Gitlink) => {
            let resolution = submodule_merger.merge(
                path,
                base.oid,
                side1.oid,
                side2.oid,
                /* search_for_merge */ depth == 0,
            )?;
            match resolution {
                SubmoduleResolution::Resolved(oid) =>
                    Ok(ContentMergeResult { result: VersionInfo { mode, oid }, clean: mode_clean }),
                SubmoduleResolution::Unresolved { suggestion } => {
                    diagnostics.warn(format!(
                        "`{}`: submodule merge unresolved{}",
                        path,
                        suggestion.map(|oid| format!(", suggesting {:#}", oid)).unwrap_or_default()
                    ));
                    let oid = suggestion.unwrap_or(side1.oid);
                    Ok(ContentMergeResult { result: VersionInfo { mode, oid }, clean: false })
                }
            }
        }
        Some(FileMode::Tree) | None => bug!("content merge invoked on a directory or null mode at `{}`", path),
    }
}
