//! Path disambiguation (§4.6), grounded in the teacher's `fs::UniquePath` /
//! `RenameIndex`, generalized from filesystem-existence checks to path-table-membership
//! checks (this engine never touches a working tree, §1 Non-goals).

use crate::table::PathTable;
use std::fmt::Write as _;

fn flatten_branch(branch: &str) -> String {
    branch.replace('/', "_")
}

/// `p + "~" + flatten(branch)`, disambiguated with `_0`, `_1`, … against the path
/// table if that's already taken (§4.6).
pub fn unique_path(table: &PathTable, path: &str, branch: &str) -> String {
    let base = format!("{}~{}", path, flatten_branch(branch));
    if !table.contains(&base) {
        return base;
    }
    let mut i = 0u32;
    loop {
        let mut candidate = base.clone();
        write!(candidate, "_{}", i).unwrap();
        if !table.contains(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, MergedInfo};
    use crate::interner::DirInterner;

    #[test]
    fn disambiguates_against_existing_paths() {
        let mut table = PathTable::new();
        let mut interner = DirInterner::new();
        let root = interner.intern("");
        table.insert(
            "a~HEAD",
            Entry::Resolved(MergedInfo::null(root.clone(), 0)),
        );
        let p = unique_path(&table, "a", "HEAD");
        assert_eq!(p, "a~HEAD_0");

        table.insert("a~HEAD_0", Entry::Resolved(MergedInfo::null(root, 0)));
        let p = unique_path(&table, "a", "HEAD");
        assert_eq!(p, "a~HEAD_1");
    }

    #[test]
    fn flattens_slashes_in_branch_name() {
        let table = PathTable::new();
        let p = unique_path(&table, "a", "refs/heads/feature");
        assert_eq!(p, "a~refs_heads_feature");
    }
}
