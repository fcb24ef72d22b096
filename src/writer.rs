//! The tree writer (§4.7): walks the path table in reverse lexicographic order,
//! closing directory frames bottom-up as it crosses out of each subtree, and writes
//! the resulting tree objects to the object store.
//!
//! Ordinary directories never get their own path-table row appended to the
//! accumulator — the writer derives subtree boundaries from each leaf's
//! `directory_name` handle and closes frames itself, synthesizing the directory's
//! tree entry from the freshly computed subtree OID. `ensure_parent_chain`
//! (table.rs) does insert placeholder `Tree`-mode rows for bookkeeping during D/F
//! and directory-rename relocation, so those rows are explicitly skipped here —
//! trusting one would mean writing a stale OID instead of the real, recomputed one.
//!
//! Frame membership is decided by `DirName::is_same_directory` (pointer identity),
//! never by comparing path strings — the same rule `resolve.rs` follows for
//! `directory_has_content`. Path strings still drive the frame-nesting walk itself
//! (deciding how many levels to open or close crossing into an unrelated subtree),
//! since a `DirName` carries no hierarchy information of its own.

use crate::error::MergeResult;
use crate::hash::Oid;
use crate::interner::DirName;
use crate::mode::{FileMode, Mode};
use crate::table::{self, PathTable};
use crate::traits::{ObjectStore, RawTreeEntry};

struct Frame {
    dir_name: DirName,
    path: String,
    start: usize,
}

pub struct TreeWriter<'a> {
    store: &'a mut dyn ObjectStore,
}

impl<'a> TreeWriter<'a> {
    pub fn new(store: &'a mut dyn ObjectStore) -> Self {
        Self { store }
    }

    pub fn write(&mut self, table: &mut PathTable) -> MergeResult<Oid> {
        let mut keys: Vec<String> = table.keys().cloned().collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));

        let root_dir_name = table.intern_dir("");
        let mut stack = vec![Frame { dir_name: root_dir_name, path: String::new(), start: 0 }];
        let mut accumulator: Vec<RawTreeEntry> = Vec::new();

        for key in &keys {
            let leaf = {
                let info = table.get(key).unwrap_or_else(|| bug!("key `{}` vanished mid-walk", key)).merged();
                if info.is_null || info.result.mode.is_tree() {
                    None
                } else {
                    Some((info.directory_name.as_str().to_owned(), info.directory_name.clone(), info.basename_offset, info.result))
                }
            };
            let Some((dir_path, dir_name, basename_offset, result)) = leaf else { continue };

            while stack.len() > 1 && !is_ancestor_or_self(&stack.last().unwrap().path, &dir_path) {
                self.close_frame(&mut stack, &mut accumulator)?;
            }
            while !stack.last().unwrap().dir_name.is_same_directory(&dir_name) {
                let parent_path = stack.last().unwrap().path.clone();
                let next = next_component_path(&parent_path, &dir_path);
                let next_dir_name = table.intern_dir(&next);
                stack.push(Frame { dir_name: next_dir_name, path: next, start: accumulator.len() });
            }

            let basename = &key[basename_offset..];
            accumulator.push(RawTreeEntry { name: basename.to_owned(), mode: result.mode, oid: result.oid });
        }

        while stack.len() > 1 {
            self.close_frame(&mut stack, &mut accumulator)?;
        }

        let root = stack.pop().unwrap_or_else(|| bug!("root frame missing at end of tree write"));
        let mut root_entries = accumulator.split_off(root.start);
        sort_entries(&mut root_entries);
        self.store.write_tree(&root_entries)
    }

    /// closes the innermost open frame, writing its (possibly empty) subtree. A
    /// directory whose subtree ended up with no surviving entries vanishes from its
    /// parent entirely, matching how an entirely-deleted directory behaves in a
    /// real tree (§4.7 "an entry with `is_null` is not appended").
    fn close_frame(&mut self, stack: &mut Vec<Frame>, accumulator: &mut Vec<RawTreeEntry>) -> MergeResult<()> {
        let frame = stack.pop().unwrap_or_else(|| bug!("close_frame called with no open frame"));
        let mut entries = accumulator.split_off(frame.start);
        if entries.is_empty() {
            return Ok(());
        }
        sort_entries(&mut entries);
        let oid = self.store.write_tree(&entries)?;
        accumulator.push(RawTreeEntry {
            name: table::basename(&frame.path).to_owned(),
            mode: Mode::from(FileMode::Tree),
            oid,
        });
        Ok(())
    }
}

fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path == ancestor || (path.len() > ancestor.len() && path.starts_with(ancestor) && path.as_bytes()[ancestor.len()] == b'/')
}

/// the path of `target`'s ancestor directory that is `parent`'s immediate child.
fn next_component_path(parent: &str, target: &str) -> String {
    let rest = if parent.is_empty() { target } else { &target[parent.len() + 1..] };
    let first = rest.split('/').next().unwrap_or(rest);
    if parent.is_empty() { first.to_owned() } else { format!("{}/{}", parent, first) }
}

/// files sort before directories at equal basename, as though directory names
/// carried a trailing slash (§4.7, grounded in the teacher's `TreeEntry::sort_path`).
fn sort_entries(entries: &mut [RawTreeEntry]) {
    entries.sort_by_cached_key(|e| if e.mode.is_tree() { format!("{}/", e.name) } else { e.name.clone() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, MergedInfo, VersionInfo};
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeStore {
        trees: RefCell<Vec<Vec<RawTreeEntry>>>,
    }

    impl ObjectStore for FakeStore {
        fn read_blob(&self, _oid: Oid) -> MergeResult<Vec<u8>> {
            unimplemented!()
        }
        fn write_blob(&mut self, _bytes: &[u8]) -> MergeResult<Oid> {
            unimplemented!()
        }
        fn read_tree(&self, _oid: Oid) -> MergeResult<Vec<RawTreeEntry>> {
            unimplemented!()
        }
        fn write_tree(&mut self, entries: &[RawTreeEntry]) -> MergeResult<Oid> {
            let mut trees = self.trees.borrow_mut();
            let idx = trees.len();
            trees.push(entries.to_vec());
            Ok(Oid::new([idx as u8 + 1; 20]))
        }
    }

    fn regular(byte: u8) -> VersionInfo {
        VersionInfo { mode: Mode::from(FileMode::Regular), oid: Oid::new([byte; 20]) }
    }

    #[test]
    fn writes_nested_directories_bottom_up() {
        let mut table = PathTable::new();
        let root = table.intern_dir("");
        let a_dir = table.intern_dir("a");

        table.insert("b", Entry::Resolved(MergedInfo::new(regular(1), root, 0)));
        table.insert("a/b", Entry::Resolved(MergedInfo::new(regular(2), a_dir.clone(), 2)));
        table.insert("a/c", Entry::Resolved(MergedInfo::new(regular(3), a_dir, 2)));

        let mut store = FakeStore::default();
        let mut writer = TreeWriter::new(&mut store);
        writer.write(&mut table).unwrap();

        let trees = store.trees.into_inner();
        // first write is the "a" subtree, second is the root
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
        let root_names: Vec<_> = trees[1].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(root_names, vec!["a", "b"]);
        assert!(trees[1].iter().find(|e| e.name == "a").unwrap().mode.is_tree());
    }

    #[test]
    fn deleted_path_is_skipped_entirely() {
        let mut table = PathTable::new();
        let root = table.intern_dir("");
        table.insert("a", Entry::Resolved(MergedInfo::null(root, 0)));

        let mut store = FakeStore::default();
        let mut writer = TreeWriter::new(&mut store);
        writer.write(&mut table).unwrap();

        let trees = store.trees.into_inner();
        assert_eq!(trees.len(), 1);
        assert!(trees[0].is_empty());
    }

    /// exercises the multi-level push in the second `while` loop of `write`: the
    /// first (and only) leaf is three directories deep, so no frame for `a` or
    /// `a/b` exists yet when it is reached and both must be opened in one step.
    #[test]
    fn writes_deeply_nested_single_leaf() {
        let mut table = PathTable::new();
        let a_b = table.intern_dir("a/b");
        table.insert("a/b/c", Entry::Resolved(MergedInfo::new(regular(9), a_b, 4)));

        let mut store = FakeStore::default();
        let mut writer = TreeWriter::new(&mut store);
        writer.write(&mut table).unwrap();

        let trees = store.trees.into_inner();
        // "a/b" subtree, then "a" subtree, then root
        assert_eq!(trees.len(), 3);
        assert_eq!(trees[0].iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(trees[1].iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(trees[2].iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["a"]);
    }
}
