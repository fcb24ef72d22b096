//! The path table (§3): the central structure every stage reads and mutates.

use crate::entry::{ConflictInfo, Entry, MergedInfo};
use crate::interner::{DirInterner, DirName};
use rustc_hash::{FxHashMap, FxHashSet};

/// mapping from full path (no leading/trailing slash) to its table entry, plus the
/// auxiliary structures the later stages need (§3 "Auxiliary maps and lists")
#[derive(Default)]
pub struct PathTable {
    entries: FxHashMap<String, Entry>,
    interner: DirInterner,
    /// directory paths that existed in the base and on exactly one side — candidates
    /// for directory-rename detection (§4.1)
    pub possible_dir_rename_sources: FxHashSet<String>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_dir(&mut self, path: &str) -> DirName {
        self.interner.intern(path)
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Entry> {
        self.entries.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: Entry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        self.entries.remove(path)
    }

    /// moves the entry at `from` to `to`, returning the entry previously at `to` (if
    /// any) so callers can decide how to merge the two (§4.2 "Applying directory
    /// renames" step 4)
    pub fn rename(&mut self, from: &str, to: &str) -> Option<Entry> {
        let entry = self.entries.remove(from).unwrap_or_else(|| {
            bug!("attempted to rename nonexistent path table entry `{}`", from)
        });
        self.entries.insert(to.to_owned(), entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Entry)> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// entries the resolver has settled as unclean (§3 "Unmerged")
    pub fn unmerged(&self) -> impl Iterator<Item = (&String, &ConflictInfo)> {
        self.entries.iter().filter_map(|(path, entry)| match entry {
            Entry::Provisional(conflict) if !conflict.merged.clean => Some((path, &**conflict)),
            _ => None,
        })
    }

    /// ensures a parent-directory entry exists for `path`, interning the chain of
    /// ancestor directory names as needed (§3: "every non-root path P has an entry for
    /// its parent directory in the table"); returns the handle for `path`'s immediate
    /// parent directory
    pub fn ensure_parent_chain(&mut self, path: &str) -> DirName {
        let parent = parent_of(path);
        if let Some(existing) = self.get(parent) {
            return existing.merged().directory_name.clone();
        }
        let grandparent_handle = if parent.is_empty() {
            self.intern_dir("")
        } else {
            self.ensure_parent_chain(parent)
        };
        let dir_name = self.intern_dir(parent);
        let basename_offset = basename_offset(parent);
        self.insert(
            parent.to_owned(),
            Entry::Resolved(MergedInfo::new(
                crate::entry::VersionInfo {
                    mode: crate::mode::Mode::from(crate::mode::FileMode::Tree),
                    oid: crate::hash::Oid::UNKNOWN,
                },
                grandparent_handle,
                basename_offset,
            )),
        );
        dir_name
    }
}

/// `"foo/bar/baz" -> "foo/bar"`, `"foo" -> ""`
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// offset of the final path component within `path`
pub fn basename_offset(path: &str) -> usize {
    match path.rfind('/') {
        Some(idx) => idx + 1,
        None => 0,
    }
}

pub fn basename(path: &str) -> &str {
    &path[basename_offset(path)..]
}
