//! Directory-name interning (§3, §4.7, §9).
//!
//! The tree writer decides where one subtree ends and the next begins purely by
//! comparing `directory_name` handles for pointer identity (§4.7) — byte comparison on
//! that hot path is explicitly disallowed by the spec's design notes. The teacher's
//! `interner.rs` gets there with a `bumpalo` arena and raw `&'static` slices handed out
//! of a `thread_local!`. We get the same pointer-identity guarantee with an `Rc<str>`
//! table instead (one of the two alternatives the spec's own design notes call out,
//! §9) — every entry under a given directory clones the same `Rc`, so
//! `Rc::ptr_eq` is a true pointer compare, and the table (and every path it handed
//! out) is dropped together with the owning engine instance, so there is no risk of
//! two concurrent engines aliasing each other's handles the way a process-global
//! interner would (§5, §9).
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// A directory path, interned so that two `DirName`s for the same directory are
/// trivially pointer-comparable via [`DirName::is_same_directory`].
#[derive(Clone, Debug)]
pub struct DirName(Rc<str>);

impl DirName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_same_directory(&self, other: &DirName) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for DirName {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_directory(other)
    }
}

impl Eq for DirName {
}

#[derive(Default)]
pub struct DirInterner {
    table: FxHashMap<Rc<str>, DirName>,
}

impl DirInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns the canonical handle for `path` (the root directory is interned as `""`)
    pub fn intern(&mut self, path: &str) -> DirName {
        if let Some(existing) = self.table.get(path) {
            return existing.clone();
        }
        let rc: Rc<str> = Rc::from(path);
        let handle = DirName(rc.clone());
        self.table.insert(rc, handle.clone());
        handle
    }
}
