//! File modes. Grounded in the teacher's `obj.rs` `FileMode` enum, extended with an
//! explicit null mode (§3: "a designated null OID marks absence"; mode mirrors that —
//! `is_null ⇒ result.mode == 0`, and no real mode is ever octal zero).

use num_enum::TryFromPrimitive;
use std::fmt::{self, Display, Formatter};

#[derive(Copy, PartialEq, Eq, Clone, TryFromPrimitive, PartialOrd, Ord, Debug, Hash)]
#[repr(u32)]
// ordering matters: we want TREE ordered after the "file" variants when sorting tree
// entries (files before directories at equal basename, see `TreeEntry::sort_key`)
pub enum FileMode {
    Regular = 0o100644,
    Executable = 0o100755,
    Symlink = 0o120000,
    Tree = 0o40000,
    Gitlink = 0o160000,
}

impl FileMode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_regular_or_executable(self) -> bool {
        matches!(self, FileMode::Regular | FileMode::Executable)
    }

    pub fn is_blob(self) -> bool {
        matches!(self, FileMode::Regular | FileMode::Executable | FileMode::Symlink)
    }

    pub fn is_tree(self) -> bool {
        matches!(self, FileMode::Tree)
    }

    pub fn is_gitlink(self) -> bool {
        matches!(self, FileMode::Gitlink)
    }

    /// the high bits of the octal mode, used to decide whether two modes are of
    /// "compatible" type (§3) regardless of permission bits
    pub fn type_bits(self) -> u32 {
        self.as_u32() & 0o170000
    }
}

impl Display for FileMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.as_u32())
    }
}

/// A `FileMode` plus the possibility of absence. `Mode::NULL` is the only representation
/// of "no object at this position" — it is distinct from every real mode, all of which
/// have nonzero octal type bits.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Mode(u32);

impl Mode {
    pub const NULL: Self = Self(0);

    pub fn from_file_mode(mode: FileMode) -> Self {
        Self(mode.as_u32())
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn file_mode(self) -> Option<FileMode> {
        FileMode::try_from(self.0).ok()
    }

    pub fn is_tree(self) -> bool {
        self.file_mode().is_some_and(FileMode::is_tree)
    }

    pub fn is_blob(self) -> bool {
        self.file_mode().is_some_and(FileMode::is_blob)
    }

    pub fn is_gitlink(self) -> bool {
        self.file_mode().is_some_and(FileMode::is_gitlink)
    }

    /// §3: "two modes are compatible if their high bits (type) agree"
    pub fn is_type_compatible(self, other: Self) -> bool {
        !self.is_null() && !other.is_null() && (self.0 & 0o170000) == (other.0 & 0o170000)
    }
}

impl From<FileMode> for Mode {
    fn from(mode: FileMode) -> Self {
        Self::from_file_mode(mode)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::NULL
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}
