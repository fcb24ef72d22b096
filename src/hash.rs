//! Content-addressed object identifiers. Grounded in the teacher's `hash.rs`, trimmed
//! to just the parts the merge engine itself needs (no pack/crc concerns here — those
//! belong to the object-store implementation, which is out of scope, §1).

use anyhow::ensure;
use hex::FromHex;
use rustc_hash::FxHasher;
use std::convert::TryInto;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hasher;
use std::str::FromStr;

pub const OID_SIZE: usize = 20;

/// An opaque fixed-width content hash. Equality is byte equality.
#[derive(PartialEq, Eq, Hash, Clone, Ord, PartialOrd, Copy)]
#[repr(transparent)]
pub struct Oid([u8; OID_SIZE]);

impl Oid {
    /// the designated null oid; marks the absence of an object at a position
    pub const UNKNOWN: Self = Self([0; OID_SIZE]);

    #[inline]
    pub const fn new(bytes: [u8; OID_SIZE]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; OID_SIZE] {
        &self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::UNKNOWN
    }

    #[inline]
    pub fn is_known(self) -> bool {
        !self.is_null()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for Oid {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl FromStr for Oid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end();
        ensure!(s.len() == OID_SIZE * 2, "oid hex string has the wrong length");
        let bytes = Vec::from_hex(s)?;
        Ok(Self(bytes.try_into().unwrap()))
    }
}

impl AsRef<[u8]> for Oid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Oid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        if f.alternate() { write!(f, "{}", &hex[..7]) } else { write!(f, "{}", hex) }
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Oid {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self((0..OID_SIZE).map(|_| u8::arbitrary(g)).collect::<Vec<_>>().try_into().unwrap())
    }
}

pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> Oid {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    Oid(hasher.finalize().into())
}

pub trait MakeHash {
    fn mk_fx_hash(&self) -> u64;
}

impl<H: std::hash::Hash + ?Sized> MakeHash for H {
    #[inline]
    fn mk_fx_hash(&self) -> u64 {
        let mut state = FxHasher::default();
        self.hash(&mut state);
        state.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_roundtrips_through_hex() {
        let oid = hash_bytes(b"hello world");
        let s = oid.to_hex();
        let parsed: Oid = s.parse().unwrap();
        assert_eq!(oid, parsed);
    }

    #[test]
    fn unknown_oid_is_null() {
        assert!(Oid::UNKNOWN.is_null());
        assert!(!Oid::UNKNOWN.is_known());
        assert!(hash_bytes(b"x").is_known());
    }
}
