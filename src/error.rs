//! Error handling, modeled on the two-tier scheme used throughout the teacher crate:
//! an [`anyhow`]-backed generic result for the "just propagate it" case, plus a small
//! hand-rolled enum for the handful of outcomes a caller may want to match on, recovered
//! from the generic error via downcasting.

use crate::hash::Oid;
use std::fmt::{self, Display, Formatter};

pub type MergeResult<T> = Result<T, MergeGenericError>;
pub type MergeGenericError = anyhow::Error;

/// Failure modes a caller may want to match on explicitly. Everything else just flows
/// through as an opaque [`MergeGenericError`].
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum MergeEngineError {
    /// the object store could not produce an object the engine needed to read
    ObjectNotFound(Oid),
    /// a tree object's bytes did not parse as a sequence of `(mode, name, oid)` records
    MalformedTree(Oid),
    /// more than one ancestor was supplied but the driver does not yet support folding
    /// more than a small fixed number of bases pairwise in one call
    TooManyMergeBases(usize),
}

impl Display for MergeEngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MergeEngineError::ObjectNotFound(oid) =>
                write!(f, "object `{}` not found in object store", oid),
            MergeEngineError::MalformedTree(oid) => write!(f, "tree object `{}` is malformed", oid),
            MergeEngineError::TooManyMergeBases(n) =>
                write!(f, "cannot fold {} merge bases pairwise in a single call", n),
        }
    }
}

impl std::error::Error for MergeEngineError {
}

pub trait MergeErrorExt {
    fn is_fatal(&self) -> bool;
    fn try_into_engine_error(self) -> MergeResult<MergeEngineError>;
}

impl MergeErrorExt for MergeGenericError {
    /// every error that actually propagates out of a collaborator call is fatal (§7):
    /// per-path conflicts never take this path, they're recorded on the entry instead
    fn is_fatal(&self) -> bool {
        true
    }

    fn try_into_engine_error(self) -> MergeResult<MergeEngineError> {
        self.downcast::<MergeEngineError>()
    }
}

impl<T> MergeErrorExt for MergeResult<T> {
    fn is_fatal(&self) -> bool {
        match self {
            Ok(..) => false,
            Err(err) => err.is_fatal(),
        }
    }

    fn try_into_engine_error(self) -> MergeResult<MergeEngineError> {
        match self {
            Ok(..) => anyhow::bail!("not an error"),
            Err(err) => err.try_into_engine_error(),
        }
    }
}
