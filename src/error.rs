// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The error and three-valued lookup vocabulary shared across the crate.
//!
//! Lookups never conflate "the name is absent" with "the lookup failed":
//! the former is [`Lookup::NotFound`], a value; the latter is `Err(Error)`.

use std::fmt;

/// Errors produced by volume-system, filesystem, and query operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A metadata or block address fell outside `[first, last]`.
    #[error("address {addr} out of range [{first}, {last}]")]
    WalkRange { addr: u64, first: u64, last: u64 },

    /// A caller supplied an invalid argument (empty buffer, zero length, ...).
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),

    /// The underlying image could not be read.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    /// A metadata address does not name a valid entry in this filesystem.
    #[error("{0} is not a valid metadata address")]
    InodeNum(u64),

    /// A filename or path component was not valid UTF-8 / could not be
    /// converted from the on-disk encoding.
    #[error("encoding conversion failed: {0}")]
    Unicode(&'static str),

    /// Volume-system autodetection found more than one plausible, mutually
    /// exclusive classification.
    #[error("unknown volume system type ({0})")]
    UnknownType(String),

    /// An explicit volume-system type was requested that no opener supports.
    #[error("unsupported volume system type: {0:?}")]
    UnsupportedType(crate::volume::VsType),

    /// A directory extent or metadata structure is internally inconsistent
    /// in a way that cannot be attributed to I/O failure.
    #[error("corrupted filesystem structure: {0}")]
    Corrupted(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The outcome of a lookup that can legitimately fail to find its target
/// without that being an error.
///
/// Keeping this as a distinct type (rather than `Option` or a sentinel
/// error variant) means a caller who forgets to handle the "not found"
/// case gets a compile error, not a silently wrong answer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Found(v) => write!(f, "found({v:?})"),
            Lookup::NotFound => write!(f, "not found"),
        }
    }
}

/// Control flow returned by walk callbacks (§5: cancellation).
///
/// Callbacks execute inline on the caller's stack; there is no implicit
/// suspension, so `Stop` is the only way to cut a walk short without an
/// error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalkControl {
    Continue,
    Stop,
}
