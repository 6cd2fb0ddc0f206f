//! Error taxonomy for the reconciliation core.
//!
//! Three kinds only, matching the contract the reconciliation driver relies
//! on: transient contention (`Busy`), an invariant violation (`Panic`), and
//! allocator failure (`Alloc`). Out-of-order timestamp repair is not an
//! error at all -- it is a silent, logged mutation of the time window (see
//! `crate::time::repair_out_of_order`).

use std::fmt;

/// Result alias used throughout the crate.
pub type CResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Transient contention: a committed selection would strand an
    /// uncommitted successor, or a clean-after-reconciliation pass still
    /// found non-visible updates. The caller should re-schedule the page.
    Busy,

    /// Invariant violation: `VISIBILITY_ERR` was set and non-visible
    /// updates were found even so. The caller asserted full visibility.
    Panic,

    /// The allocator could not satisfy a request for a new update node or
    /// scratch buffer. Any partial state built before the failure has
    /// already been released.
    Alloc(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Busy => write!(f, "reconciliation busy: uncommitted or non-visible updates remain"),
            Error::Panic => write!(f, "reconciliation invariant violated: non-visible update under VISIBILITY_ERR"),
            Error::Alloc(err) => write!(f, "allocator failure: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Alloc(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Alloc(value)
    }
}
