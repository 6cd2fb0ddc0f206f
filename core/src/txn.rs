//! Transaction id and prepare-state types shared across the chain model.

use serde_derive::{Deserialize, Serialize};

/// A 64-bit transaction identifier, with two reserved sentinel values.
/// Wrapped in a newtype so the sentinels can't silently be confused with
/// an ordinary id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// No transaction associated (e.g. an unset `start_txn`).
    pub const NONE: TxnId = TxnId(0);
    /// The transaction was rolled back; entries carrying this id are
    /// skipped wherever they appear in a chain.
    pub const ABORTED: TxnId = TxnId(u64::MAX - 1);
    /// Unbounded upper id, used as the default `stop.txn`.
    pub const MAX: TxnId = TxnId(u64::MAX);

    pub const fn new(id: u64) -> Self {
        TxnId(id)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn is_aborted(self) -> bool {
        self == Self::ABORTED
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NONE => write!(f, "none"),
            Self::ABORTED => write!(f, "aborted"),
            Self::MAX => write!(f, "max"),
            TxnId(id) => write!(f, "{id}"),
        }
    }
}

/// State of a two-phase-commit prepared transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrepareState {
    #[default]
    None,
    Locked,
    InProgress,
    Resolved,
}

impl PrepareState {
    /// `Locked` and `InProgress` are treated identically everywhere except
    /// under eviction, where only `InProgress` may be selected.
    pub fn is_prepared_pending(self) -> bool {
        matches!(self, PrepareState::Locked | PrepareState::InProgress)
    }
}
