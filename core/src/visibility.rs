//! Visibility Oracle and the `TransactionManager` collaborator it is
//! built on.
//!
//! `TransactionManager` is implemented by the caller's transaction
//! subsystem; this crate never constructs global transaction state itself.
//! `VisibilityOracle` adds the HS-page exemption and is the only thing the
//! rest of the crate talks to.

use crate::txn::TxnId;

/// The transaction manager's externally-supplied queries.
pub trait TransactionManager {
    /// The lowest transaction id that is still active anywhere in the
    /// system. Any `txn_id >= last_running()` must be treated as
    /// uncommitted.
    fn last_running(&self) -> TxnId;

    /// True iff every active or future reader is guaranteed to see this
    /// entry: `txn` is committed and older than the oldest possible
    /// reader, and `ts` is at or before the pinned-oldest timestamp.
    fn visible_all(&self, txn: TxnId, ts: u64) -> bool;

    /// True iff `txn`/`ts` is visible under the current reconciliation's
    /// own snapshot.
    fn visible_to_snapshot(&self, txn: TxnId, ts: u64) -> bool;

    /// True iff `txn` has committed (not merely "not aborted").
    fn committed(&self, txn: TxnId) -> bool;

    /// The transaction id of the most recent checkpoint, used by the
    /// Save-Decision step under `CHECKPOINT` mode.
    fn checkpoint_txn_id(&self) -> TxnId;
}

/// Wraps a `TransactionManager` with the one reconciliation-wide exemption:
/// entries on a history-store page are implicitly fully visible, since HS
/// pages only ever hold values already displaced by a committed
/// reconciliation elsewhere.
pub struct VisibilityOracle<'a, M: TransactionManager + ?Sized> {
    mgr: &'a M,
    is_history_store: bool,
}

impl<'a, M: TransactionManager + ?Sized> VisibilityOracle<'a, M> {
    pub fn new(mgr: &'a M, is_history_store: bool) -> Self {
        Self { mgr, is_history_store }
    }

    pub fn is_history_store(&self) -> bool {
        self.is_history_store
    }

    pub fn committed(&self, txn: TxnId) -> bool {
        self.is_history_store || self.mgr.committed(txn)
    }

    pub fn visible_all(&self, txn: TxnId, ts: u64) -> bool {
        self.is_history_store || self.mgr.visible_all(txn, ts)
    }

    pub fn visible_to_snapshot(&self, txn: TxnId, ts: u64) -> bool {
        self.is_history_store || self.mgr.visible_to_snapshot(txn, ts)
    }

    pub fn checkpoint_txn_id(&self) -> TxnId {
        self.mgr.checkpoint_txn_id()
    }

    pub fn last_running(&self) -> TxnId {
        self.mgr.last_running()
    }
}

/// Test doubles reused by this crate's tests and by `demos`/`cli`'s
/// scenario walkthroughs. Not a real visibility implementation.
pub mod test_support {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// An in-memory transaction manager double: a fixed committed set plus
    /// watermarks, for unit and scenario tests. Not a real visibility
    /// implementation -- it has no notion of read timestamps beyond what's
    /// asked of it directly.
    #[derive(Default)]
    pub struct FakeTransactionManager {
        committed: Mutex<HashSet<u64>>,
        pub last_running: Mutex<TxnId>,
        pub pinned_oldest_ts: Mutex<u64>,
        pub checkpoint_txn: Mutex<TxnId>,
        pub snapshot_committed: Mutex<HashSet<u64>>,
    }

    impl FakeTransactionManager {
        pub fn new(last_running: TxnId) -> Self {
            Self {
                last_running: Mutex::new(last_running),
                ..Default::default()
            }
        }

        pub fn commit(&self, txn: TxnId) {
            self.committed.lock().unwrap().insert(txn.raw());
            self.snapshot_committed.lock().unwrap().insert(txn.raw());
        }
    }

    impl TransactionManager for FakeTransactionManager {
        fn last_running(&self) -> TxnId {
            *self.last_running.lock().unwrap()
        }

        fn visible_all(&self, txn: TxnId, ts: u64) -> bool {
            self.committed.lock().unwrap().contains(&txn.raw())
                && ts <= *self.pinned_oldest_ts.lock().unwrap()
        }

        fn visible_to_snapshot(&self, txn: TxnId, _ts: u64) -> bool {
            self.snapshot_committed.lock().unwrap().contains(&txn.raw())
        }

        fn committed(&self, txn: TxnId) -> bool {
            self.committed.lock().unwrap().contains(&txn.raw())
        }

        fn checkpoint_txn_id(&self) -> TxnId {
            *self.checkpoint_txn.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeTransactionManager;
    use super::*;

    #[test]
    fn history_store_page_is_always_visible() {
        let mgr = FakeTransactionManager::new(TxnId::new(1));
        let oracle = VisibilityOracle::new(&mgr, true);
        assert!(oracle.committed(TxnId::new(999)));
        assert!(oracle.visible_all(TxnId::new(999), u64::MAX));
        assert!(oracle.visible_to_snapshot(TxnId::new(999), u64::MAX));
    }

    #[test]
    fn non_hs_page_defers_to_manager() {
        let mgr = FakeTransactionManager::new(TxnId::new(10));
        mgr.commit(TxnId::new(5));
        let oracle = VisibilityOracle::new(&mgr, false);
        assert!(oracle.committed(TxnId::new(5)));
        assert!(!oracle.committed(TxnId::new(6)));
    }
}
