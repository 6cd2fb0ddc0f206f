//! Chain Walker: walks a key's update chain newest-to-oldest,
//! classifies each entry, and picks the first committed, non-prepared-
//! pending entry as the selection candidate.

use std::sync::Arc;

use crate::chain::{iter_non_aborted, Update, UpdateKind};
use crate::context::ReconcileContext;
use crate::error::{CResult, Error};
use crate::txn::PrepareState;
use crate::visibility::{TransactionManager, VisibilityOracle};

/// The walker's output: the candidate update (if any) plus the flags the
/// Selector and Save-Decision steps need.
#[derive(Debug)]
pub struct WalkOutcome {
    pub candidate: Option<Arc<Update>>,
    pub has_newer_updates: bool,
    /// The newest non-aborted, non-reserve entry's transaction id, purely
    /// informational (mirrors the source's bookkeeping; not consulted
    /// elsewhere in this crate).
    pub first_txn_upd: Option<crate::txn::TxnId>,
}

/// Whether a prepared entry blocks selection at this point in the walk.
/// Outside eviction, both `Locked` and `InProgress` block. Under eviction,
/// only `InProgress` may be selected -- `Locked` still blocks mid-eviction
/// the same as outside it, since only `InProgress` is ever exempted.
fn prepare_blocks_selection(state: PrepareState, is_evict: bool) -> bool {
    match state {
        PrepareState::None | PrepareState::Resolved => false,
        PrepareState::Locked => true,
        PrepareState::InProgress => !is_evict,
    }
}

pub fn walk<M: TransactionManager + ?Sized>(
    chain_head: Option<&Arc<Update>>,
    oracle: &VisibilityOracle<'_, M>,
    ctx: &mut ReconcileContext,
) -> CResult<WalkOutcome> {
    let mode_visible_all = ctx.is_visible_all();
    let is_evict = ctx.is_evict();

    let mut candidate: Option<Arc<Update>> = None;
    let mut has_newer_updates = false;
    let mut first_txn_upd = None;

    for upd in iter_non_aborted(chain_head) {
        ctx.updates_seen += 1;
        if first_txn_upd.is_none() {
            first_txn_upd = Some(upd.txn_id);
        }
        ctx.raise_max_txn(upd.txn_id);

        if upd.kind == UpdateKind::Reserve {
            continue;
        }

        // Prepare classification takes priority over the general
        // committed/uncommitted check: a prepared transaction hasn't
        // committed in the ordinary sense, but it gets its own handling
        // rather than falling into the uncommitted case.
        if prepare_blocks_selection(upd.prepare_state, is_evict) {
            has_newer_updates = true;
            ctx.raise_max_ts(upd.start_ts);
            // Read timestamp, not durable timestamp: readers consult the
            // page image using the read timestamp.
            ctx.lower_min_skipped_ts(upd.start_ts);
            continue;
        }

        // Reaching here with `InProgress` means eviction explicitly
        // allowed it through; it's selectable regardless of ordinary
        // commit visibility.
        let prepared_selectable = upd.prepare_state == PrepareState::InProgress;

        let uncommitted = !prepared_selectable
            && !oracle.is_history_store()
            && if mode_visible_all {
                upd.txn_id >= ctx.last_running
            } else {
                !oracle.visible_to_snapshot(upd.txn_id, upd.start_ts)
            };

        if uncommitted {
            has_newer_updates = true;
            if candidate.is_some() {
                // A committed update was already selected further up the
                // chain (newer) than this uncommitted one -- moving it to
                // the history store isn't supported.
                return Err(Error::Busy);
            }
            ctx.raise_max_ts(upd.start_ts);
            continue;
        }

        ctx.raise_max_ts(upd.start_ts);

        if candidate.is_none() {
            candidate = Some(Arc::clone(upd));
            if !is_evict {
                // Fast path: nothing after the winner matters outside
                // eviction.
                break;
            }
            continue;
        }

        // A candidate is already chosen; under eviction we keep walking
        // solely to count entries that are not yet stable.
        let stable = upd.start_ts <= ctx.stable_timestamp && oracle.committed(upd.txn_id);
        if !stable {
            ctx.updates_unstable += 1;
        }
    }

    Ok(WalkOutcome { candidate, has_newer_updates, first_txn_upd })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::append_tail;
    use crate::context::ReconcileFlags;
    use crate::txn::TxnId;
    use crate::visibility::test_support::FakeTransactionManager;

    fn std_update(txn: u64, ts: u64) -> Arc<Update> {
        Update::new(UpdateKind::Standard, TxnId::new(txn), ts, ts, PrepareState::None, Some(vec![1]))
    }

    #[test]
    fn newest_committed_update_wins_outside_eviction() {
        let mgr = FakeTransactionManager::new(TxnId::new(100));
        mgr.commit(TxnId::new(5));
        mgr.commit(TxnId::new(3));
        let oracle = VisibilityOracle::new(&mgr, false);

        let head = std_update(5, 30);
        append_tail(&head, std_update(3, 20));

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL, TxnId::new(100), 0);
        let outcome = walk(Some(&head), &oracle, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(5));
        assert!(!outcome.has_newer_updates);
        assert_eq!(ctx.max_txn, TxnId::new(5));
    }

    #[test]
    fn uncommitted_head_under_cached_snapshot_is_skipped_not_rechecked() {
        // Both committed by the time we'd ask the live oracle, but the
        // walk must use the cached last_running, per spec scenario 5.
        let mgr = FakeTransactionManager::new(TxnId::new(9));
        mgr.commit(TxnId::new(10));
        mgr.commit(TxnId::new(6));
        let oracle = VisibilityOracle::new(&mgr, false);

        let head = std_update(10, 5);
        append_tail(&head, std_update(6, 40));

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL, TxnId::new(9), 0);
        let outcome = walk(Some(&head), &oracle, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(6));
        assert!(outcome.has_newer_updates);
    }

    #[test]
    fn busy_when_uncommitted_follows_a_selected_update() {
        // Only reachable under eviction: outside it the walk stops the
        // instant a candidate is chosen, so an older uncommitted entry is
        // never even examined.
        let mgr = FakeTransactionManager::new(TxnId::new(5));
        mgr.commit(TxnId::new(2));
        let oracle = VisibilityOracle::new(&mgr, false);

        let head = std_update(2, 20);
        let uncommitted_tail = Update::new(
            UpdateKind::Standard,
            TxnId::new(8),
            10,
            10,
            PrepareState::None,
            Some(vec![9]),
        );
        append_tail(&head, uncommitted_tail);

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL | ReconcileFlags::EVICT, TxnId::new(5), 0);
        let err = walk(Some(&head), &oracle, &mut ctx).unwrap_err();
        assert!(matches!(err, Error::Busy));
    }

    #[test]
    fn prepared_locked_outside_eviction_is_skipped_and_tracked() {
        let mgr = FakeTransactionManager::new(TxnId::new(100));
        mgr.commit(TxnId::new(2));
        let oracle = VisibilityOracle::new(&mgr, false);

        let prepared = Update::new(
            UpdateKind::Standard,
            TxnId::new(50),
            60,
            60,
            PrepareState::Locked,
            Some(vec![1]),
        );
        append_tail(&prepared, std_update(2, 20));

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL, TxnId::new(100), 0);
        let outcome = walk(Some(&prepared), &oracle, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(2));
        assert!(outcome.has_newer_updates);
        assert_eq!(ctx.min_skipped_ts, 60);
    }

    #[test]
    fn eviction_may_select_in_progress_prepared_update() {
        let mgr = FakeTransactionManager::new(TxnId::new(100));
        let oracle = VisibilityOracle::new(&mgr, false);

        let prepared = Update::new(
            UpdateKind::Standard,
            TxnId::new(50),
            60,
            60,
            PrepareState::InProgress,
            Some(vec![1]),
        );

        let mut ctx = ReconcileContext::new(ReconcileFlags::EVICT, TxnId::new(100), 0);
        let outcome = walk(Some(&prepared), &oracle, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(50));
    }

    #[test]
    fn eviction_counts_unstable_entries_below_the_selection() {
        let mgr = FakeTransactionManager::new(TxnId::new(100));
        mgr.commit(TxnId::new(5));
        mgr.commit(TxnId::new(3));
        let oracle = VisibilityOracle::new(&mgr, false);

        let head = std_update(5, 50);
        append_tail(&head, std_update(3, 10));

        let mut ctx = ReconcileContext::new(ReconcileFlags::EVICT, TxnId::new(100), 20);
        let outcome = walk(Some(&head), &oracle, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(5));
        assert_eq!(ctx.updates_unstable, 0); // txn 3's ts=10 <= stable_ts=20, and committed
    }

    #[test]
    fn reserve_entries_are_never_selected() {
        let mgr = FakeTransactionManager::new(TxnId::new(100));
        mgr.commit(TxnId::new(4));
        let oracle = VisibilityOracle::new(&mgr, false);

        let reserve = Update::new(UpdateKind::Reserve, TxnId::new(4), 40, 40, PrepareState::None, None);
        append_tail(&reserve, std_update(1, 10));
        // txn 1 must also be committed or nothing is selected.
        let mgr2 = FakeTransactionManager::new(TxnId::new(100));
        mgr2.commit(TxnId::new(4));
        mgr2.commit(TxnId::new(1));
        let oracle2 = VisibilityOracle::new(&mgr2, false);

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL, TxnId::new(100), 0);
        let outcome = walk(Some(&reserve), &oracle2, &mut ctx).unwrap();
        assert_eq!(outcome.candidate.unwrap().txn_id, TxnId::new(1));
    }
}
