//! Randomised invariant checks over synthetic update chains.
//!
//! Unlike the scenario tests, these don't assert a specific selection --
//! they assert properties that must hold for *any* chain shape: the
//! selected entry (if any) is never `Reserve`/aborted, the resulting window
//! never reports `start > stop` after repair, and repeated passes over the
//! same context only ever move its watermarks in their required direction.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reconcile::alloc::HeapAllocator;
use reconcile::chain::{append_tail, Update, UpdateKind};
use reconcile::context::{ReconcileContext, ReconcileFlags};
use reconcile::page::test_support::NullPageProvider;
use reconcile::reconcile::upd_select;
use reconcile::txn::{PrepareState, TxnId};
use reconcile::visibility::test_support::FakeTransactionManager;
use reconcile::visibility::VisibilityOracle;

/// Builds a random newest-first chain of `len` entries with strictly
/// decreasing timestamps, each independently committed with probability
/// `commit_p`. Returns the chain head plus the set of committed txn ids.
fn random_chain(rng: &mut StdRng, len: usize, commit_p: f64, mgr: &FakeTransactionManager) -> Option<Arc<Update>> {
    if len == 0 {
        return None;
    }

    let mut nodes = Vec::with_capacity(len);
    let mut ts = (len as u64) * 10;
    for i in 0..len {
        let txn = TxnId::new(100 + i as u64);
        let kind = if rng.gen_bool(0.15) { UpdateKind::Tombstone } else { UpdateKind::Standard };
        let payload = match kind {
            UpdateKind::Tombstone => None,
            _ => Some(vec![i as u8]),
        };
        if rng.gen_bool(commit_p) {
            mgr.commit(txn);
        }
        nodes.push(Update::new(kind, txn, ts, ts, PrepareState::None, payload));
        ts = ts.saturating_sub(1);
    }

    let head = nodes[0].clone();
    let mut tail = head.clone();
    for node in nodes.into_iter().skip(1) {
        append_tail(&tail, node.clone());
        tail = node;
    }
    Some(head)
}

#[test]
fn selected_update_is_never_reserve_or_aborted() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mgr = FakeTransactionManager::new(TxnId::new(1000));
        *mgr.pinned_oldest_ts.lock().unwrap() = u64::MAX;
        let len = rng.gen_range(0..8);
        let chain = random_chain(&mut rng, len, 0.7, &mgr);
        let oracle = VisibilityOracle::new(&mgr, false);
        let alloc = HeapAllocator;
        let page = NullPageProvider::with_chain(chain);

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL | ReconcileFlags::HS, TxnId::new(1000), 0);
        let result = match upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None) {
            Ok(r) => r,
            Err(_) => continue,
        };

        if let Some(selected) = &result.update {
            assert_ne!(selected.kind, UpdateKind::Reserve);
            assert!(!selected.is_aborted());
        }
    }
}

#[test]
fn window_start_never_exceeds_stop_after_repair() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mgr = FakeTransactionManager::new(TxnId::new(1000));
        *mgr.pinned_oldest_ts.lock().unwrap() = u64::MAX;
        let len = rng.gen_range(0..8);
        let chain = random_chain(&mut rng, len, 0.9, &mgr);
        let oracle = VisibilityOracle::new(&mgr, false);
        let alloc = HeapAllocator;
        let page = NullPageProvider::with_chain(chain);

        let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL | ReconcileFlags::HS, TxnId::new(1000), 0);
        let Ok(result) = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None) else {
            continue;
        };

        assert!(result.window.start <= result.window.stop);
    }
}

#[test]
fn watermarks_only_move_in_their_required_direction_across_passes() {
    let mgr = FakeTransactionManager::new(TxnId::new(1000));
    *mgr.pinned_oldest_ts.lock().unwrap() = u64::MAX;
    let oracle = VisibilityOracle::new(&mgr, false);
    let alloc = HeapAllocator;

    let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL | ReconcileFlags::HS, TxnId::new(1000), 0);

    let mut last_max_ts = 0u64;
    let mut last_max_txn = TxnId::NONE;

    for i in 0..20 {
        let txn = TxnId::new(200 + i);
        mgr.commit(txn);
        let head = Update::new(UpdateKind::Standard, txn, 50 + i, 50 + i, PrepareState::None, Some(vec![1]));
        let page = NullPageProvider::with_chain(Some(head));

        let _ = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None);

        assert!(ctx.max_ts >= last_max_ts);
        assert!(ctx.max_txn >= last_max_txn);
        last_max_ts = ctx.max_ts;
        last_max_txn = ctx.max_txn;
    }
}
