use criterion::{black_box, criterion_group, criterion_main, Criterion};

use reconcile::alloc::HeapAllocator;
use reconcile::chain::{append_tail, Update, UpdateKind};
use reconcile::context::{ReconcileContext, ReconcileFlags};
use reconcile::page::test_support::NullPageProvider;
use reconcile::reconcile::upd_select;
use reconcile::txn::{PrepareState, TxnId};
use reconcile::visibility::test_support::FakeTransactionManager;
use reconcile::visibility::VisibilityOracle;

fn build_chain(len: u64) -> (NullPageProvider, FakeTransactionManager) {
    let mgr = FakeTransactionManager::new(TxnId::new(len + 10));
    *mgr.pinned_oldest_ts.lock().unwrap() = u64::MAX;

    let head = Update::new(UpdateKind::Standard, TxnId::new(len), len * 10, len * 10, PrepareState::None, Some(vec![0u8; 64]));
    mgr.commit(TxnId::new(len));
    let mut tail = head.clone();
    for i in (0..len).rev() {
        let node = Update::new(UpdateKind::Standard, TxnId::new(i), i * 10, i * 10, PrepareState::None, Some(vec![0u8; 64]));
        mgr.commit(TxnId::new(i));
        append_tail(&tail, node.clone());
        tail = node;
    }

    (NullPageProvider::with_chain(Some(head)), mgr)
}

fn bench_upd_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("upd_select");

    for len in [1u64, 8, 64, 256] {
        let (page, mgr) = build_chain(len);
        let oracle = VisibilityOracle::new(&mgr, false);
        let alloc = HeapAllocator;

        group.bench_function(format!("chain_len_{len}"), |b| {
            b.iter(|| {
                let mut ctx = ReconcileContext::new(
                    ReconcileFlags::VISIBLE_ALL | ReconcileFlags::HS,
                    TxnId::new(len + 10),
                    0,
                );
                let result = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

fn bench_eviction_with_unstable_tail(c: &mut Criterion) {
    let (page, mgr) = build_chain(128);
    let oracle = VisibilityOracle::new(&mgr, false);
    let alloc = HeapAllocator;

    c.bench_function("upd_select_eviction_128", |b| {
        b.iter(|| {
            let mut ctx = ReconcileContext::new(
                ReconcileFlags::VISIBLE_ALL | ReconcileFlags::EVICT | ReconcileFlags::HS,
                TxnId::new(138),
                50,
            );
            let result = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None).unwrap();
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_upd_select, bench_eviction_with_unstable_tail);
criterion_main!(benches);
