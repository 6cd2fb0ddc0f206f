//! `Allocator`: the update-allocation collaborator. Abstracted so the
//! Appender's failure path can be tested without a real page-memory
//! allocator.

use std::sync::Arc;

use crate::chain::{Update, UpdateKind};
use crate::error::CResult;
use crate::txn::{PrepareState, TxnId};

pub trait Allocator {
    #[allow(clippy::too_many_arguments)]
    fn alloc_update(
        &self,
        kind: UpdateKind,
        txn_id: TxnId,
        start_ts: u64,
        durable_ts: u64,
        prepare_state: PrepareState,
        payload: Option<Vec<u8>>,
    ) -> CResult<Arc<Update>>;

    /// Releases an update allocated but never linked into a chain (the
    /// Appender's error path).
    fn free_update(&self, update: Arc<Update>);

    /// A scratch buffer sized for decoding an overflow payload.
    fn scratch_buffer(&self, capacity: usize) -> Vec<u8>;
}

/// Backs `Allocator` with ordinary heap allocation. There is no real "free
/// list" to return to -- dropping the `Arc` is sufficient since an
/// unlinked, unshared update has no other owner.
#[derive(Default)]
pub struct HeapAllocator;

impl Allocator for HeapAllocator {
    fn alloc_update(
        &self,
        kind: UpdateKind,
        txn_id: TxnId,
        start_ts: u64,
        durable_ts: u64,
        prepare_state: PrepareState,
        payload: Option<Vec<u8>>,
    ) -> CResult<Arc<Update>> {
        Ok(Update::new(kind, txn_id, start_ts, durable_ts, prepare_state, payload))
    }

    fn free_update(&self, _update: Arc<Update>) {}

    fn scratch_buffer(&self, capacity: usize) -> Vec<u8> {
        Vec::with_capacity(capacity)
    }
}
