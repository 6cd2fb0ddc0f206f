//! Original-Value Appender: rematerialises an on-disk value as a
//! synthetic chain tail when the in-memory chain no longer carries enough
//! information for older readers or later writers.

use std::sync::Arc;

use crate::alloc::Allocator;
use crate::cell::OnDiskCell;
use crate::chain::{self, iter_non_aborted, Update, UpdateKind};
use crate::context::ReconcileContext;
use crate::error::CResult;
use crate::page::PageProvider;
use crate::txn::PrepareState;
use crate::visibility::{TransactionManager, VisibilityOracle};

/// Appends a synthetic `Standard` update (optionally preceded by a synthetic
/// `Tombstone`) derived from `cell` to the tail of `chain_head`, unless one
/// of the five skip conditions holds. Returns the newly appended `Standard`
/// entry, or `None` if the append was skipped.
pub fn append_original_value<M, A>(
    chain_head: Option<&Arc<Update>>,
    cell: &OnDiskCell<'_>,
    oracle: &VisibilityOracle<'_, M>,
    alloc: &A,
    page: &dyn PageProvider,
    ctx: &mut ReconcileContext,
) -> CResult<Option<Arc<Update>>>
where
    M: TransactionManager + ?Sized,
    A: Allocator + ?Sized,
{
    if should_skip(chain_head, cell, oracle) {
        return Ok(None);
    }

    let start = cell.window.start;
    let mut payload = alloc.scratch_buffer(cell.payload().len());
    page.read_cell_payload(cell, &mut payload)?;

    let standard = alloc.alloc_update(
        UpdateKind::Standard,
        start.txn,
        start.ts,
        cell.window.durable_start_ts,
        PrepareState::None,
        Some(payload),
    )?;

    let tail_is_tombstone = iter_non_aborted(chain_head)
        .last()
        .map(|u| u.kind == UpdateKind::Tombstone)
        .unwrap_or(false);

    let new_subchain_head = if cell.has_non_trivial_stop() && !tail_is_tombstone {
        let stop = cell.window.stop;
        let tombstone = alloc.alloc_update(
            UpdateKind::Tombstone,
            stop.txn,
            stop.ts,
            cell.window.durable_stop_ts,
            PrepareState::None,
            None,
        )?;
        chain::link(&tombstone, Arc::clone(&standard));
        tombstone
    } else {
        Arc::clone(&standard)
    };

    let bytes = new_subchain_head.memory_size()
        + new_subchain_head
            .next()
            .map(|n| n.memory_size())
            .unwrap_or(0);

    if let Some(head) = chain_head {
        chain::append_tail(head, new_subchain_head);
    }
    page.page_mem_incr(bytes);

    Ok(Some(standard))
}

fn should_skip<M: TransactionManager + ?Sized>(
    chain_head: Option<&Arc<Update>>,
    cell: &OnDiskCell<'_>,
    oracle: &VisibilityOracle<'_, M>,
) -> bool {
    // 1. Chain was reconstructed for rollback-to-stable; original already
    // represented.
    if iter_non_aborted(chain_head).any(|u| u.kind == UpdateKind::RestoredFromHistory) {
        return true;
    }

    // 2. The prepared on-disk record is already represented in memory,
    // unless the chain starts with a tombstone (the prepared value was
    // deleted, so it must still be materialised for the delete to apply to
    // something).
    let head_is_tombstone = chain_head.map(|h| h.kind == UpdateKind::Tombstone).unwrap_or(false);
    if cell.window.prepare && !head_is_tombstone {
        return true;
    }

    // 3. Already represented verbatim by a live non-tombstone entry.
    let start = cell.window.start;
    if iter_non_aborted(chain_head)
        .any(|u| u.kind != UpdateKind::Tombstone && u.txn_id == start.txn && u.start_ts == start.ts)
    {
        return true;
    }

    // 4. A self-contained (STANDARD) entry is already globally visible --
    // checked per entry, since out-of-order commits can place a globally
    // visible update above one that isn't.
    if iter_non_aborted(chain_head)
        .any(|u| u.kind == UpdateKind::Standard && oracle.visible_all(u.txn_id, u.start_ts))
    {
        return true;
    }

    // 5. The cell's own stop pair is globally visible: the value has been
    // universally superseded.
    if cell.has_non_trivial_stop() {
        let stop = cell.window.stop;
        if oracle.visible_all(stop.txn, stop.ts) {
            return true;
        }
    }

    false
}
