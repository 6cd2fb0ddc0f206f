//! Selector: turns the Chain Walker's candidate into a filled
//! time window, handling the tombstone branch's look-behind and invoking
//! the Original-Value Appender when a tombstone is the chain's only live
//! entry.

use std::sync::Arc;

use crate::alloc::Allocator;
use crate::appender;
use crate::cell::OnDiskCell;
use crate::chain::{iter_non_aborted, Update, UpdateKind};
use crate::context::ReconcileContext;
use crate::error::CResult;
use crate::page::PageProvider;
use crate::time::TimeWindow;
use crate::txn::PrepareState;
use crate::visibility::{TransactionManager, VisibilityOracle};

pub struct SelectionOutcome {
    pub selected: Option<Arc<Update>>,
    pub window: TimeWindow,
}

/// Turns the walker's `candidate` into a `SelectionOutcome`. `chain_head`
/// and `cell` are only needed for the tombstone-only-chain case, where the
/// Appender must run to rematerialise the on-disk value.
#[allow(clippy::too_many_arguments)]
pub fn select<M, A>(
    candidate: Option<Arc<Update>>,
    chain_head: Option<&Arc<Update>>,
    cell: Option<&OnDiskCell<'_>>,
    oracle: &VisibilityOracle<'_, M>,
    alloc: &A,
    page: &dyn PageProvider,
    ctx: &mut ReconcileContext,
) -> CResult<SelectionOutcome>
where
    M: TransactionManager + ?Sized,
    A: Allocator + ?Sized,
{
    let mut window = TimeWindow::init();

    let Some(upd) = candidate else {
        return Ok(SelectionOutcome { selected: None, window });
    };
    let candidate_start_ts = upd.start_ts;

    let selected = if upd.kind == UpdateKind::Tombstone {
        window.set_stop(upd.start_ts, upd.txn_id, upd.durable_ts);

        let tombstone_globally_visible = oracle.visible_all(upd.txn_id, upd.start_ts);
        let mut selected = None;
        if !tombstone_globally_visible {
            if let Some(pred) = iter_non_aborted(upd.next()).next() {
                window.set_start(pred.start_ts, pred.txn_id, pred.durable_ts);
                selected = Some(Arc::clone(pred));
            } else if let Some(cell) = cell {
                // The tombstone is the only live entry: rematerialise the
                // on-disk value as a synthetic standard update.
                if let Some(appended) =
                    appender::append_original_value(chain_head, cell, oracle, alloc, page, ctx)?
                {
                    window.set_start(appended.start_ts, appended.txn_id, appended.durable_ts);
                    selected = Some(appended);
                }
            }
        }
        selected
    } else {
        debug_assert!(matches!(upd.kind, UpdateKind::Standard | UpdateKind::Modify | UpdateKind::RestoredFromHistory));
        window.set_start(upd.start_ts, upd.txn_id, upd.durable_ts);
        Some(upd)
    };

    if let Some(ref s) = selected {
        if s.prepare_state == PrepareState::InProgress {
            window.prepare = true;
        }
    }

    if window.repair_out_of_order() {
        ctx.repair_count += 1;
    }

    if selected.is_some() {
        ctx.raise_max_ondisk_ts(candidate_start_ts);
    }

    Ok(SelectionOutcome { selected, window })
}
