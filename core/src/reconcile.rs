//! Orchestration entry point: wires the Chain Walker, Selector,
//! Original-Value Appender and Save-Decision/Persister into the single
//! `upd_select` call the reconciliation driver makes once per key.

use std::sync::Arc;

use crate::alloc::Allocator;
use crate::appender;
use crate::cell::OnDiskCell;
use crate::chain::Update;
use crate::context::{InsertRef, ReconcileContext, SlotRef};
use crate::error::{CResult, Error};
use crate::page::PageProvider;
use crate::persist;
use crate::selector;
use crate::time::TimeWindow;
use crate::visibility::{TransactionManager, VisibilityOracle};
use crate::walker;

/// The result of reconciling one key.
#[derive(Debug)]
pub struct UpdateSelection {
    pub update: Option<Arc<Update>>,
    pub window: TimeWindow,
    pub prepare: bool,
}

/// Reconciles a single key: looks up its update chain via `page`, walks it,
/// selects the new on-disk value (if any), rematerialises the original
/// value when needed, and records a history-store/restore save when the
/// remaining chain can't be discarded.
#[allow(clippy::too_many_arguments)]
pub fn upd_select<M, A>(
    ctx: &mut ReconcileContext,
    page: &dyn PageProvider,
    oracle: &VisibilityOracle<'_, M>,
    alloc: &A,
    ins: Option<InsertRef>,
    slot: Option<SlotRef>,
    cell: Option<&OnDiskCell<'_>>,
) -> CResult<UpdateSelection>
where
    M: TransactionManager + ?Sized,
    A: Allocator + ?Sized,
{
    let chain_head = page.lookup_update_chain(ins, slot);

    let outcome = walker::walk(chain_head.as_ref(), oracle, ctx)?;

    if ctx.visibility_err_requested() && outcome.has_newer_updates {
        return Err(Error::Panic);
    }
    if ctx.is_clean_after_rec() && outcome.has_newer_updates {
        return Err(Error::Busy);
    }

    let selection = selector::select(
        outcome.candidate,
        chain_head.as_ref(),
        cell,
        oracle,
        alloc,
        page,
        ctx,
    )?;

    let saved = persist::persist(&selection, outcome.has_newer_updates, ins, slot, oracle, ctx);

    // Independent of the save decision: an overflow cell's
    // extents are reclaimed by the checkpoint writing this page, so the
    // original value must be rematerialised whenever a save happened or
    // the cell is overflow, even if no save was recorded. `append_original_value`
    // is its own skip-condition check, so a value already materialised by
    // the Selector's tombstone-only path is a safe no-op here.
    if let (Some(_), Some(c)) = (&selection.selected, cell) {
        if saved || page.overflow(c) {
            appender::append_original_value(chain_head.as_ref(), c, oracle, alloc, page, ctx)?;
        }
    }

    Ok(UpdateSelection {
        update: selection.selected,
        window: selection.window,
        prepare: selection.window.prepare,
    })
}
