//! Save-Decision & Persister: decides whether a key's remaining
//! chain must be recorded as a `SavedUpdate` for history-store spill or
//! in-memory restore.

use crate::context::{InsertRef, ReconcileContext, SavedUpdate, SlotRef};
use crate::selector::SelectionOutcome;
use crate::time::{TimePoint, TimeWindow};
use crate::visibility::{TransactionManager, VisibilityOracle};

/// `window.start` reads as globally visible unconditionally: the unset
/// sentinel `NONE` means the value has always existed, from the oldest
/// possible reader's perspective.
fn start_globally_visible<M: TransactionManager + ?Sized>(
    oracle: &VisibilityOracle<'_, M>,
    window: &TimeWindow,
) -> bool {
    window.start == TimePoint::NONE || oracle.visible_all(window.start.txn, window.start.ts)
}

/// A trivial (unbounded) stop can never be globally visible -- there is no
/// real event to have been seen by every reader.
fn stop_globally_visible<M: TransactionManager + ?Sized>(
    oracle: &VisibilityOracle<'_, M>,
    window: &TimeWindow,
) -> bool {
    !window.stop_is_trivial() && oracle.visible_all(window.stop.txn, window.stop.ts)
}

pub fn decide<M: TransactionManager + ?Sized>(
    selection: &SelectionOutcome,
    has_newer_updates: bool,
    oracle: &VisibilityOracle<'_, M>,
    ctx: &ReconcileContext,
) -> bool {
    let no_history_store =
        !ctx.is_history_store_page() && !ctx.is_in_memory() && !ctx.fixed_length_column_store;

    if selection.window.prepare {
        true
    } else if ctx.is_evict() && has_newer_updates {
        true
    } else if no_history_store {
        false
    } else if ctx.is_checkpoint() && selection.selected.is_none() {
        false
    } else {
        !start_globally_visible(oracle, &selection.window) && !stop_globally_visible(oracle, &selection.window)
    }
}

/// Records a `SavedUpdate` for `ins`/`slot` if the save decision holds,
/// mutating `ctx` accordingly. Returns whether a save was recorded (needed
/// by the independent Appender-invocation condition).
pub fn persist<M: TransactionManager + ?Sized>(
    selection: &SelectionOutcome,
    has_newer_updates: bool,
    ins: Option<InsertRef>,
    slot: Option<SlotRef>,
    oracle: &VisibilityOracle<'_, M>,
    ctx: &mut ReconcileContext,
) -> bool {
    if !decide(selection, has_newer_updates, oracle, ctx) {
        return false;
    }

    let restore = (ctx.is_evict() && has_newer_updates) || ctx.is_in_memory() || ctx.fixed_length_column_store;

    ctx.record_save(SavedUpdate {
        ins,
        slot,
        onpage_upd: selection.selected.clone(),
        restore,
    });

    true
}
