//! The reconciliation context: per-reconciliation mutable state threaded
//! through every key's `upd_select` call.

use std::sync::Arc;

use crate::chain::Update;
use crate::txn::TxnId;

/// Identifies the insert-list node a key lives at, if it was inserted
/// rather than occupying a fixed on-page slot. Opaque to this crate --
/// owned and interpreted by the page provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertRef(pub u64);

/// Identifies the fixed on-page slot a key lives at. Opaque to this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRef(pub u64);

/// Mode and state flags carried on a `ReconcileContext`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ReconcileFlags(u16);

impl ReconcileFlags {
    pub const VISIBLE_ALL: ReconcileFlags = ReconcileFlags(1 << 0);
    pub const EVICT: ReconcileFlags = ReconcileFlags(1 << 1);
    pub const CHECKPOINT: ReconcileFlags = ReconcileFlags(1 << 2);
    pub const HS: ReconcileFlags = ReconcileFlags(1 << 3);
    pub const IN_MEMORY: ReconcileFlags = ReconcileFlags(1 << 4);
    pub const CLEAN_AFTER_REC: ReconcileFlags = ReconcileFlags(1 << 5);
    pub const VISIBILITY_ERR: ReconcileFlags = ReconcileFlags(1 << 6);

    pub const NONE: ReconcileFlags = ReconcileFlags(0);

    pub fn contains(self, flag: ReconcileFlags) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl std::ops::BitOr for ReconcileFlags {
    type Output = ReconcileFlags;
    fn bitor(self, rhs: ReconcileFlags) -> ReconcileFlags {
        ReconcileFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ReconcileFlags {
    fn bitor_assign(&mut self, rhs: ReconcileFlags) {
        self.0 |= rhs.0;
    }
}

/// Identifies a chain whose remaining updates must be spilled to the
/// history store or replayed into the new in-memory page image.
pub struct SavedUpdate {
    pub ins: Option<InsertRef>,
    pub slot: Option<SlotRef>,
    /// `None` when the selection is a tombstone: the on-disk image
    /// encodes the delete directly, so no original update reference is
    /// needed.
    pub onpage_upd: Option<Arc<Update>>,
    pub restore: bool,
}

/// Per-reconciliation mutable state. One instance is constructed per page
/// reconciliation pass and threaded by `&mut` through every key's
/// `upd_select` call, which is what makes the single-writer rule a
/// type-level guarantee rather than a convention.
pub struct ReconcileContext {
    pub flags: ReconcileFlags,

    /// Captured once at construction: the only source of truth
    /// for "is this transaction committed" under `VISIBLE_ALL` mode for
    /// the whole pass, even if the global commit point advances mid-walk.
    pub last_running: TxnId,

    /// The stable timestamp as of pass start, used to count
    /// `updates_unstable` under eviction.
    pub stable_timestamp: u64,

    pub max_txn: TxnId,
    pub max_ts: u64,
    pub max_ondisk_ts: u64,
    /// Decreasing watermark: the lowest `start_ts` among prepared updates
    /// skipped outside eviction. Starts at `u64::MAX` (no skip yet).
    pub min_skipped_ts: u64,

    pub updates_seen: u64,
    pub updates_unstable: u64,

    pub saved: Vec<SavedUpdate>,
    pub saved_bytes: usize,

    pub leave_dirty: bool,
    pub cache_write_restore: bool,

    /// Telemetry counter for out-of-order timestamp repairs.
    pub repair_count: u64,

    /// Fixed-length column-store pages have no history store to spill to
    /// and must always restore into the new in-memory image instead. Set
    /// once per pass via `with_fixed_length_column_store`.
    pub fixed_length_column_store: bool,
}

impl ReconcileContext {
    pub fn new(flags: ReconcileFlags, last_running: TxnId, stable_timestamp: u64) -> Self {
        Self {
            flags,
            last_running,
            stable_timestamp,
            max_txn: TxnId::NONE,
            max_ts: 0,
            max_ondisk_ts: 0,
            min_skipped_ts: u64::MAX,
            updates_seen: 0,
            updates_unstable: 0,
            saved: Vec::new(),
            saved_bytes: 0,
            leave_dirty: false,
            cache_write_restore: false,
            repair_count: 0,
            fixed_length_column_store: false,
        }
    }

    pub fn with_fixed_length_column_store(mut self, fixed_length_column_store: bool) -> Self {
        self.fixed_length_column_store = fixed_length_column_store;
        self
    }

    pub fn is_visible_all(&self) -> bool {
        self.flags.contains(ReconcileFlags::VISIBLE_ALL)
    }

    pub fn is_evict(&self) -> bool {
        self.flags.contains(ReconcileFlags::EVICT)
    }

    pub fn is_checkpoint(&self) -> bool {
        self.flags.contains(ReconcileFlags::CHECKPOINT)
    }

    pub fn is_history_store_page(&self) -> bool {
        self.flags.contains(ReconcileFlags::HS)
    }

    pub fn is_in_memory(&self) -> bool {
        self.flags.contains(ReconcileFlags::IN_MEMORY)
    }

    pub fn is_clean_after_rec(&self) -> bool {
        self.flags.contains(ReconcileFlags::CLEAN_AFTER_REC)
    }

    pub fn visibility_err_requested(&self) -> bool {
        self.flags.contains(ReconcileFlags::VISIBILITY_ERR)
    }

    pub fn raise_max_txn(&mut self, txn: TxnId) {
        self.max_txn = self.max_txn.max(txn);
    }

    pub fn raise_max_ts(&mut self, ts: u64) {
        self.max_ts = self.max_ts.max(ts);
    }

    pub fn raise_max_ondisk_ts(&mut self, ts: u64) {
        self.max_ondisk_ts = self.max_ondisk_ts.max(ts);
    }

    pub fn lower_min_skipped_ts(&mut self, ts: u64) {
        self.min_skipped_ts = self.min_skipped_ts.min(ts);
    }

    pub fn record_save(&mut self, entry: SavedUpdate) {
        if entry.restore {
            self.cache_write_restore = true;
        }
        self.saved_bytes += std::mem::size_of::<SavedUpdate>();
        self.saved.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose_with_bitor() {
        let f = ReconcileFlags::EVICT | ReconcileFlags::HS;
        assert!(f.contains(ReconcileFlags::EVICT));
        assert!(f.contains(ReconcileFlags::HS));
        assert!(!f.contains(ReconcileFlags::CHECKPOINT));
    }

    #[test]
    fn watermarks_only_move_in_their_required_direction() {
        let mut ctx = ReconcileContext::new(ReconcileFlags::NONE, TxnId::new(1), 0);
        ctx.raise_max_txn(TxnId::new(5));
        ctx.raise_max_txn(TxnId::new(2));
        assert_eq!(ctx.max_txn, TxnId::new(5));

        ctx.lower_min_skipped_ts(10);
        ctx.lower_min_skipped_ts(20);
        assert_eq!(ctx.min_skipped_ts, 10);
    }
}
