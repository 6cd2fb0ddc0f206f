//! Time-window algebra.
//!
//! A value is visible to readers whose snapshot `(ts, txn)` lies in
//! `[start, stop)` under the lexicographic order on `(ts, txn)`.

use crate::txn::TxnId;

/// A single `(timestamp, transaction)` endpoint of a time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct TimePoint {
    pub ts: u64,
    pub txn: TxnId,
}

impl TimePoint {
    pub const NONE: TimePoint = TimePoint { ts: 0, txn: TxnId::NONE };
    pub const MAX: TimePoint = TimePoint { ts: u64::MAX, txn: TxnId::MAX };

    pub fn new(ts: u64, txn: TxnId) -> Self {
        Self { ts, txn }
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lexicographic on (ts, txn).
        (self.ts, self.txn).cmp(&(other.ts, other.txn))
    }
}

/// The validity window annotating a selected update: `[start, stop)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct TimeWindow {
    pub start: TimePoint,
    pub durable_start_ts: u64,
    pub stop: TimePoint,
    pub durable_stop_ts: u64,
    pub prepare: bool,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::init()
    }
}

impl TimeWindow {
    /// `start = (NONE, NONE)`, `stop = (MAX, MAX)` -- the default, maximally
    /// permissive window.
    pub fn init() -> Self {
        Self {
            start: TimePoint::NONE,
            durable_start_ts: 0,
            stop: TimePoint::MAX,
            durable_stop_ts: u64::MAX,
            prepare: false,
        }
    }

    /// Sets the start endpoint from a standard/modify update or an
    /// appended synthetic original value.
    pub fn set_start(&mut self, start_ts: u64, txn: TxnId, durable_ts: u64) {
        self.start = TimePoint::new(start_ts, txn);
        self.durable_start_ts = durable_ts;
    }

    /// Sets the stop endpoint from a tombstone (or the on-disk cell's stop
    /// pair, when appending a synthetic tombstone).
    pub fn set_stop(&mut self, stop_ts: u64, txn: TxnId, durable_ts: u64) {
        self.stop = TimePoint::new(stop_ts, txn);
        self.durable_stop_ts = durable_ts;
    }

    /// True when the stop pair has never been set (still the default
    /// unbounded value).
    pub fn stop_is_trivial(&self) -> bool {
        self.stop == TimePoint::MAX
    }

    /// Out-of-order repair: if `stop < start`, the window was
    /// produced by a later-timestamp delete racing an older-timestamp
    /// insert committed out of order. Rewriting `start := stop` hides the
    /// value rather than exposing a negative-width window. An
    /// insert-then-delete by a single transaction produces `start == stop`
    /// exactly, which compares equal (not less) and is therefore never
    /// treated as out of order by this check.
    ///
    /// Returns `true` iff a repair was applied.
    pub fn repair_out_of_order(&mut self) -> bool {
        if self.stop < self.start {
            log::warn!(
                "out-of-order timestamps repaired: start={:?} stop={:?}",
                self.start,
                self.stop
            );
            self.start = self.stop;
            self.durable_start_ts = self.durable_stop_ts;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_maximally_permissive() {
        let w = TimeWindow::init();
        assert_eq!(w.start, TimePoint::NONE);
        assert_eq!(w.stop, TimePoint::MAX);
    }

    #[test]
    fn time_point_order_is_lexicographic_on_ts_then_txn() {
        let a = TimePoint::new(10, TxnId::new(5));
        let b = TimePoint::new(10, TxnId::new(6));
        let c = TimePoint::new(11, TxnId::new(1));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn repair_rewrites_start_to_stop_when_out_of_order() {
        let mut w = TimeWindow::init();
        w.set_start(10, TxnId::new(10), 10);
        w.set_stop(5, TxnId::new(6), 5);
        assert!(w.repair_out_of_order());
        assert_eq!(w.start, w.stop);
        assert_eq!(w.durable_start_ts, w.durable_stop_ts);
    }

    #[test]
    fn same_txn_insert_then_delete_is_not_out_of_order() {
        let mut w = TimeWindow::init();
        let txn = TxnId::new(7);
        w.set_start(5, txn, 5);
        w.set_stop(5, txn, 5);
        assert!(!w.repair_out_of_order());
        assert_eq!(w.start, w.stop);
    }

    #[test]
    fn equal_timestamps_different_txn_out_of_order_on_txn_order() {
        let mut w = TimeWindow::init();
        w.set_start(5, TxnId::new(9), 5);
        w.set_stop(5, TxnId::new(3), 5);
        assert!(w.repair_out_of_order());
        assert_eq!(w.start, w.stop);
    }
}
