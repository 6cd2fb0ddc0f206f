//! The on-disk cell, unpacked. Page layout and cell encoding are out of
//! scope; this is just the handful of fields the reconciliation core
//! needs out of whatever the page provider decoded.

use crate::time::TimeWindow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Value,
    Deleted,
}

/// An unpacked on-disk cell borrowed for the duration of one `upd_select`
/// call. The appended standard update copies the payload out before the
/// call returns.
pub struct OnDiskCell<'a> {
    pub kind: CellKind,
    pub window: TimeWindow,
    pub overflow: bool,
    payload: &'a [u8],
}

impl<'a> OnDiskCell<'a> {
    pub fn new(kind: CellKind, window: TimeWindow, overflow: bool, payload: &'a [u8]) -> Self {
        Self { kind, window, overflow, payload }
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.kind, CellKind::Deleted)
    }

    /// True when the cell's stop pair has been set to something other than
    /// the default unbounded value (used by the Appender's skip condition
    /// and by the independent Appender-invocation check).
    pub fn has_non_trivial_stop(&self) -> bool {
        !self.window.stop_is_trivial()
    }
}
