//! `PageProvider`: the page-layout collaborator. Page layout and cell
//! encoding are out of scope -- this crate only needs to look up a key's
//! chain head and charge bytes back against the page's memory footprint.

use std::sync::Arc;

use crate::chain::Update;
use crate::cell::OnDiskCell;
use crate::context::{InsertRef, SlotRef};
use crate::error::CResult;

pub trait PageProvider {
    /// Resolves a key's update chain head from its insert-list or fixed-slot
    /// reference. Exactly one of `ins`/`slot` is `Some` for a live key; both
    /// `None` is valid for a key with no pending updates at all.
    fn lookup_update_chain(&self, ins: Option<InsertRef>, slot: Option<SlotRef>) -> Option<Arc<Update>>;

    /// Decodes `cell`'s payload into `buffer`, growing it as needed.
    fn read_cell_payload(&self, cell: &OnDiskCell<'_>, buffer: &mut Vec<u8>) -> CResult<()>;

    /// True if `cell`'s payload lives in overflow blocks rather than inline.
    fn overflow(&self, cell: &OnDiskCell<'_>) -> bool;

    /// Charges `bytes` against the page's in-memory footprint accounting.
    fn page_mem_incr(&self, bytes: usize);
}

/// Test doubles reused by this crate's tests and by `demos`/`cli`'s
/// scenario walkthroughs. Not a real page implementation.
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// An in-memory page double for tests and demos: a fixed chain head per
    /// lookup key, plus a running byte counter.
    #[derive(Default)]
    pub struct NullPageProvider {
        chain: Mutex<Option<Arc<Update>>>,
        mem_incr_total: AtomicUsize,
        overflow: Mutex<bool>,
    }

    impl NullPageProvider {
        pub fn with_chain(chain: Option<Arc<Update>>) -> Self {
            Self {
                chain: Mutex::new(chain),
                mem_incr_total: AtomicUsize::new(0),
                overflow: Mutex::new(false),
            }
        }

        pub fn set_overflow(&self, overflow: bool) {
            *self.overflow.lock().unwrap() = overflow;
        }

        pub fn mem_incr_total(&self) -> usize {
            self.mem_incr_total.load(Ordering::SeqCst)
        }
    }

    impl PageProvider for NullPageProvider {
        fn lookup_update_chain(&self, _ins: Option<InsertRef>, _slot: Option<SlotRef>) -> Option<Arc<Update>> {
            self.chain.lock().unwrap().clone()
        }

        fn read_cell_payload(&self, cell: &OnDiskCell<'_>, buffer: &mut Vec<u8>) -> CResult<()> {
            buffer.clear();
            buffer.extend_from_slice(cell.payload());
            Ok(())
        }

        fn overflow(&self, _cell: &OnDiskCell<'_>) -> bool {
            *self.overflow.lock().unwrap()
        }

        fn page_mem_incr(&self, bytes: usize) {
            self.mem_incr_total.fetch_add(bytes, Ordering::SeqCst);
        }
    }
}
