//! `reconcile` is the update-selection and visibility-resolution step of
//! page reconciliation for a multi-version, timestamp-ordered B-tree
//! storage engine. For every logical key being reconciled it decides which
//! pending update becomes the new on-disk value, the validity time window
//! for that value, and whether the remaining chain must be preserved for
//! history-store spill or in-memory restore.
//!
//! Page layout, cell encoding, the write path, and the history store's own
//! storage are out of scope -- this crate consumes them only through the
//! trait interfaces in [`page`], [`visibility`] and [`alloc`].
//!
//! ## Getting started
//!
//! ```rust
//! use std::sync::Arc;
//! use reconcile::alloc::HeapAllocator;
//! use reconcile::chain::{Update, UpdateKind};
//! use reconcile::context::{ReconcileContext, ReconcileFlags};
//! use reconcile::page::test_support::NullPageProvider;
//! use reconcile::reconcile::upd_select;
//! use reconcile::txn::{PrepareState, TxnId};
//! use reconcile::visibility::{TransactionManager, VisibilityOracle};
//!
//! struct AllCommitted;
//! impl TransactionManager for AllCommitted {
//!     fn last_running(&self) -> TxnId { TxnId::new(100) }
//!     fn visible_all(&self, _txn: TxnId, _ts: u64) -> bool { true }
//!     fn visible_to_snapshot(&self, _txn: TxnId, _ts: u64) -> bool { true }
//!     fn committed(&self, _txn: TxnId) -> bool { true }
//!     fn checkpoint_txn_id(&self) -> TxnId { TxnId::NONE }
//! }
//!
//! fn main() {
//!     let mgr = AllCommitted;
//!     let oracle = VisibilityOracle::new(&mgr, false);
//!     let alloc = HeapAllocator;
//!
//!     let head: Arc<Update> =
//!         Update::new(UpdateKind::Standard, TxnId::new(5), 30, 30, PrepareState::None, Some(vec![1]));
//!     let page = NullPageProvider::with_chain(Some(head));
//!
//!     let mut ctx = ReconcileContext::new(ReconcileFlags::VISIBLE_ALL | ReconcileFlags::HS, TxnId::new(100), 0);
//!     let selection = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, None).unwrap();
//!
//!     assert_eq!(selection.update.unwrap().txn_id, TxnId::new(5));
//! }
//! ```

pub mod alloc;
pub mod appender;
pub mod cell;
pub mod chain;
pub mod context;
pub mod error;
pub mod page;
pub mod persist;
pub mod reconcile;
pub mod selector;
pub mod time;
pub mod txn;
pub mod visibility;
pub mod walker;
