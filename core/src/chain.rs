//! The update chain: an intrusive, singly-linked, newest-first list of
//! pending modifications for one key.
//!
//! The reconciling worker is the only writer and only ever appends at the
//! tail, publishing a new node with a single `OnceLock::set` -- readers
//! concurrently walking the chain via `next()` see either the old tail
//! (`None`) or the fully-initialised appended node, never a partially
//! constructed one. No unsafe code and no extra crate are needed: this is
//! exactly the write-once, read-many case `OnceLock` exists for.

use std::sync::{Arc, OnceLock};

use crate::txn::{PrepareState, TxnId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateKind {
    /// A full value.
    Standard,
    /// A delta over the previous update.
    Modify,
    /// A logical delete.
    Tombstone,
    /// Placeholder reserved by a transaction; must never be selected.
    Reserve,
    /// The chain was reconstructed for rollback-to-stable and this entry
    /// stands in for the original on-disk value.
    RestoredFromHistory,
}

/// One entry in a key's modification chain.
#[derive(Debug)]
pub struct Update {
    pub kind: UpdateKind,
    pub txn_id: TxnId,
    pub start_ts: u64,
    pub durable_ts: u64,
    pub prepare_state: PrepareState,
    /// Present for `Standard`/`Modify`; absent for `Tombstone`/`Reserve`.
    pub payload: Option<Vec<u8>>,
    next: OnceLock<Arc<Update>>,
}

impl Update {
    pub fn new(
        kind: UpdateKind,
        txn_id: TxnId,
        start_ts: u64,
        durable_ts: u64,
        prepare_state: PrepareState,
        payload: Option<Vec<u8>>,
    ) -> Arc<Update> {
        Arc::new(Update {
            kind,
            txn_id,
            start_ts,
            durable_ts,
            prepare_state,
            payload,
            next: OnceLock::new(),
        })
    }

    pub fn is_aborted(&self) -> bool {
        self.txn_id.is_aborted()
    }

    /// Acquire-load of the next (older) chain entry.
    pub fn next(&self) -> Option<&Arc<Update>> {
        self.next.get()
    }

    /// Estimated in-memory footprint, charged against the page's memory
    /// accounting.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Update>() + self.payload.as_ref().map_or(0, Vec::len)
    }

    /// Publishes `node` as this entry's successor. Only valid when `next`
    /// is still unset; the reconciling worker never retries a failed set
    /// because only it ever appends and it always targets the current
    /// tail. Returns the node back on the (unexpected) race.
    fn publish_next(&self, node: Arc<Update>) -> Result<(), Arc<Update>> {
        self.next.set(node)
    }
}

/// Links `child` as `parent`'s successor before `parent` is itself linked
/// into a visible chain. Used by the Appender to pre-wire a synthetic
/// tombstone-then-standard sub-chain as a single unit before publishing its
/// head at the real tail, so the sub-chain becomes visible atomically.
pub(crate) fn link(parent: &Arc<Update>, child: Arc<Update>) {
    parent.publish_next(child).expect("freshly allocated node must have no successor yet");
}

/// Walks to the current tail of a (possibly empty) chain and appends
/// `new_tail` with a single release-store. No-op if `head` is `None` --
/// an appender never creates a chain from nothing, it only extends one
/// that already has at least the update being reconciled.
pub fn append_tail(head: &Arc<Update>, new_tail: Arc<Update>) {
    let mut cur = head;
    while let Some(next) = cur.next() {
        cur = next;
    }
    cur.publish_next(new_tail).expect("single-writer chain: tail must be unset");
}

/// An iterator over the non-aborted entries of a chain, newest first.
/// Aborted entries may appear anywhere in the chain and are skipped
/// transparently.
pub struct NonAbortedIter<'a> {
    cur: Option<&'a Arc<Update>>,
}

impl<'a> Iterator for NonAbortedIter<'a> {
    type Item = &'a Arc<Update>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.cur.take()?;
            self.cur = node.next();
            if !node.is_aborted() {
                return Some(node);
            }
        }
    }
}

pub fn iter_non_aborted(head: Option<&Arc<Update>>) -> NonAbortedIter<'_> {
    NonAbortedIter { cur: head }
}
