//! A scenario is a small, serialisable description of one key's update
//! chain and the reconciliation context to run it through -- the shape
//! `reconcile-cli` loads via `confy` and `reconcile-demo` builds in code.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_derive::{Deserialize, Serialize};

use reconcile::alloc::HeapAllocator;
use reconcile::chain::{append_tail, Update, UpdateKind};
use reconcile::context::{ReconcileContext, ReconcileFlags};
use reconcile::page::test_support::NullPageProvider;
use reconcile::reconcile::{upd_select, UpdateSelection};
use reconcile::txn::{PrepareState, TxnId};
use reconcile::visibility::test_support::FakeTransactionManager;
use reconcile::visibility::VisibilityOracle;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateEntry {
    pub kind: String,
    pub txn_id: u64,
    pub start_ts: u64,
    pub durable_ts: u64,
    #[serde(default)]
    pub prepare_state: String,
    #[serde(default)]
    pub committed: bool,
    #[serde(default)]
    pub payload: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CellEntry {
    pub start_ts: u64,
    pub start_txn: u64,
    #[serde(default)]
    pub stop_ts: Option<u64>,
    #[serde(default)]
    pub stop_txn: Option<u64>,
    #[serde(default)]
    pub overflow: bool,
    pub payload: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScenarioConfig {
    pub last_running: u64,
    #[serde(default)]
    pub pinned_oldest_ts: u64,
    #[serde(default)]
    pub stable_timestamp: u64,
    #[serde(default)]
    pub evict: bool,
    #[serde(default)]
    pub checkpoint: bool,
    #[serde(default)]
    pub history_store: bool,
    #[serde(default)]
    pub in_memory: bool,
    #[serde(default)]
    pub fixed_length_column_store: bool,
    #[serde(default)]
    pub clean_after_rec: bool,
    #[serde(default)]
    pub visibility_err: bool,
    #[serde(default)]
    pub chain: Vec<UpdateEntry>,
    #[serde(default)]
    pub cell: Option<CellEntry>,
}

fn parse_kind(s: &str) -> Result<UpdateKind> {
    Ok(match s {
        "standard" => UpdateKind::Standard,
        "modify" => UpdateKind::Modify,
        "tombstone" => UpdateKind::Tombstone,
        "reserve" => UpdateKind::Reserve,
        "restored" => UpdateKind::RestoredFromHistory,
        other => return Err(anyhow!("unknown update kind '{other}'")),
    })
}

fn parse_prepare_state(s: &str) -> Result<PrepareState> {
    Ok(match s {
        "" | "none" => PrepareState::None,
        "locked" => PrepareState::Locked,
        "in_progress" => PrepareState::InProgress,
        "resolved" => PrepareState::Resolved,
        other => return Err(anyhow!("unknown prepare state '{other}'")),
    })
}

/// The outcome of running a scenario, plus the context mutations a reader
/// inspecting the pass would want to see alongside the selection itself.
pub struct ScenarioOutcome {
    pub selection: UpdateSelection,
    pub updates_seen: u64,
    pub updates_unstable: u64,
    pub saved_count: usize,
    pub cache_write_restore: bool,
    pub repair_count: u64,
}

pub fn run(cfg: &ScenarioConfig) -> Result<ScenarioOutcome> {
    let mgr = FakeTransactionManager::new(TxnId::new(cfg.last_running));
    *mgr.pinned_oldest_ts.lock().unwrap() = cfg.pinned_oldest_ts;
    for entry in &cfg.chain {
        if entry.committed {
            mgr.commit(TxnId::new(entry.txn_id));
        }
    }
    let oracle = VisibilityOracle::new(&mgr, cfg.history_store);
    let alloc = HeapAllocator;

    let mut head: Option<Arc<Update>> = None;
    for entry in &cfg.chain {
        let node = Update::new(
            parse_kind(&entry.kind)?,
            TxnId::new(entry.txn_id),
            entry.start_ts,
            entry.durable_ts,
            parse_prepare_state(&entry.prepare_state)?,
            entry.payload.clone(),
        );
        match &head {
            None => head = Some(node),
            Some(h) => append_tail(h, node),
        }
    }
    let page = NullPageProvider::with_chain(head);

    let mut flags = ReconcileFlags::VISIBLE_ALL;
    if cfg.evict {
        flags |= ReconcileFlags::EVICT;
    }
    if cfg.checkpoint {
        flags |= ReconcileFlags::CHECKPOINT;
    }
    if cfg.history_store {
        flags |= ReconcileFlags::HS;
    }
    if cfg.in_memory {
        flags |= ReconcileFlags::IN_MEMORY;
    }
    if cfg.clean_after_rec {
        flags |= ReconcileFlags::CLEAN_AFTER_REC;
    }
    if cfg.visibility_err {
        flags |= ReconcileFlags::VISIBILITY_ERR;
    }

    let mut ctx = ReconcileContext::new(flags, TxnId::new(cfg.last_running), cfg.stable_timestamp)
        .with_fixed_length_column_store(cfg.fixed_length_column_store);

    let cell_payload;
    let cell = match &cfg.cell {
        Some(c) => {
            cell_payload = c.payload.clone();
            let mut window = reconcile::time::TimeWindow::init();
            window.set_start(c.start_ts, TxnId::new(c.start_txn), c.start_ts);
            if let (Some(stop_ts), Some(stop_txn)) = (c.stop_ts, c.stop_txn) {
                window.set_stop(stop_ts, TxnId::new(stop_txn), stop_ts);
            }
            Some(reconcile::cell::OnDiskCell::new(
                reconcile::cell::CellKind::Value,
                window,
                c.overflow,
                &cell_payload,
            ))
        }
        None => None,
    };

    let selection = upd_select(&mut ctx, &page, &oracle, &alloc, None, None, cell.as_ref())
        .map_err(|e| anyhow!("{e}"))?;

    Ok(ScenarioOutcome {
        saved_count: ctx.saved.len(),
        cache_write_restore: ctx.cache_write_restore,
        repair_count: ctx.repair_count,
        updates_seen: ctx.updates_seen,
        updates_unstable: ctx.updates_unstable,
        selection,
    })
}
