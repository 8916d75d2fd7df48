//! Read-model cache: immutable snapshots keyed by (account, view).
//!
//! Entries are served stale-while-revalidate: a stale snapshot is still
//! returned while the service refreshes in the background. A snapshot is
//! never mutated in place; a new entry replaces the old one atomically under
//! the lock. After a locally-submitted transaction confirms, the affected
//! views are invalidated explicitly — polling alone would leave them stale
//! until the next natural cycle.

use crate::domain::{Address, CreditLine, EventKind, Loan, RawAmount, Token};
use crate::engine::{PortfolioStats, Relationship};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The views the read model serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    Loans,
    CreditLines,
    Relationships,
    Portfolio,
    TokenBalances,
    PoolPosition,
}

/// Views dropped when a local transaction confirms. The derived views
/// (relationships, portfolio) rebuild with the refresh the next read triggers.
pub const INVALIDATED_ON_TX: [ViewKind; 4] = [
    ViewKind::PoolPosition,
    ViewKind::TokenBalances,
    ViewKind::CreditLines,
    ViewKind::Loans,
];

/// One token's wallet balance. `None` means the read failed: an unavailable
/// balance must stay distinguishable from a zero one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: Token,
    pub balance: Option<RawAmount>,
}

/// The account's deposit position in the lending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPosition {
    pub balance: RawAmount,
}

/// An immutable view snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewSnapshot {
    Loans(Vec<Loan>),
    CreditLines(Vec<CreditLine>),
    Relationships(Vec<Relationship>),
    Portfolio(PortfolioStats),
    TokenBalances(Vec<TokenBalance>),
    PoolPosition(PoolPosition),
}

/// Freshness classification at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Past the staleness window; serve it, but refresh.
    Stale,
}

/// A cached snapshot plus the chain position it was computed at.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: Arc<ViewSnapshot>,
    pub block_height: u64,
    pub computed_at: DateTime<Utc>,
    /// Event kinds whose queries failed when this snapshot was computed.
    pub degraded: Vec<EventKind>,
}

/// Keyed snapshot store with explicit invalidation.
#[derive(Debug)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<(Address, ViewKind), CacheEntry>>,
    staleness: Duration,
}

impl SnapshotCache {
    pub fn new(staleness_ms: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            staleness: Duration::milliseconds(staleness_ms),
        }
    }

    /// Look up a snapshot, classifying its freshness against now.
    pub fn get(&self, account: &Address, kind: ViewKind) -> Option<(CacheEntry, Freshness)> {
        self.get_at(account, kind, Utc::now())
    }

    /// Look up a snapshot at an explicit instant (test seam).
    pub fn get_at(
        &self,
        account: &Address,
        kind: ViewKind,
        now: DateTime<Utc>,
    ) -> Option<(CacheEntry, Freshness)> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(&(account.clone(), kind))?.clone();
        let freshness = if now.signed_duration_since(entry.computed_at) > self.staleness {
            Freshness::Stale
        } else {
            Freshness::Fresh
        };
        Some((entry, freshness))
    }

    /// Publish a snapshot, replacing any previous entry for the key.
    pub fn insert(
        &self,
        account: &Address,
        kind: ViewKind,
        snapshot: ViewSnapshot,
        block_height: u64,
        degraded: Vec<EventKind>,
    ) {
        let entry = CacheEntry {
            snapshot: Arc::new(snapshot),
            block_height,
            computed_at: Utc::now(),
            degraded,
        };
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert((account.clone(), kind), entry);
    }

    /// Drop specific views for an account.
    pub fn invalidate(&self, account: &Address, kinds: &[ViewKind]) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        for &kind in kinds {
            entries.remove(&(account.clone(), kind));
        }
    }

    /// Drop the views affected by a confirmed local transaction.
    pub fn invalidate_after_tx(&self, account: &Address) {
        self.invalidate(account, &INVALIDATED_ON_TX);
    }

    /// Drop every view for an account (session teardown).
    pub fn clear_account(&self, account: &Address) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|(a, _), _| a != account);
    }
}
