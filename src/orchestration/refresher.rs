//! The portfolio service: per-account session, refresh pipeline, and the
//! stale-while-revalidate read path.
//!
//! All reconciliation and aggregation is synchronous pure computation; only
//! the gateway reads suspend. Event and state fetches fan out concurrently
//! but are fully joined before any folding starts — reconciliation needs the
//! complete event set for a range to keep its ordering invariants.

use crate::cache::{
    CacheEntry, Freshness, PoolPosition, SnapshotCache, TokenBalance, ViewKind, ViewSnapshot,
};
use crate::domain::{Address, EventKind, TimeSec, Token, TokenRegistry};
use crate::engine::{
    build_relationships, compute_portfolio_stats, AggregationContext, PositionReconciler,
};
use crate::gateway::{GatewayError, ReadGateway};
use crate::ledger::{abi, EventLedgerReader};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The view could not be computed from any source.
    #[error("view data unavailable")]
    Unavailable,
}

/// A snapshot handed to the presentation boundary.
#[derive(Debug, Clone)]
pub struct ViewData {
    pub snapshot: Arc<ViewSnapshot>,
    pub block_height: u64,
    /// Event kinds whose queries failed when this snapshot was computed; the
    /// view is present but degraded.
    pub degraded: Vec<EventKind>,
}

impl From<CacheEntry> for ViewData {
    fn from(entry: CacheEntry) -> Self {
        ViewData {
            snapshot: entry.snapshot,
            block_height: entry.block_height,
            degraded: entry.degraded,
        }
    }
}

/// Reconciler state for the currently selected account. Created on first
/// read for an account, torn down when the selection moves on.
struct Session {
    account: Address,
    reconciler: PositionReconciler,
}

/// Read-model orchestrator for one process.
pub struct PortfolioService {
    gateway: Arc<dyn ReadGateway>,
    reader: EventLedgerReader,
    cache: Arc<SnapshotCache>,
    registry: Arc<TokenRegistry>,
    ledger_contract: Address,
    payment_cadence_secs: i64,
    session: Mutex<Option<Session>>,
    /// Serializes refresh passes so overlapping triggers cannot interleave
    /// folds over the same session.
    refresh_lock: Mutex<()>,
}

impl PortfolioService {
    pub fn new(
        gateway: Arc<dyn ReadGateway>,
        registry: Arc<TokenRegistry>,
        cache: Arc<SnapshotCache>,
        ledger_contract: Address,
        payment_cadence_secs: i64,
    ) -> Self {
        let reader = EventLedgerReader::new(gateway.clone(), ledger_contract.clone());
        Self {
            gateway,
            reader,
            cache,
            registry,
            ledger_contract,
            payment_cadence_secs,
            session: Mutex::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Serve a view snapshot, stale-while-revalidate.
    ///
    /// Fresh hit: served as-is. Stale hit: served immediately while a
    /// background refresh runs. Miss: refreshed inline. A view that cannot
    /// be computed is an explicit error, never a defaulted-empty snapshot.
    pub async fn get_view(
        self: &Arc<Self>,
        account: &Address,
        kind: ViewKind,
    ) -> Result<ViewData, ViewError> {
        self.ensure_session(account).await;

        match self.cache.get(account, kind) {
            Some((entry, Freshness::Fresh)) => Ok(entry.into()),
            Some((entry, Freshness::Stale)) => {
                let service = Arc::clone(self);
                let account = account.clone();
                tokio::spawn(async move {
                    if let Err(e) = service.refresh(&account).await {
                        warn!("background refresh failed for {}: {}", account, e);
                    }
                });
                Ok(entry.into())
            }
            None => {
                self.refresh(account).await?;
                self.cache
                    .get(account, kind)
                    .map(|(entry, _)| entry.into())
                    .ok_or(ViewError::Unavailable)
            }
        }
    }

    /// Explicit invalidation once a locally-submitted transaction confirms.
    /// The next read refreshes from chain state that already includes it.
    pub async fn on_transaction_confirmed(&self, account: &Address, block_number: u64) {
        info!(
            "transaction confirmed at block {} for {}; invalidating views",
            block_number, account
        );
        self.cache.invalidate_after_tx(account);
    }

    /// One full refresh pass for an account.
    pub async fn refresh(&self, account: &Address) -> Result<(), ViewError> {
        let _guard = self.refresh_lock.lock().await;

        // Narrow the fetch to the session watermark; overlap at the boundary
        // block is safe because folding is idempotent.
        let from_block = {
            let session = self.session.lock().await;
            session
                .as_ref()
                .filter(|s| s.account == *account)
                .and_then(|s| s.reconciler.highest_block())
        };

        let to_block = self.gateway.block_number().await?;

        let (batch, balances, pool) = tokio::join!(
            self.reader
                .fetch_events(account, &EventKind::ALL, from_block, to_block),
            self.fetch_token_balances(account),
            self.fetch_pool_position(account),
        );

        // The selection may have moved on while the fetches were in flight;
        // results for a superseded account are dropped, not applied.
        let mut session_guard = self.session.lock().await;
        let session = match session_guard.as_mut() {
            Some(s) if s.account == *account => s,
            _ => {
                debug!("discarding refresh results for superseded selection {}", account);
                return Ok(());
            }
        };

        let summary = session.reconciler.fold_batch(&batch.events);
        debug!(
            "refresh for {} at block {}: {} applied, {} replayed, {} quarantined",
            account, to_block, summary.applied, summary.replayed, summary.quarantined
        );

        let degraded = batch.degraded_kinds();
        let total_failure = degraded.len() == EventKind::ALL.len();
        // With every query failed and nothing previously reconciled there is
        // no event-derived state worth publishing; the views stay unavailable
        // rather than reading as an empty portfolio.
        if !(total_failure && session.reconciler.highest_block().is_none()) {
            let loans = session.reconciler.loans();
            let credit_lines = session.reconciler.credit_lines();
            let ctx = AggregationContext {
                account,
                registry: &self.registry,
                as_of: TimeSec::new(chrono::Utc::now().timestamp()),
                payment_cadence_secs: self.payment_cadence_secs,
            };
            let relationships = build_relationships(&ctx, &loans, &credit_lines);
            let stats = compute_portfolio_stats(&ctx, &loans, &credit_lines, &relationships);

            self.cache.insert(
                account,
                ViewKind::Loans,
                ViewSnapshot::Loans(loans),
                to_block,
                degraded.clone(),
            );
            self.cache.insert(
                account,
                ViewKind::CreditLines,
                ViewSnapshot::CreditLines(credit_lines),
                to_block,
                degraded.clone(),
            );
            self.cache.insert(
                account,
                ViewKind::Relationships,
                ViewSnapshot::Relationships(relationships),
                to_block,
                degraded.clone(),
            );
            self.cache.insert(
                account,
                ViewKind::Portfolio,
                ViewSnapshot::Portfolio(stats),
                to_block,
                degraded.clone(),
            );
        }

        self.cache.insert(
            account,
            ViewKind::TokenBalances,
            ViewSnapshot::TokenBalances(balances),
            to_block,
            vec![],
        );
        match pool {
            Ok(position) => {
                self.cache.insert(
                    account,
                    ViewKind::PoolPosition,
                    ViewSnapshot::PoolPosition(position),
                    to_block,
                    vec![],
                );
            }
            Err(e) => {
                // Keep any previous pool snapshot; an error here must not
                // blank out the other views.
                warn!("pool position read failed for {}: {}", account, e);
            }
        }

        Ok(())
    }

    /// Wallet balances for every registered token, fanned out concurrently.
    /// A failed read yields an explicit unavailable entry, never zero.
    async fn fetch_token_balances(&self, account: &Address) -> Vec<TokenBalance> {
        let tokens: Vec<Token> = self.registry.tokens().into_iter().cloned().collect();
        let fetches = tokens.iter().map(|token| {
            let token_address = token.address.clone();
            async move {
                let calldata = match abi::encode_balance_of(account) {
                    Ok(calldata) => calldata,
                    Err(e) => {
                        warn!("balanceOf encode failed for {}: {}", account, e);
                        return None;
                    }
                };
                match self.gateway.call(&token_address, calldata).await {
                    Ok(bytes) => match abi::decode_amount_return(&bytes) {
                        Ok(amount) => Some(amount),
                        Err(e) => {
                            warn!("balance decode failed for token {}: {}", token_address, e);
                            None
                        }
                    },
                    Err(e) => {
                        warn!("balance read failed for token {}: {}", token_address, e);
                        None
                    }
                }
            }
        });
        let balances = join_all(fetches).await;
        tokens
            .into_iter()
            .zip(balances)
            .map(|(token, balance)| TokenBalance { token, balance })
            .collect()
    }

    async fn fetch_pool_position(&self, account: &Address) -> Result<PoolPosition, ViewError> {
        let calldata = abi::encode_pool_balance_of(account)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let bytes = self.gateway.call(&self.ledger_contract, calldata).await?;
        let balance =
            abi::decode_amount_return(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(PoolPosition { balance })
    }

    /// Create or supersede the session for the selected account. A new
    /// selection gets a fresh reconciler; the superseded session's in-flight
    /// results will fail the account check at apply time.
    async fn ensure_session(&self, account: &Address) {
        let mut session = self.session.lock().await;
        let matches = session
            .as_ref()
            .map_or(false, |s| s.account == *account);
        if !matches {
            if session.is_some() {
                info!("account selection changed to {}", account);
            }
            *session = Some(Session {
                account: account.clone(),
                reconciler: PositionReconciler::new(),
            });
        }
    }
}
