//! Pure computation engines for deterministic read-model logic.

use crate::domain::{Address, PaymentRecord, RawAmount};
use serde::{Deserialize, Serialize};

pub mod aggregator;
pub mod reconciler;

pub use aggregator::{build_relationships, compute_portfolio_stats, AggregationContext};
pub use reconciler::{
    AnomalyReason, EntityId, FoldAnomaly, FoldOutcome, FoldSummary, PositionReconciler,
};

/// Coarse classification of a counterparty's payment reliability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// No loan history (or score undefined).
    New,
    /// At least one loan with a payment score of 70 or better.
    Trusted,
    /// At least five loans with a payment score of 90 or better.
    Verified,
}

/// Aggregated view of all positions shared with one counterparty.
///
/// Derived, never persisted; recomputed from the reconciled sets on every
/// aggregation pass. Amount fields are normalized to 18 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub address: Address,
    pub trust_level: TrustLevel,
    pub credit_given: RawAmount,
    pub credit_received: RawAmount,
    pub total_loans: u32,
    pub payment_score: Option<u8>,
    pub payment_history: Vec<PaymentRecord>,
}

/// Portfolio risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// One tier worse, clamped at High.
    pub fn escalate(self) -> RiskTier {
        match self {
            RiskTier::Low => RiskTier::Medium,
            RiskTier::Medium | RiskTier::High => RiskTier::High,
        }
    }
}

/// Scalar summary over one account's full position set.
///
/// No identity of its own; recomputed whole, never partially mutated.
/// Amount fields are normalized to 18 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_lent: RawAmount,
    pub total_borrowed: RawAmount,
    pub active_loans: u32,
    pub lent_apy_bps: u32,
    pub borrowed_apy_bps: u32,
    /// Lent APY minus borrowed APY, signed.
    pub net_apy_bps: i64,
    pub avg_utilization_bps: u32,
    pub risk_tier: RiskTier,
}
