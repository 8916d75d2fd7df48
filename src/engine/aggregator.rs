//! Groups reconciled positions into counterparty relationships and
//! portfolio-wide statistics.
//!
//! Everything here is a pure function of the reconciled state, an account,
//! the token registry, and an `as_of` instant; no aggregator state survives
//! between calls.

use crate::domain::{Address, CreditLine, Loan, RawAmount, TimeSec, TokenRegistry};
use crate::engine::{PortfolioStats, Relationship, RiskTier, TrustLevel};
use primitive_types::U256;
use std::collections::BTreeMap;
use tracing::warn;

/// Cross-token sums are expressed at this precision.
pub const NORMALIZED_DECIMALS: u8 = 18;

/// Inputs shared by every aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct AggregationContext<'a> {
    pub account: &'a Address,
    pub registry: &'a TokenRegistry,
    /// Evaluation instant for payment-cadence checks.
    pub as_of: TimeSec,
    /// Maximum gap between payment checkpoints before a loan counts as
    /// off-schedule.
    pub payment_cadence_secs: i64,
}

/// Group all positions by the counterparty address.
pub fn build_relationships(
    ctx: &AggregationContext<'_>,
    loans: &[Loan],
    credit_lines: &[CreditLine],
) -> Vec<Relationship> {
    // BTreeMap keeps the output ordering deterministic.
    let mut groups: BTreeMap<Address, RelationshipDraft> = BTreeMap::new();

    for loan in loans {
        let counterparty = other_party(ctx.account, &loan.lender, &loan.borrower);
        groups.entry(counterparty).or_default().loans.push(loan);
    }
    for line in credit_lines {
        let counterparty = other_party(ctx.account, &line.lender, &line.borrower);
        let draft = groups.entry(counterparty).or_default();
        let Some(limit) = normalized(ctx.registry, &line.token, line.credit_limit) else {
            warn!(
                "credit line in unregistered token {} excluded from aggregates",
                line.token
            );
            continue;
        };
        if line.lender == *ctx.account {
            draft.credit_given = draft.credit_given.saturating_add(limit);
        } else {
            draft.credit_received = draft.credit_received.saturating_add(limit);
        }
    }

    groups
        .into_iter()
        .map(|(address, draft)| {
            // Payment reliability is about the counterparty as debtor.
            let debtor_loans: Vec<&Loan> = draft
                .loans
                .iter()
                .copied()
                .filter(|l| l.borrower == address)
                .collect();
            let score = payment_score(&debtor_loans, ctx.as_of, ctx.payment_cadence_secs);
            let total_loans = draft.loans.len() as u32;

            let mut payment_history: Vec<_> = draft
                .loans
                .iter()
                .flat_map(|l| l.payments.iter().cloned())
                .collect();
            payment_history.sort_by_key(|p| (p.at, p.loan_id));

            Relationship {
                trust_level: trust_level(total_loans, score),
                address,
                credit_given: draft.credit_given,
                credit_received: draft.credit_received,
                total_loans,
                payment_score: score,
                payment_history,
            }
        })
        .collect()
}

#[derive(Default)]
struct RelationshipDraft<'a> {
    loans: Vec<&'a Loan>,
    credit_given: RawAmount,
    credit_received: RawAmount,
}

/// Share (0-100) of the given loans that are on schedule; None when there is
/// no loan to judge.
pub fn payment_score(loans: &[&Loan], as_of: TimeSec, cadence_secs: i64) -> Option<u8> {
    if loans.is_empty() {
        return None;
    }
    let on_schedule = loans
        .iter()
        .filter(|l| loan_on_schedule(l, as_of, cadence_secs))
        .count();
    Some((on_schedule * 100 / loans.len()) as u8)
}

/// A loan is on schedule when no two consecutive checkpoints — origination,
/// each payment, and (while it stays active) `as_of` — are separated by more
/// than the cadence. A loan with no payments past its expected cadence is
/// off schedule.
fn loan_on_schedule(loan: &Loan, as_of: TimeSec, cadence_secs: i64) -> bool {
    let mut last = loan.created_at;
    for payment in &loan.payments {
        if payment.at.secs_since(last) > cadence_secs {
            return false;
        }
        if payment.at > last {
            last = payment.at;
        }
    }
    if loan.is_active() && as_of.secs_since(last) > cadence_secs {
        return false;
    }
    true
}

/// Trust tier thresholds; ties resolve toward the lower tier, and an
/// undefined score is always `New`.
pub fn trust_level(total_loans: u32, payment_score: Option<u8>) -> TrustLevel {
    match payment_score {
        Some(score) if total_loans >= 5 && score >= 90 => TrustLevel::Verified,
        Some(score) if total_loans >= 1 && score >= 70 => TrustLevel::Trusted,
        _ => TrustLevel::New,
    }
}

/// Portfolio-wide scalar summary for one account.
pub fn compute_portfolio_stats(
    ctx: &AggregationContext<'_>,
    loans: &[Loan],
    credit_lines: &[CreditLine],
    relationships: &[Relationship],
) -> PortfolioStats {
    let mut total_lent = RawAmount::zero();
    let mut total_borrowed = RawAmount::zero();
    let mut lent_weighted = U256::zero();
    let mut borrowed_weighted = U256::zero();
    let mut active_loans = 0u32;

    for loan in loans {
        if loan.is_active() {
            active_loans += 1;
        }
        let Some(outstanding) = normalized(ctx.registry, &loan.token, loan.outstanding_principal())
        else {
            warn!("loan {} in unregistered token {} excluded from totals", loan.id, loan.token);
            continue;
        };
        let weight = outstanding
            .as_u256()
            .saturating_mul(U256::from(loan.interest_rate_bps));
        if loan.lender == *ctx.account {
            total_lent = total_lent.saturating_add(outstanding);
            lent_weighted = lent_weighted.saturating_add(weight);
        }
        if loan.borrower == *ctx.account {
            total_borrowed = total_borrowed.saturating_add(outstanding);
            borrowed_weighted = borrowed_weighted.saturating_add(weight);
        }
    }

    let lent_apy_bps = weighted_rate(lent_weighted, total_lent);
    let borrowed_apy_bps = weighted_rate(borrowed_weighted, total_borrowed);

    let active_lines: Vec<_> = credit_lines.iter().filter(|l| l.is_active()).collect();
    let avg_utilization_bps = if active_lines.is_empty() {
        0
    } else {
        let sum: u64 = active_lines.iter().map(|l| l.utilization_bps() as u64).sum();
        (sum / active_lines.len() as u64) as u32
    };

    let mut risk_tier = RiskTier::Low;
    if avg_utilization_bps > 5_000 {
        risk_tier = RiskTier::Medium;
    }
    if avg_utilization_bps > 8_000 {
        risk_tier = risk_tier.escalate();
    }
    let new_count = relationships
        .iter()
        .filter(|r| r.trust_level == TrustLevel::New)
        .count();
    if !relationships.is_empty() && new_count * 2 > relationships.len() {
        risk_tier = risk_tier.escalate();
    }

    PortfolioStats {
        total_lent,
        total_borrowed,
        active_loans,
        lent_apy_bps,
        borrowed_apy_bps,
        net_apy_bps: lent_apy_bps as i64 - borrowed_apy_bps as i64,
        avg_utilization_bps,
        risk_tier,
    }
}

/// Floor-weighted mean rate in bps; zero when nothing is outstanding.
fn weighted_rate(weighted_sum: U256, total: RawAmount) -> u32 {
    if total.is_zero() {
        return 0;
    }
    let rate = weighted_sum / total.as_u256();
    if rate > U256::from(u32::MAX) {
        u32::MAX
    } else {
        rate.as_u32()
    }
}

/// The other party of a bilateral position relative to the local account.
fn other_party(account: &Address, lender: &Address, borrower: &Address) -> Address {
    if lender == account {
        borrower.clone()
    } else {
        lender.clone()
    }
}

/// Rescale a raw amount to the normalized precision; None when the token is
/// unregistered or the upscale overflows.
fn normalized(registry: &TokenRegistry, token: &Address, amount: RawAmount) -> Option<RawAmount> {
    let decimals = registry.decimals(token)?;
    amount.rescale(decimals, NORMALIZED_DECIMALS)
}
