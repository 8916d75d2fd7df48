use lendscope::domain::{
    Address, CreditLine, Loan, LoanId, PaymentRecord, RawAmount, TimeSec, TokenRegistry,
};
use lendscope::engine::aggregator::{
    build_relationships, compute_portfolio_stats, payment_score, trust_level, AggregationContext,
};
use lendscope::engine::{RiskTier, TrustLevel};

const ACCOUNT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const COUNTERPARTY: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const OTHER: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
const USDC: &str = "0xdddddddddddddddddddddddddddddddddddddddd";

const DAY: i64 = 86_400;
const CADENCE: i64 = 30 * DAY;
const T0: i64 = 1_700_000_000;

fn amt(v: u64) -> RawAmount {
    RawAmount::from(v)
}

fn addr(s: &str) -> Address {
    Address::new(s)
}

fn registry() -> TokenRegistry {
    TokenRegistry::from_entries([format!("{}:USDC:6", USDC)]).unwrap()
}

fn loan(id: u64, lender: &str, borrower: &str, principal: u64, rate_bps: u32) -> Loan {
    Loan::open(
        LoanId::new(id),
        addr(lender),
        addr(borrower),
        addr(USDC),
        amt(principal),
        rate_bps,
        TimeSec::new(T0),
    )
}

/// A loan fully repaid with one prompt payment; closed and on schedule.
fn repaid_loan(id: u64, lender: &str, borrower: &str, principal: u64) -> Loan {
    let mut loan = loan(id, lender, borrower, principal, 500);
    let paid_at = TimeSec::new(T0 + 10 * DAY);
    loan.repaid_principal = amt(principal);
    loan.last_payment_at = Some(paid_at);
    loan.payments.push(PaymentRecord {
        loan_id: loan.id,
        at: paid_at,
        principal_paid: amt(principal),
        interest_paid: amt(1_000),
    });
    loan
}

fn ctx<'a>(registry: &'a TokenRegistry, account: &'a Address, as_of: i64) -> AggregationContext<'a> {
    AggregationContext {
        account,
        registry,
        as_of: TimeSec::new(as_of),
        payment_cadence_secs: CADENCE,
    }
}

#[test]
fn test_six_prompt_loans_reach_verified() {
    // Scenario: a counterparty with six loans, all paid on schedule.
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans: Vec<Loan> = (1..=6)
        .map(|id| repaid_loan(id, ACCOUNT, COUNTERPARTY, 1_000_000))
        .collect();

    let relationships =
        build_relationships(&ctx(&registry, &account, T0 + 20 * DAY), &loans, &[]);

    assert_eq!(relationships.len(), 1);
    let rel = &relationships[0];
    assert_eq!(rel.address, addr(COUNTERPARTY));
    assert_eq!(rel.total_loans, 6);
    assert_eq!(rel.payment_score, Some(100));
    assert_eq!(rel.trust_level, TrustLevel::Verified);
    assert_eq!(rel.payment_history.len(), 6);
}

#[test]
fn test_few_prompt_loans_stay_trusted() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans = vec![
        repaid_loan(1, ACCOUNT, COUNTERPARTY, 1_000_000),
        repaid_loan(2, ACCOUNT, COUNTERPARTY, 500_000),
    ];

    let relationships =
        build_relationships(&ctx(&registry, &account, T0 + 20 * DAY), &loans, &[]);

    assert_eq!(relationships[0].payment_score, Some(100));
    assert_eq!(relationships[0].trust_level, TrustLevel::Trusted);
}

#[test]
fn test_counterparty_with_only_credit_lines_is_new() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let line = CreditLine {
        lender: addr(ACCOUNT),
        borrower: addr(COUNTERPARTY),
        token: addr(USDC),
        credit_limit: amt(1_000_000),
        utilised_credit: RawAmount::zero(),
        min_apr_bps: 300,
        max_apr_bps: 1200,
        origination_fee_bps: 50,
    };

    let relationships = build_relationships(&ctx(&registry, &account, T0), &[], &[line]);

    let rel = &relationships[0];
    assert_eq!(rel.total_loans, 0);
    assert_eq!(rel.payment_score, None);
    assert_eq!(rel.trust_level, TrustLevel::New);
    // 1.0 unit at 6 decimals, normalized to 18 decimals.
    assert_eq!(rel.credit_given, amt(10u64.pow(18)));
    assert_eq!(rel.credit_received, RawAmount::zero());
}

#[test]
fn test_silent_loan_past_cadence_penalizes_score() {
    let registry = registry();
    let account = addr(ACCOUNT);
    // Active, created 90 days ago, not a single payment.
    let loans = vec![loan(1, ACCOUNT, COUNTERPARTY, 1_000_000, 500)];

    let relationships =
        build_relationships(&ctx(&registry, &account, T0 + 90 * DAY), &loans, &[]);

    assert_eq!(relationships[0].payment_score, Some(0));
    assert_eq!(relationships[0].trust_level, TrustLevel::New);
}

#[test]
fn test_payment_score_is_the_on_schedule_share() {
    let on_schedule = repaid_loan(1, ACCOUNT, COUNTERPARTY, 1_000_000);
    let silent = loan(2, ACCOUNT, COUNTERPARTY, 1_000_000, 500);

    let score = payment_score(&[&on_schedule, &silent], TimeSec::new(T0 + 90 * DAY), CADENCE);
    assert_eq!(score, Some(50));

    assert_eq!(payment_score(&[], TimeSec::new(T0), CADENCE), None);
}

#[test]
fn test_trust_tier_boundaries_resolve_conservatively() {
    assert_eq!(trust_level(0, None), TrustLevel::New);
    assert_eq!(trust_level(3, None), TrustLevel::New);
    assert_eq!(trust_level(1, Some(69)), TrustLevel::New);
    assert_eq!(trust_level(1, Some(70)), TrustLevel::Trusted);
    assert_eq!(trust_level(4, Some(95)), TrustLevel::Trusted);
    assert_eq!(trust_level(5, Some(89)), TrustLevel::Trusted);
    assert_eq!(trust_level(5, Some(90)), TrustLevel::Verified);
}

#[test]
fn test_net_apy_weighted_by_outstanding() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans = vec![
        loan(1, ACCOUNT, COUNTERPARTY, 1_000_000, 500),
        loan(2, ACCOUNT, COUNTERPARTY, 1_000_000, 1_000),
        loan(3, OTHER, ACCOUNT, 2_000_000, 400),
    ];

    let context = ctx(&registry, &account, T0 + DAY);
    let relationships = build_relationships(&context, &loans, &[]);
    let stats = compute_portfolio_stats(&context, &loans, &[], &relationships);

    assert_eq!(stats.total_lent, amt(2 * 10u64.pow(18)));
    assert_eq!(stats.total_borrowed, amt(2 * 10u64.pow(18)));
    assert_eq!(stats.lent_apy_bps, 750);
    assert_eq!(stats.borrowed_apy_bps, 400);
    assert_eq!(stats.net_apy_bps, 350);
    assert_eq!(stats.active_loans, 3);
}

#[test]
fn test_closed_loans_do_not_move_totals() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans = vec![
        loan(1, ACCOUNT, COUNTERPARTY, 1_000_000, 500),
        repaid_loan(2, ACCOUNT, COUNTERPARTY, 9_000_000),
    ];

    let context = ctx(&registry, &account, T0 + DAY);
    let relationships = build_relationships(&context, &loans, &[]);
    let stats = compute_portfolio_stats(&context, &loans, &[], &relationships);

    assert_eq!(stats.total_lent, amt(10u64.pow(18)));
    assert_eq!(stats.active_loans, 1);
    assert_eq!(stats.lent_apy_bps, 500);
}

#[test]
fn test_unregistered_token_excluded_from_totals() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let mut exotic = loan(1, ACCOUNT, COUNTERPARTY, 5_000_000, 500);
    exotic.token = addr("0x9999999999999999999999999999999999999999");
    let loans = vec![exotic, loan(2, ACCOUNT, COUNTERPARTY, 1_000_000, 800)];

    let context = ctx(&registry, &account, T0 + DAY);
    let relationships = build_relationships(&context, &loans, &[]);
    let stats = compute_portfolio_stats(&context, &loans, &[], &relationships);

    assert_eq!(stats.total_lent, amt(10u64.pow(18)));
    assert_eq!(stats.lent_apy_bps, 800);
}

fn line_with_utilization(limit: u64, utilised: u64) -> CreditLine {
    CreditLine {
        lender: addr(ACCOUNT),
        borrower: addr(COUNTERPARTY),
        token: addr(USDC),
        credit_limit: amt(limit),
        utilised_credit: amt(utilised),
        min_apr_bps: 300,
        max_apr_bps: 1200,
        origination_fee_bps: 50,
    }
}

#[test]
fn test_risk_tier_low_for_quiet_portfolio() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans = vec![repaid_loan(1, ACCOUNT, COUNTERPARTY, 1_000_000)];
    let lines = vec![line_with_utilization(1_000_000, 100_000)];

    let context = ctx(&registry, &account, T0 + 20 * DAY);
    let relationships = build_relationships(&context, &loans, &lines);
    let stats = compute_portfolio_stats(&context, &loans, &lines, &relationships);

    assert_eq!(stats.avg_utilization_bps, 1_000);
    assert_eq!(stats.risk_tier, RiskTier::Low);
}

#[test]
fn test_heavy_utilization_escalates_to_high() {
    let registry = registry();
    let account = addr(ACCOUNT);
    let loans = vec![repaid_loan(1, ACCOUNT, COUNTERPARTY, 1_000_000)];
    let lines = vec![line_with_utilization(1_000_000, 900_000)];

    let context = ctx(&registry, &account, T0 + 20 * DAY);
    let relationships = build_relationships(&context, &loans, &lines);
    let stats = compute_portfolio_stats(&context, &loans, &lines, &relationships);

    assert_eq!(stats.avg_utilization_bps, 9_000);
    assert_eq!(stats.risk_tier, RiskTier::High);
}

#[test]
fn test_majority_new_counterparties_escalate_risk() {
    let registry = registry();
    let account = addr(ACCOUNT);
    // Two silent counterparties, one reliable one: majority New.
    let loans = vec![
        loan(1, ACCOUNT, COUNTERPARTY, 1_000_000, 500),
        loan(2, ACCOUNT, OTHER, 1_000_000, 500),
        repaid_loan(3, ACCOUNT, "0xcccccccccccccccccccccccccccccccccccccccc", 1_000_000),
    ];

    let context = ctx(&registry, &account, T0 + 90 * DAY);
    let relationships = build_relationships(&context, &loans, &[]);
    let stats = compute_portfolio_stats(&context, &loans, &[], &relationships);

    assert_eq!(relationships.len(), 3);
    assert_eq!(stats.avg_utilization_bps, 0);
    assert_eq!(stats.risk_tier, RiskTier::Medium);
}

#[test]
fn test_payment_history_is_merged_and_ordered() {
    let registry = registry();
    let account = addr(ACCOUNT);

    let mut early = loan(1, ACCOUNT, COUNTERPARTY, 1_000_000, 500);
    early.payments.push(PaymentRecord {
        loan_id: early.id,
        at: TimeSec::new(T0 + 5 * DAY),
        principal_paid: amt(100_000),
        interest_paid: amt(500),
    });
    let mut late = loan(2, ACCOUNT, COUNTERPARTY, 1_000_000, 500);
    late.payments.push(PaymentRecord {
        loan_id: late.id,
        at: TimeSec::new(T0 + 2 * DAY),
        principal_paid: amt(200_000),
        interest_paid: amt(500),
    });

    let relationships =
        build_relationships(&ctx(&registry, &account, T0 + 6 * DAY), &[early, late], &[]);

    let history = &relationships[0].payment_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].loan_id, LoanId::new(2));
    assert_eq!(history[1].loan_id, LoanId::new(1));
}
