//! Folds ordered ledger events into canonical loan and credit-line state.

use crate::domain::{
    CreditLine, CreditLineKey, EventKind, EventOrderingKey, EventPayload, LedgerEvent, Loan,
    LoanId, PaymentRecord, RawAmount,
};
use std::collections::HashMap;
use tracing::warn;

/// Entity a fold step touches; watermarks are tracked per entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    Loan(LoanId),
    CreditLine(CreditLineKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyReason {
    /// LoanCreated for an id that already exists with a different payload.
    DuplicateEntity,
    /// Event for an entity never seen (e.g. its creation query failed).
    MissingEntity,
    /// Repayment or forgiveness exceeding the outstanding principal; the
    /// excess was clamped so the principal identity still holds.
    ExcessClamped,
    /// Event for a loan already at zero outstanding; folded as a no-op.
    ClosedLoanNoOp,
}

/// A quarantined or clamped fold step, kept for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAnomaly {
    pub position: EventOrderingKey,
    pub kind: EventKind,
    pub reason: AnomalyReason,
}

/// Outcome of folding a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// State changed (includes clamped applications and defined no-ops).
    Applied,
    /// Already folded (at or below the entity watermark, or an exact
    /// re-emission of an existing creation); skipped without effect.
    Replayed,
    /// Rejected; state untouched.
    Quarantined,
}

/// Counts from one fold pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FoldSummary {
    pub applied: usize,
    pub replayed: usize,
    pub quarantined: usize,
}

/// Owns the canonical Loan / CreditLine maps for one account session.
///
/// Idempotent under overlapping refetch: each entity tracks the highest
/// `(block_number, log_index)` already folded and only strictly greater
/// events apply. Invariant violations clamp and log; they never panic and
/// never leave `repaid + forgiven + outstanding != principal`.
#[derive(Debug, Default)]
pub struct PositionReconciler {
    loans: HashMap<LoanId, Loan>,
    credit_lines: HashMap<CreditLineKey, CreditLine>,
    watermarks: HashMap<EntityId, EventOrderingKey>,
    anomalies: Vec<FoldAnomaly>,
    highest_position: Option<EventOrderingKey>,
}

impl PositionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of events.
    ///
    /// Events must arrive in ascending `(block_number, log_index)` order —
    /// the reader guarantees it. Arrival order of the underlying network
    /// responses is irrelevant by the time events reach this point.
    pub fn fold_batch(&mut self, events: &[LedgerEvent]) -> FoldSummary {
        let mut summary = FoldSummary::default();
        for event in events {
            match self.fold(event) {
                FoldOutcome::Applied => summary.applied += 1,
                FoldOutcome::Replayed => summary.replayed += 1,
                FoldOutcome::Quarantined => summary.quarantined += 1,
            }
        }
        self.derive_utilised_credit();
        summary
    }

    /// Fold a single event into the running state.
    pub fn fold(&mut self, event: &LedgerEvent) -> FoldOutcome {
        let position = EventOrderingKey::from_event(event);
        let entity = entity_id(&event.payload);

        if let Some(watermark) = self.watermarks.get(&entity) {
            if position <= *watermark {
                return FoldOutcome::Replayed;
            }
        }

        let (outcome, advance) = self.apply(event, position);
        if advance {
            self.watermarks.insert(entity, position);
        }
        if self.highest_position.map_or(true, |h| position > h) {
            self.highest_position = Some(position);
        }
        outcome
    }

    /// Apply one event past the watermark. Returns the outcome and whether
    /// the entity watermark advances. A `MissingEntity` quarantine must not
    /// advance it: a later wider refetch that includes the creation has to be
    /// able to replay this position.
    fn apply(&mut self, event: &LedgerEvent, position: EventOrderingKey) -> (FoldOutcome, bool) {
        match &event.payload {
            EventPayload::LoanCreated {
                loan_id,
                lender,
                borrower,
                token,
                principal,
                interest_rate_bps,
                created_at,
            } => {
                if let Some(existing) = self.loans.get(loan_id) {
                    let same_origination = existing.lender == *lender
                        && existing.original_borrower == *borrower
                        && existing.token == *token
                        && existing.principal == *principal
                        && existing.interest_rate_bps == *interest_rate_bps
                        && existing.created_at == *created_at;
                    if same_origination {
                        // Same creation re-emitted (e.g. refetch across a
                        // re-org); nothing to do.
                        return (FoldOutcome::Replayed, true);
                    }
                    warn!("duplicate loan id {} with differing payload", loan_id);
                    self.note_anomaly(position, event.kind(), AnomalyReason::DuplicateEntity);
                    return (FoldOutcome::Quarantined, true);
                }
                self.loans.insert(
                    *loan_id,
                    Loan::open(
                        *loan_id,
                        lender.clone(),
                        borrower.clone(),
                        token.clone(),
                        *principal,
                        *interest_rate_bps,
                        *created_at,
                    ),
                );
                (FoldOutcome::Applied, true)
            }

            EventPayload::LoanRepaid {
                loan_id,
                principal_paid,
                interest_paid,
                paid_at,
                ..
            } => {
                let loan = match self.loans.get_mut(loan_id) {
                    Some(loan) => loan,
                    None => return self.missing_entity(position, event.kind(), *loan_id),
                };
                if loan.is_closed() {
                    self.note_anomaly(position, event.kind(), AnomalyReason::ClosedLoanNoOp);
                    return (FoldOutcome::Applied, true);
                }
                let outstanding = loan.outstanding_principal();
                let applied = (*principal_paid).min(outstanding);
                let clamped = applied < *principal_paid;
                loan.repaid_principal = loan.repaid_principal.saturating_add(applied);
                loan.accrued_interest_paid =
                    loan.accrued_interest_paid.saturating_add(*interest_paid);
                loan.last_payment_at = Some(*paid_at);
                loan.payments.push(PaymentRecord {
                    loan_id: *loan_id,
                    at: *paid_at,
                    principal_paid: applied,
                    interest_paid: *interest_paid,
                });
                if clamped {
                    warn!(
                        "repayment on loan {} exceeds outstanding principal, clamping",
                        loan_id
                    );
                    self.note_anomaly(position, event.kind(), AnomalyReason::ExcessClamped);
                }
                (FoldOutcome::Applied, true)
            }

            EventPayload::LoanForgiven {
                loan_id,
                principal_forgiven,
                ..
            } => {
                let loan = match self.loans.get_mut(loan_id) {
                    Some(loan) => loan,
                    None => return self.missing_entity(position, event.kind(), *loan_id),
                };
                if loan.is_closed() {
                    self.note_anomaly(position, event.kind(), AnomalyReason::ClosedLoanNoOp);
                    return (FoldOutcome::Applied, true);
                }
                let outstanding = loan.outstanding_principal();
                let applied = (*principal_forgiven).min(outstanding);
                let clamped = applied < *principal_forgiven;
                loan.forgiven_principal = loan.forgiven_principal.saturating_add(applied);
                if clamped {
                    warn!(
                        "forgiveness on loan {} exceeds outstanding principal, clamping",
                        loan_id
                    );
                    self.note_anomaly(position, event.kind(), AnomalyReason::ExcessClamped);
                }
                (FoldOutcome::Applied, true)
            }

            EventPayload::LoanNftTransferred { loan_id, from, to } => {
                let loan = match self.loans.get_mut(loan_id) {
                    Some(loan) => loan,
                    None => return self.missing_entity(position, event.kind(), *loan_id),
                };
                if loan.borrower != *from {
                    warn!(
                        "loan {} transfer from {} but current borrower is {}",
                        loan_id, from, loan.borrower
                    );
                }
                // Ownership moves; origination identity does not.
                loan.borrower = to.clone();
                (FoldOutcome::Applied, true)
            }

            EventPayload::CreditLineUpdated {
                lender,
                borrower,
                token,
                credit_limit,
                min_apr_bps,
                max_apr_bps,
                origination_fee_bps,
            } => {
                let key = CreditLineKey::new(lender.clone(), borrower.clone(), token.clone());
                // Full overwrite of the mutable fields; a zero limit marks the
                // line inactive but keeps the record queryable. utilised_credit
                // is re-derived after the batch.
                let utilised = self
                    .credit_lines
                    .get(&key)
                    .map(|line| line.utilised_credit)
                    .unwrap_or_else(RawAmount::zero);
                self.credit_lines.insert(
                    key,
                    CreditLine {
                        lender: lender.clone(),
                        borrower: borrower.clone(),
                        token: token.clone(),
                        credit_limit: *credit_limit,
                        utilised_credit: utilised,
                        min_apr_bps: *min_apr_bps,
                        max_apr_bps: *max_apr_bps,
                        origination_fee_bps: *origination_fee_bps,
                    },
                );
                (FoldOutcome::Applied, true)
            }
        }
    }

    fn missing_entity(
        &mut self,
        position: EventOrderingKey,
        kind: EventKind,
        loan_id: LoanId,
    ) -> (FoldOutcome, bool) {
        warn!("event for unknown loan {} quarantined", loan_id);
        self.note_anomaly(position, kind, AnomalyReason::MissingEntity);
        (FoldOutcome::Quarantined, false)
    }

    fn note_anomaly(&mut self, position: EventOrderingKey, kind: EventKind, reason: AnomalyReason) {
        let anomaly = FoldAnomaly {
            position,
            kind,
            reason,
        };
        // Refetches can revisit quarantined positions; record each once.
        if !self.anomalies.contains(&anomaly) {
            self.anomalies.push(anomaly);
        }
    }

    /// Derive utilised credit: the ledger never emits it. Each credit line's
    /// draw is the summed outstanding principal of loans originated against
    /// its (lender, borrower, token) triple — origination identity, so NFT
    /// transfers do not move a draw between lines.
    fn derive_utilised_credit(&mut self) {
        let mut draws: HashMap<CreditLineKey, RawAmount> = HashMap::new();
        for loan in self.loans.values() {
            let key = CreditLineKey::new(
                loan.lender.clone(),
                loan.original_borrower.clone(),
                loan.token.clone(),
            );
            let total = draws.entry(key).or_insert_with(RawAmount::zero);
            *total = total.saturating_add(loan.outstanding_principal());
        }
        for (key, line) in &mut self.credit_lines {
            let drawn = draws.get(key).copied().unwrap_or_else(RawAmount::zero);
            if drawn > line.credit_limit {
                warn!(
                    "credit line {}/{}/{} drawn {} beyond limit {}, clamping",
                    key.lender, key.borrower, key.token, drawn, line.credit_limit
                );
                line.utilised_credit = line.credit_limit;
            } else {
                line.utilised_credit = drawn;
            }
        }
    }

    /// Loan by id.
    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(&id)
    }

    /// Credit line by identity triple.
    pub fn credit_line(&self, key: &CreditLineKey) -> Option<&CreditLine> {
        self.credit_lines.get(key)
    }

    /// All loans, sorted by id.
    pub fn loans(&self) -> Vec<Loan> {
        let mut loans: Vec<_> = self.loans.values().cloned().collect();
        loans.sort_by_key(|l| l.id);
        loans
    }

    /// All credit lines, sorted by identity triple.
    pub fn credit_lines(&self) -> Vec<CreditLine> {
        let mut lines: Vec<_> = self.credit_lines.values().cloned().collect();
        lines.sort_by_key(|l| l.key());
        lines
    }

    pub fn anomalies(&self) -> &[FoldAnomaly] {
        &self.anomalies
    }

    /// Highest block any fold pass has seen; refresh passes narrow their
    /// fetch range to this.
    pub fn highest_block(&self) -> Option<u64> {
        self.highest_position.map(|p| p.block_number)
    }
}

fn entity_id(payload: &EventPayload) -> EntityId {
    match payload {
        EventPayload::LoanCreated { loan_id, .. }
        | EventPayload::LoanRepaid { loan_id, .. }
        | EventPayload::LoanForgiven { loan_id, .. }
        | EventPayload::LoanNftTransferred { loan_id, .. } => EntityId::Loan(*loan_id),
        EventPayload::CreditLineUpdated {
            lender,
            borrower,
            token,
            ..
        } => EntityId::CreditLine(CreditLineKey::new(
            lender.clone(),
            borrower.clone(),
            token.clone(),
        )),
    }
}
