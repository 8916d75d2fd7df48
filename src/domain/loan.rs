//! Canonical loan position reconstructed from ledger events.

use crate::domain::{Address, LoanId, RawAmount, TimeSec};
use serde::{Deserialize, Serialize};

/// A single repayment as folded from a `LoanRepaid` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub loan_id: LoanId,
    pub at: TimeSec,
    pub principal_paid: RawAmount,
    pub interest_paid: RawAmount,
}

/// A reconciled loan.
///
/// `repaid_principal + forgiven_principal + outstanding_principal()` always
/// equals `principal`: the fold clamps applied amounts so the identity holds
/// after every step. `original_borrower` survives NFT transfers; `borrower`
/// tracks the current claim holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub lender: Address,
    pub borrower: Address,
    pub original_borrower: Address,
    pub token: Address,
    pub principal: RawAmount,
    pub repaid_principal: RawAmount,
    pub forgiven_principal: RawAmount,
    pub accrued_interest_paid: RawAmount,
    pub interest_rate_bps: u32,
    pub created_at: TimeSec,
    pub last_payment_at: Option<TimeSec>,
    /// Payment history in fold order, feeds relationship scoring.
    pub payments: Vec<PaymentRecord>,
}

impl Loan {
    /// Open a new loan from its creation event.
    pub fn open(
        id: LoanId,
        lender: Address,
        borrower: Address,
        token: Address,
        principal: RawAmount,
        interest_rate_bps: u32,
        created_at: TimeSec,
    ) -> Self {
        Loan {
            id,
            lender,
            original_borrower: borrower.clone(),
            borrower,
            token,
            principal,
            repaid_principal: RawAmount::zero(),
            forgiven_principal: RawAmount::zero(),
            accrued_interest_paid: RawAmount::zero(),
            interest_rate_bps,
            created_at,
            last_payment_at: None,
            payments: Vec::new(),
        }
    }

    /// Principal still owed: `principal - repaid - forgiven`, never negative.
    pub fn outstanding_principal(&self) -> RawAmount {
        self.principal
            .saturating_sub(self.repaid_principal)
            .saturating_sub(self.forgiven_principal)
    }

    /// A loan is active until its outstanding principal reaches zero; zero is
    /// terminal.
    pub fn is_active(&self) -> bool {
        !self.outstanding_principal().is_zero()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_active()
    }
}
