//! Credit lines between a lender and a borrower in one token.

use crate::domain::{utilization_bps, Address, RawAmount};
use serde::{Deserialize, Serialize};

/// Credit-line identity: unique per (lender, borrower, token) triple.
/// Re-issuance overwrites the existing record, it never appends.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CreditLineKey {
    pub lender: Address,
    pub borrower: Address,
    pub token: Address,
}

impl CreditLineKey {
    pub fn new(lender: Address, borrower: Address, token: Address) -> Self {
        CreditLineKey {
            lender,
            borrower,
            token,
        }
    }
}

/// A reconciled credit line.
///
/// `utilised_credit` is not emitted by the ledger; the reconciler derives it
/// from the outstanding principal of loans drawn against the triple, then
/// clamps it into `0 ..= credit_limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLine {
    pub lender: Address,
    pub borrower: Address,
    pub token: Address,
    pub credit_limit: RawAmount,
    pub utilised_credit: RawAmount,
    pub min_apr_bps: u32,
    pub max_apr_bps: u32,
    pub origination_fee_bps: u32,
}

impl CreditLine {
    pub fn key(&self) -> CreditLineKey {
        CreditLineKey::new(self.lender.clone(), self.borrower.clone(), self.token.clone())
    }

    /// A zero limit marks the line inactive; the record stays queryable.
    pub fn is_active(&self) -> bool {
        !self.credit_limit.is_zero()
    }

    pub fn available_credit(&self) -> RawAmount {
        self.credit_limit.saturating_sub(self.utilised_credit)
    }

    pub fn utilization_bps(&self) -> u32 {
        utilization_bps(self.utilised_credit, self.credit_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_line(limit: u64, utilised: u64) -> CreditLine {
        CreditLine {
            lender: Address::new("0xlender"),
            borrower: Address::new("0xborrower"),
            token: Address::new("0xtoken"),
            credit_limit: RawAmount::from(limit),
            utilised_credit: RawAmount::from(utilised),
            min_apr_bps: 300,
            max_apr_bps: 1200,
            origination_fee_bps: 50,
        }
    }

    #[test]
    fn test_available_credit() {
        let line = make_line(1_000_000, 500_000);
        assert_eq!(line.available_credit(), RawAmount::from(500_000u64));
        assert_eq!(line.utilization_bps(), 5000);
    }

    #[test]
    fn test_zero_limit_is_inactive() {
        let line = make_line(0, 0);
        assert!(!line.is_active());
        assert_eq!(line.utilization_bps(), 0);
    }

    #[test]
    fn test_key_identity() {
        let line = make_line(100, 0);
        let key = line.key();
        assert_eq!(key.lender, Address::new("0xlender"));
        assert_eq!(key.borrower, Address::new("0xborrower"));
        assert_eq!(key.token, Address::new("0xtoken"));
    }
}
