//! Ledger events: the closed set of state changes the contract emits.
//!
//! Raw log payloads are validated into these tagged variants at the ingestion
//! boundary; nothing loosely typed crosses into the reconciler.

use crate::domain::{Address, LoanId, RawAmount, TimeSec, TxHash};
use serde::{Deserialize, Serialize};

/// The event kinds this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    LoanCreated,
    LoanRepaid,
    LoanForgiven,
    LoanNftTransferred,
    CreditLineUpdated,
}

impl EventKind {
    /// All kinds, in the order a full refresh queries them.
    pub const ALL: [EventKind; 5] = [
        EventKind::LoanCreated,
        EventKind::LoanRepaid,
        EventKind::LoanForgiven,
        EventKind::LoanNftTransferred,
        EventKind::CreditLineUpdated,
    ];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::LoanCreated => "LoanCreated",
            EventKind::LoanRepaid => "LoanRepaid",
            EventKind::LoanForgiven => "LoanForgiven",
            EventKind::LoanNftTransferred => "LoanNFTTransferred",
            EventKind::CreditLineUpdated => "CreditLineUpdated",
        };
        write!(f, "{}", name)
    }
}

/// Decoded event payload, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    LoanCreated {
        loan_id: LoanId,
        lender: Address,
        borrower: Address,
        token: Address,
        principal: RawAmount,
        interest_rate_bps: u32,
        created_at: TimeSec,
    },
    LoanRepaid {
        loan_id: LoanId,
        lender: Address,
        borrower: Address,
        amount: RawAmount,
        principal_paid: RawAmount,
        interest_paid: RawAmount,
        paid_at: TimeSec,
    },
    LoanForgiven {
        loan_id: LoanId,
        lender: Address,
        borrower: Address,
        principal_forgiven: RawAmount,
    },
    LoanNftTransferred {
        loan_id: LoanId,
        from: Address,
        to: Address,
    },
    CreditLineUpdated {
        lender: Address,
        borrower: Address,
        token: Address,
        credit_limit: RawAmount,
        min_apr_bps: u32,
        max_apr_bps: u32,
        origination_fee_bps: u32,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::LoanCreated { .. } => EventKind::LoanCreated,
            EventPayload::LoanRepaid { .. } => EventKind::LoanRepaid,
            EventPayload::LoanForgiven { .. } => EventKind::LoanForgiven,
            EventPayload::LoanNftTransferred { .. } => EventKind::LoanNftTransferred,
            EventPayload::CreditLineUpdated { .. } => EventKind::CreditLineUpdated,
        }
    }
}

/// One ledger event at its position in the chain.
///
/// `(block_number, log_index)` is the only legitimate replay order; arrival
/// order carries no causal meaning. `(tx_hash, log_index)` dedups refetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: TxHash,
    pub payload: EventPayload,
}

impl LedgerEvent {
    pub fn new(block_number: u64, log_index: u64, tx_hash: TxHash, payload: EventPayload) -> Self {
        LedgerEvent {
            block_number,
            log_index,
            tx_hash,
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Deduplication key across overlapping fetches.
    pub fn dedup_key(&self) -> (TxHash, u64) {
        (self.tx_hash.clone(), self.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind() {
        let payload = EventPayload::LoanForgiven {
            loan_id: LoanId::new(1),
            lender: Address::new("0xaa"),
            borrower: Address::new("0xbb"),
            principal_forgiven: RawAmount::from(100u64),
        };
        assert_eq!(payload.kind(), EventKind::LoanForgiven);
    }

    #[test]
    fn test_kind_display_matches_abi_names() {
        assert_eq!(EventKind::LoanNftTransferred.to_string(), "LoanNFTTransferred");
        assert_eq!(EventKind::CreditLineUpdated.to_string(), "CreditLineUpdated");
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = LedgerEvent::new(
            10,
            2,
            TxHash::new("0xabc"),
            EventPayload::LoanNftTransferred {
                loan_id: LoanId::new(5),
                from: Address::new("0xaa"),
                to: Address::new("0xbb"),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
