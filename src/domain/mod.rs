//! Domain types and determinism layer for the lending read model.
//!
//! This module provides:
//! - Exact raw-unit amounts via the RawAmount wrapper and decimal codec
//! - Domain primitives: TimeSec, Address, TxHash, LoanId
//! - The closed LedgerEvent variant set validated at the ingestion boundary
//! - Canonical Loan / CreditLine entities with derived fields
//! - Stable event ordering key for deterministic replay

pub mod amount;
pub mod credit_line;
pub mod event;
pub mod loan;
pub mod ordering;
pub mod primitives;
pub mod token;

pub use amount::{utilization_bps, AmountError, RawAmount};
pub use credit_line::{CreditLine, CreditLineKey};
pub use event::{EventKind, EventPayload, LedgerEvent};
pub use loan::{Loan, PaymentRecord};
pub use ordering::{sort_events_deterministic, EventOrderingKey};
pub use primitives::{Address, LoanId, TimeSec, TxHash};
pub use token::{Token, TokenRegistry, TokenRegistryError};
