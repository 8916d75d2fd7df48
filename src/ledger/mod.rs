//! Event ledger access: ABI wire format and the deduplicating reader.

pub mod abi;
pub mod reader;

pub use abi::DecodeError;
pub use reader::{EventBatch, EventLedgerReader, KindFailure};
