//! Read-only gateway to the canonical RPC endpoint.
//!
//! Every other component reads the chain through this seam; transport
//! concerns (retry, rate limits, JSON-RPC framing) stay behind it. The
//! underlying connection is shared read-only state: any component may issue
//! reads concurrently without coordination.

use crate::domain::{Address, TxHash};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod rpc;

pub use mock::MockGateway;
pub use rpc::RpcGateway;

/// Error type for gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Network unreachable or timed out (retryable).
    #[error("transport error: {0}")]
    Transport(String),
    /// HTTP-level failure from the endpoint.
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    /// Endpoint asked us to back off.
    #[error("rate limited")]
    RateLimited,
    /// JSON-RPC error response.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Malformed response or log payload (not retryable).
    #[error("decode error: {0}")]
    Decode(String),
}

/// A log query filter: one contract, one event signature, optional indexed
/// argument filters, over a block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    /// Event signature topic (topic0), 0x-prefixed 32-byte hex.
    pub topic0: String,
    /// Positional filters for indexed arguments (topics 1..=3); None matches
    /// any value.
    pub topics: [Option<String>; 3],
    /// None means earliest — the first-load default.
    pub from_block: Option<u64>,
    pub to_block: u64,
}

impl LogFilter {
    pub fn new(address: Address, topic0: impl Into<String>, to_block: u64) -> Self {
        LogFilter {
            address,
            topic0: topic0.into(),
            topics: [None, None, None],
            from_block: None,
            to_block,
        }
    }

    /// Set an indexed-argument filter. `position` is 1-based (topic1..topic3).
    pub fn with_topic(mut self, position: usize, value: impl Into<String>) -> Self {
        self.topics[position - 1] = Some(value.into());
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }
}

/// An undecoded log as returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    /// topic0 plus up to three indexed arguments, 0x-prefixed hex words.
    pub topics: Vec<String>,
    /// Non-indexed arguments, 0x-prefixed hex, 32-byte words.
    pub data: String,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: TxHash,
}

/// Read-only chain access.
#[async_trait]
pub trait ReadGateway: Send + Sync + fmt::Debug {
    /// Latest confirmed block height.
    async fn block_number(&self) -> Result<u64, GatewayError>;

    /// Logs matching the filter, ascending by (block_number, log_index).
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, GatewayError>;

    /// Contract state read (eth_call at latest); returns the raw return bytes.
    async fn call(&self, to: &Address, calldata: Vec<u8>) -> Result<Vec<u8>, GatewayError>;
}
