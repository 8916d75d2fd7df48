pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod orchestration;

pub use cache::{SnapshotCache, ViewKind, ViewSnapshot};
pub use config::Config;
pub use domain::{
    Address, CreditLine, CreditLineKey, EventKind, EventPayload, LedgerEvent, Loan, LoanId,
    RawAmount, TimeSec, Token, TokenRegistry, TxHash,
};
pub use engine::{PortfolioStats, PositionReconciler, Relationship, RiskTier, TrustLevel};
pub use error::AppError;
pub use gateway::{GatewayError, MockGateway, ReadGateway, RpcGateway};
pub use ledger::{EventBatch, EventLedgerReader};
pub use orchestration::PortfolioService;
