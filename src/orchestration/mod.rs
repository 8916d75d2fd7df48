//! Orchestrates fetching, reconciliation, aggregation, and cache publication.

pub mod refresher;

pub use refresher::{PortfolioService, ViewData, ViewError};
