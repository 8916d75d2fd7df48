pub mod balances;
pub mod credit_lines;
pub mod health;
pub mod loans;
pub mod portfolio;
pub mod relationships;
pub mod transactions;

use crate::domain::{Address, TokenRegistry};
use crate::error::AppError;
use crate::orchestration::PortfolioService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PortfolioService>,
    pub registry: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(service: Arc<PortfolioService>, registry: Arc<TokenRegistry>) -> Self {
        Self { service, registry }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/loans", get(loans::get_loans))
        .route("/v1/credit-lines", get(credit_lines::get_credit_lines))
        .route("/v1/relationships", get(relationships::get_relationships))
        .route("/v1/portfolio", get(portfolio::get_portfolio))
        .route("/v1/balances", get(balances::get_balances))
        .route("/v1/pool-position", get(balances::get_pool_position))
        .route(
            "/v1/transactions/confirmed",
            post(transactions::transaction_confirmed),
        )
        .layer(cors)
        .with_state(state)
}

/// Validate an account query parameter into an Address.
pub(crate) fn parse_account(raw: &str) -> Result<Address, AppError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(AppError::BadRequest("Invalid account address".into()));
    }
    if !trimmed[2..].bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest("Invalid account address".into()));
    }
    Ok(Address::new(trimmed))
}
