use crate::api::{parse_account, AppState};
use crate::cache::{ViewKind, ViewSnapshot};
use crate::engine::aggregator::NORMALIZED_DECIMALS;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    /// Normalized (18-decimal) raw units.
    pub total_lent: String,
    pub formatted_total_lent: String,
    pub total_borrowed: String,
    pub formatted_total_borrowed: String,
    pub active_loans: u32,
    pub lent_apy_bps: u32,
    pub borrowed_apy_bps: u32,
    pub net_apy_bps: i64,
    pub avg_utilization_bps: u32,
    pub risk_tier: String,
    pub block_height: u64,
    pub degraded: Vec<String>,
}

pub async fn get_portfolio(
    Query(params): Query<PortfolioQuery>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state.service.get_view(&account, ViewKind::Portfolio).await?;

    let stats = match view.snapshot.as_ref() {
        ViewSnapshot::Portfolio(stats) => stats,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    Ok(Json(PortfolioResponse {
        total_lent: stats.total_lent.to_string(),
        formatted_total_lent: stats.total_lent.to_decimal_string(NORMALIZED_DECIMALS),
        total_borrowed: stats.total_borrowed.to_string(),
        formatted_total_borrowed: stats.total_borrowed.to_decimal_string(NORMALIZED_DECIMALS),
        active_loans: stats.active_loans,
        lent_apy_bps: stats.lent_apy_bps,
        borrowed_apy_bps: stats.borrowed_apy_bps,
        net_apy_bps: stats.net_apy_bps,
        avg_utilization_bps: stats.avg_utilization_bps,
        risk_tier: format!("{:?}", stats.risk_tier),
        block_height: view.block_height,
        degraded: view.degraded.iter().map(|k| k.to_string()).collect(),
    }))
}
