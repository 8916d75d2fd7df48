use crate::api::{parse_account, AppState};
use crate::cache::{ViewKind, ViewSnapshot};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub balances: Vec<TokenBalanceDto>,
    pub block_height: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceDto {
    pub token: String,
    pub symbol: String,
    pub decimals: u8,
    /// Absent when the balance read failed — unavailable is not zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_balance: Option<String>,
}

pub async fn get_balances(
    Query(params): Query<BalancesQuery>,
    State(state): State<AppState>,
) -> Result<Json<BalancesResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state
        .service
        .get_view(&account, ViewKind::TokenBalances)
        .await?;

    let balances = match view.snapshot.as_ref() {
        ViewSnapshot::TokenBalances(balances) => balances,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    let balance_dtos = balances
        .iter()
        .map(|entry| TokenBalanceDto {
            token: entry.token.address.to_string(),
            symbol: entry.token.symbol.clone(),
            decimals: entry.token.decimals,
            balance: entry.balance.map(|b| b.to_string()),
            formatted_balance: entry
                .balance
                .map(|b| b.to_decimal_string(entry.token.decimals)),
        })
        .collect();

    Ok(Json(BalancesResponse {
        balances: balance_dtos,
        block_height: view.block_height,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPositionResponse {
    pub balance: String,
    pub block_height: u64,
}

pub async fn get_pool_position(
    Query(params): Query<BalancesQuery>,
    State(state): State<AppState>,
) -> Result<Json<PoolPositionResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state
        .service
        .get_view(&account, ViewKind::PoolPosition)
        .await?;

    let position = match view.snapshot.as_ref() {
        ViewSnapshot::PoolPosition(position) => position,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    Ok(Json(PoolPositionResponse {
        balance: position.balance.to_string(),
        block_height: view.block_height,
    }))
}
