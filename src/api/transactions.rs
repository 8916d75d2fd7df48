use crate::api::{parse_account, AppState};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Confirmation notice from the external wallet/session layer. This service
/// never signs or submits; it only consumes the confirmation to invalidate
/// the affected views ahead of the next poll cycle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmedRequest {
    pub account: String,
    pub block_number: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmedResponse {
    pub invalidated: bool,
}

pub async fn transaction_confirmed(
    State(state): State<AppState>,
    Json(request): Json<TransactionConfirmedRequest>,
) -> Result<Json<TransactionConfirmedResponse>, AppError> {
    let account = parse_account(&request.account)?;
    state
        .service
        .on_transaction_confirmed(&account, request.block_number)
        .await;
    Ok(Json(TransactionConfirmedResponse { invalidated: true }))
}
