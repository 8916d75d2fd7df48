use crate::api::{parse_account, AppState};
use crate::cache::{ViewKind, ViewSnapshot};
use crate::domain::CreditLine;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLinesQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLinesResponse {
    pub credit_lines: Vec<CreditLineDto>,
    pub block_height: u64,
    pub degraded: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLineDto {
    pub lender: String,
    pub borrower: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub credit_limit: String,
    pub utilised_credit: String,
    pub available_credit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_available_credit: Option<String>,
    pub utilization_bps: u32,
    pub min_apr_bps: u32,
    pub max_apr_bps: u32,
    pub origination_fee_bps: u32,
    pub is_active: bool,
}

pub async fn get_credit_lines(
    Query(params): Query<CreditLinesQuery>,
    State(state): State<AppState>,
) -> Result<Json<CreditLinesResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state.service.get_view(&account, ViewKind::CreditLines).await?;

    let lines = match view.snapshot.as_ref() {
        ViewSnapshot::CreditLines(lines) => lines,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    let line_dtos = lines.iter().map(|line| to_dto(line, &state)).collect();

    Ok(Json(CreditLinesResponse {
        credit_lines: line_dtos,
        block_height: view.block_height,
        degraded: view.degraded.iter().map(|k| k.to_string()).collect(),
    }))
}

fn to_dto(line: &CreditLine, state: &AppState) -> CreditLineDto {
    let token = state.registry.get(&line.token);
    CreditLineDto {
        lender: line.lender.to_string(),
        borrower: line.borrower.to_string(),
        token: line.token.to_string(),
        token_symbol: token.map(|t| t.symbol.clone()),
        credit_limit: line.credit_limit.to_string(),
        utilised_credit: line.utilised_credit.to_string(),
        available_credit: line.available_credit().to_string(),
        formatted_available_credit: token
            .map(|t| line.available_credit().to_decimal_string(t.decimals)),
        utilization_bps: line.utilization_bps(),
        min_apr_bps: line.min_apr_bps,
        max_apr_bps: line.max_apr_bps,
        origination_fee_bps: line.origination_fee_bps,
        is_active: line.is_active(),
    }
}
