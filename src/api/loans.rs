use crate::api::{parse_account, AppState};
use crate::cache::{ViewKind, ViewSnapshot};
use crate::domain::Loan;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoansQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoansResponse {
    pub loans: Vec<LoanDto>,
    pub block_height: u64,
    pub degraded: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDto {
    pub id: u64,
    pub lender: String,
    pub borrower: String,
    pub original_borrower: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub principal: String,
    pub outstanding_principal: String,
    /// Human projection; absent when the token is not registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_outstanding_principal: Option<String>,
    pub repaid_principal: String,
    pub forgiven_principal: String,
    pub accrued_interest_paid: String,
    pub interest_rate_bps: u32,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_at: Option<i64>,
    pub is_active: bool,
}

pub async fn get_loans(
    Query(params): Query<LoansQuery>,
    State(state): State<AppState>,
) -> Result<Json<LoansResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state.service.get_view(&account, ViewKind::Loans).await?;

    let loans = match view.snapshot.as_ref() {
        ViewSnapshot::Loans(loans) => loans,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    let loan_dtos = loans.iter().map(|loan| to_dto(loan, &state)).collect();

    Ok(Json(LoansResponse {
        loans: loan_dtos,
        block_height: view.block_height,
        degraded: view.degraded.iter().map(|k| k.to_string()).collect(),
    }))
}

fn to_dto(loan: &Loan, state: &AppState) -> LoanDto {
    let token = state.registry.get(&loan.token);
    LoanDto {
        id: loan.id.as_u64(),
        lender: loan.lender.to_string(),
        borrower: loan.borrower.to_string(),
        original_borrower: loan.original_borrower.to_string(),
        token: loan.token.to_string(),
        token_symbol: token.map(|t| t.symbol.clone()),
        principal: loan.principal.to_string(),
        outstanding_principal: loan.outstanding_principal().to_string(),
        formatted_outstanding_principal: token
            .map(|t| loan.outstanding_principal().to_decimal_string(t.decimals)),
        repaid_principal: loan.repaid_principal.to_string(),
        forgiven_principal: loan.forgiven_principal.to_string(),
        accrued_interest_paid: loan.accrued_interest_paid.to_string(),
        interest_rate_bps: loan.interest_rate_bps,
        created_at: loan.created_at.as_i64(),
        last_payment_at: loan.last_payment_at.map(|t| t.as_i64()),
        is_active: loan.is_active(),
    }
}
