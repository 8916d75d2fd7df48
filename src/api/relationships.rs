use crate::api::{parse_account, AppState};
use crate::cache::{ViewKind, ViewSnapshot};
use crate::engine::aggregator::NORMALIZED_DECIMALS;
use crate::engine::Relationship;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsResponse {
    pub relationships: Vec<RelationshipDto>,
    pub block_height: u64,
    pub degraded: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDto {
    pub address: String,
    pub trust_level: String,
    /// Normalized (18-decimal) raw units.
    pub credit_given: String,
    pub formatted_credit_given: String,
    pub credit_received: String,
    pub formatted_credit_received: String,
    pub total_loans: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_score: Option<u8>,
    pub payment_count: usize,
}

pub async fn get_relationships(
    Query(params): Query<RelationshipsQuery>,
    State(state): State<AppState>,
) -> Result<Json<RelationshipsResponse>, AppError> {
    let account = parse_account(&params.account)?;
    let view = state
        .service
        .get_view(&account, ViewKind::Relationships)
        .await?;

    let relationships = match view.snapshot.as_ref() {
        ViewSnapshot::Relationships(relationships) => relationships,
        _ => return Err(AppError::Internal("unexpected snapshot shape".into())),
    };

    Ok(Json(RelationshipsResponse {
        relationships: relationships.iter().map(to_dto).collect(),
        block_height: view.block_height,
        degraded: view.degraded.iter().map(|k| k.to_string()).collect(),
    }))
}

fn to_dto(relationship: &Relationship) -> RelationshipDto {
    RelationshipDto {
        address: relationship.address.to_string(),
        trust_level: format!("{:?}", relationship.trust_level),
        credit_given: relationship.credit_given.to_string(),
        formatted_credit_given: relationship.credit_given.to_decimal_string(NORMALIZED_DECIMALS),
        credit_received: relationship.credit_received.to_string(),
        formatted_credit_received: relationship
            .credit_received
            .to_decimal_string(NORMALIZED_DECIMALS),
        total_loans: relationship.total_loans,
        payment_score: relationship.payment_score,
        payment_count: relationship.payment_history.len(),
    }
}
