use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateReceiptRequest, ReceiptResponse};
use super::services;
use crate::auth::{Actor, Role};
use crate::error::ApiResult;
use crate::state::AppState;

#[instrument(skip(state, body))]
pub async fn create_receipt(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateReceiptRequest>,
) -> ApiResult<(StatusCode, Json<ReceiptResponse>)> {
    actor.require(Role::Receiver)?;
    let receipt = services::create_receipt(&state, actor, id, body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[instrument(skip(state))]
pub async fn get_receipt(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReceiptResponse>> {
    let receipt = services::get_receipt(&state, actor, id).await?;
    Ok(Json(receipt))
}
