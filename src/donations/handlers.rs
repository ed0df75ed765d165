use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{
    ActiveDelivery, AvailableDonation, ClaimRequest, CreateDonationRequest, DonationResponse,
    PickupOffer, UpdateDonationRequest,
};
use super::repo::Donation;
use super::{matching, repo, services};
use crate::auth::{Actor, Role};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const IMAGE_URL_TTL_SECS: u64 = 600;

async fn with_image_url(state: &AppState, d: Donation) -> DonationResponse {
    let url = match &d.image_key {
        Some(key) => match state.storage.presign_get(key, IMAGE_URL_TTL_SECS).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, donation_id = %d.id, "presign failed");
                None
            }
        },
        None => None,
    };
    DonationResponse::from_donation(d, url)
}

#[instrument(skip(state, body))]
pub async fn create_donation(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateDonationRequest>,
) -> ApiResult<(StatusCode, Json<DonationResponse>)> {
    actor.require(Role::Donor)?;
    let donation = services::create_donation(&state, actor, body).await?;
    Ok((StatusCode::CREATED, Json(with_image_url(&state, donation).await)))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<DonationResponse>>> {
    actor.require(Role::Donor)?;
    let rows = repo::list_by_donor(&state.db, actor.id).await?;
    let mut out = Vec::with_capacity(rows.len());
    for d in rows {
        out.push(with_image_url(&state, d).await);
    }
    Ok(Json(out))
}

/// Detail is visible to the participants and admins only.
#[instrument(skip(state))]
pub async fn get_donation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    let donation = repo::find(&state.db, id).await?.ok_or(ApiError::NotFound)?;
    let involved = donation.donor_id == actor.id
        || donation.receiver_id == Some(actor.id)
        || donation.driver_id == Some(actor.id)
        || actor.role == Role::Admin;
    if !involved {
        return Err(ApiError::forbidden("not your donation"));
    }
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state, body))]
pub async fn update_donation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDonationRequest>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Donor)?;
    let donation = services::edit(&state, actor, id, body).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn cancel_donation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Donor)?;
    let donation = services::cancel(&state, actor, id).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn approve_donation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Admin)?;
    let donation = services::approve(&state, id).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn list_available(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<AvailableDonation>>> {
    actor.require(Role::Receiver)?;
    Ok(Json(matching::available_for_receiver(&state).await?))
}

#[instrument(skip(state, body))]
pub async fn claim_donation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<ClaimRequest>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Receiver)?;
    let donation = services::claim(&state, actor, id, body).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn list_pickups(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<PickupOffer>>> {
    actor.require(Role::Driver)?;
    Ok(Json(matching::available_pickups(&state, actor.id).await?))
}

#[instrument(skip(state))]
pub async fn accept_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Driver)?;
    let donation = services::accept_order(&state, actor, id).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn confirm_pickup(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Driver)?;
    let donation = services::confirm_pickup(&state, actor, id).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn confirm_delivery(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationResponse>> {
    actor.require(Role::Driver)?;
    let donation = services::confirm_delivery(&state, actor, id).await?;
    Ok(Json(with_image_url(&state, donation).await))
}

#[instrument(skip(state))]
pub async fn list_active_deliveries(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<ActiveDelivery>>> {
    actor.require(Role::Driver)?;
    Ok(Json(matching::active_deliveries(&state, actor.id).await?))
}
