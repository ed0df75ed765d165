use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::instrument;

use super::repo;
use crate::auth::{Actor, Role};
use crate::error::{ApiError, ApiResult};
use crate::geo::Coordinates;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
}

/// Out-of-band driver location update the pickup matching consumes. Drivers
/// without a location see no pickups at all.
#[instrument(skip(state))]
pub async fn update_driver_location(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<LocationUpdate>,
) -> ApiResult<StatusCode> {
    actor.require(Role::Driver)?;
    repo::require_active(&state.db, actor.id).await?;

    if !state.config.region.contains(body.lat, body.lng) {
        return Err(ApiError::validation(
            "location",
            "coordinates are outside the service region",
        ));
    }

    let updated = repo::update_driver_location(
        &state.db,
        actor.id,
        Coordinates::new(body.lat, body.lng),
    )
    .await?;
    if !updated {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
