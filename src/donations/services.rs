use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{ClaimRequest, CreateDonationRequest, UpdateDonationRequest};
use super::lifecycle::{
    self, compute_expiry, DonationStatus, FoodCategory, ProductType, StorageType,
};
use super::repo::{self, Donation, DonationPatch, NewDonation};
use crate::auth::Actor;
use crate::error::{ApiError, ApiResult};
use crate::geo::Coordinates;
use crate::notify::{emit_after_commit, DonationEvent};
use crate::state::AppState;
use crate::users;

fn parse_pickup_date(s: &str) -> ApiResult<Date> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s, &format)
        .map_err(|_| ApiError::validation("pickup_date", "expected YYYY-MM-DD"))
}

fn validate_window(from: &str, to: &str) -> ApiResult<()> {
    if !lifecycle::is_valid_time_of_day(from) {
        return Err(ApiError::validation("pickup_from", "expected HH:MM"));
    }
    if !lifecycle::is_valid_time_of_day(to) {
        return Err(ApiError::validation("pickup_to", "expected HH:MM"));
    }
    Ok(())
}

/// Client coordinates are only trusted inside the service region; otherwise
/// the textual address is geocoded instead.
async fn resolve_coords(
    state: &AppState,
    lat: Option<f64>,
    lng: Option<f64>,
    address: Option<&str>,
) -> Option<Coordinates> {
    if let (Some(lat), Some(lng)) = (lat, lng) {
        if state.config.region.contains(lat, lng) {
            return Some(Coordinates::new(lat, lng));
        }
        warn!(lat, lng, "client coordinates outside service region, re-geocoding");
    }
    let address = address?;
    let coords = state.geocoder.geocode(address).await?;
    state
        .config
        .region
        .contains(coords.lat, coords.lng)
        .then_some(coords)
}

pub async fn create_donation(
    state: &AppState,
    actor: Actor,
    req: CreateDonationRequest,
) -> ApiResult<Donation> {
    let donor = users::repo::require_active(&state.db, actor.id).await?;

    if req.item_name.trim().is_empty() {
        return Err(ApiError::validation("item_name", "must not be empty"));
    }
    if req.quantity < 1 {
        return Err(ApiError::validation("quantity", "must be at least 1"));
    }
    let category = FoodCategory::parse(&req.category)
        .ok_or_else(|| ApiError::validation("category", format!("unknown category '{}'", req.category)))?;
    let storage = StorageType::parse(&req.storage)
        .ok_or_else(|| ApiError::validation("storage", "expected Hot, Cold or Dry"))?;
    let product_type = ProductType::parse(req.product_type.as_deref().unwrap_or(""))
        .ok_or_else(|| ApiError::validation("product_type", "expected cooked, packed or other"))?;
    let pickup_date = parse_pickup_date(&req.pickup_date)?;
    validate_window(&req.pickup_from, &req.pickup_to)?;

    let now = OffsetDateTime::now_utc();
    let expires_at = compute_expiry(now, product_type, req.expiry_date, req.package_expiry);

    let address = req.address.as_deref().or(donor.address.as_deref());
    let donor_coords = resolve_coords(state, req.lat, req.lng, address).await;

    let seq = repo::next_tracking_seq(&state.db, now.date()).await?;
    let tracking_code = lifecycle::tracking_code(now.date(), seq);

    let donation = repo::insert(
        &state.db,
        &NewDonation {
            tracking_code,
            donor_id: actor.id,
            category: category.as_str().to_string(),
            item_name: req.item_name.trim().to_string(),
            quantity: req.quantity,
            storage: storage.as_str().to_string(),
            product_type: product_type.as_str().to_string(),
            image_key: req.image_key,
            ai_confidence: req.ai_confidence,
            ai_quality: req.ai_quality,
            ai_freshness: req.ai_freshness,
            ai_detected_items: req.ai_detected_items,
            pickup_date,
            pickup_from: req.pickup_from,
            pickup_to: req.pickup_to,
            expires_at,
            donor_coords,
        },
    )
    .await?;

    info!(donation_id = %donation.id, tracking = %donation.tracking_code, "donation created");
    emit_after_commit(
        state.notifier.clone(),
        DonationEvent::Created,
        donation.id,
        vec![actor.id],
    );
    Ok(donation)
}

pub async fn claim(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    req: ClaimRequest,
) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    let coords = match (req.lat, req.lng) {
        (Some(lat), Some(lng)) if state.config.region.contains(lat, lng) => {
            Some(Coordinates::new(lat, lng))
        }
        _ => None,
    };

    match repo::try_claim(&state.db, id, actor.id, coords).await? {
        Some(donation) => {
            let mut recipients = vec![donation.donor_id, actor.id];
            recipients.dedup();
            emit_after_commit(state.notifier.clone(), DonationEvent::Claimed, donation.id, recipients);
            Ok(donation)
        }
        None => Err(claim_rejection(state, id).await),
    }
}

/// The update matched no row; read the current state to say exactly why.
async fn claim_rejection(state: &AppState, id: Uuid) -> ApiError {
    match repo::find(&state.db, id).await {
        Ok(None) => ApiError::NotFound,
        Ok(Some(d)) if d.expires_at <= OffsetDateTime::now_utc() => ApiError::Expired,
        Ok(Some(d)) if d.receiver_id.is_some() => ApiError::conflict("already claimed"),
        Ok(Some(_)) => ApiError::conflict("donation is not available for claiming"),
        Err(e) => e.into(),
    }
}

pub async fn accept_order(state: &AppState, actor: Actor, id: Uuid) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    let accepted = repo::try_accept(&state.db, id, actor.id)
        .await
        .map_err(|e| remap_active_order_conflict(e.into()))?;
    match accepted {
        Some(donation) => {
            let recipients = participant_ids(&donation);
            emit_after_commit(
                state.notifier.clone(),
                DonationEvent::DriverAccepted,
                donation.id,
                recipients,
            );
            Ok(donation)
        }
        None => Err(accept_rejection(state, id, actor.id).await),
    }
}

/// When two accepts by the same driver race on different donations, the loser
/// hits the partial unique index on live orders instead of the in-statement
/// guard. Give that path the same wording as the guard path.
fn remap_active_order_conflict(err: ApiError) -> ApiError {
    match err {
        ApiError::Conflict(_) => ApiError::conflict("driver already has an active order"),
        other => other,
    }
}

async fn accept_rejection(state: &AppState, id: Uuid, driver_id: Uuid) -> ApiError {
    match repo::find(&state.db, id).await {
        Ok(None) => ApiError::NotFound,
        Ok(Some(d)) if d.expires_at <= OffsetDateTime::now_utc() => ApiError::Expired,
        Ok(Some(d)) if d.driver_id.is_some() => {
            ApiError::conflict("already accepted by another driver")
        }
        Ok(Some(d)) if d.current_status() != DonationStatus::Assigned => {
            ApiError::conflict("donation is not awaiting a driver")
        }
        Ok(Some(_)) => match repo::count_active_for_driver(&state.db, driver_id).await {
            Ok(n) if n >= 1 => ApiError::conflict("driver already has an active order"),
            Ok(_) => ApiError::conflict("donation is not available"),
            Err(e) => e.into(),
        },
        Err(e) => e.into(),
    }
}

pub async fn confirm_pickup(state: &AppState, actor: Actor, id: Uuid) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    let picked_up = repo::try_confirm_pickup(&state.db, id, actor.id)
        .await
        .map_err(|e| remap_active_order_conflict(e.into()))?;
    match picked_up {
        Some(donation) => {
            emit_after_commit(
                state.notifier.clone(),
                DonationEvent::PickupConfirmed,
                donation.id,
                participant_ids(&donation),
            );
            Ok(donation)
        }
        None => Err(match repo::find(&state.db, id).await {
            Ok(None) => ApiError::NotFound,
            Ok(Some(d)) if d.expires_at <= OffsetDateTime::now_utc() => ApiError::Expired,
            Ok(Some(d)) if d.driver_id.is_some() && d.driver_id != Some(actor.id) => {
                ApiError::forbidden("not your donation")
            }
            Ok(Some(_)) => ApiError::conflict("donation is not ready for pickup"),
            Err(e) => e.into(),
        }),
    }
}

pub async fn confirm_delivery(state: &AppState, actor: Actor, id: Uuid) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    match repo::try_confirm_delivery(&state.db, id, actor.id).await? {
        Some(donation) => {
            emit_after_commit(
                state.notifier.clone(),
                DonationEvent::DeliveryConfirmed,
                donation.id,
                participant_ids(&donation),
            );
            Ok(donation)
        }
        None => Err(match repo::find(&state.db, id).await {
            Ok(None) => ApiError::NotFound,
            Ok(Some(d)) if d.driver_id != Some(actor.id) => {
                ApiError::forbidden("not your donation")
            }
            Ok(Some(_)) => ApiError::conflict("donation has not been picked up"),
            Err(e) => e.into(),
        }),
    }
}

pub async fn edit(
    state: &AppState,
    actor: Actor,
    id: Uuid,
    req: UpdateDonationRequest,
) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    let mut patch = DonationPatch::default();
    if let Some(category) = &req.category {
        let parsed = FoodCategory::parse(category)
            .ok_or_else(|| ApiError::validation("category", format!("unknown category '{category}'")))?;
        patch.category = Some(parsed.as_str().to_string());
    }
    if let Some(storage) = &req.storage {
        let parsed = StorageType::parse(storage)
            .ok_or_else(|| ApiError::validation("storage", "expected Hot, Cold or Dry"))?;
        patch.storage = Some(parsed.as_str().to_string());
    }
    if let Some(quantity) = req.quantity {
        if quantity < 1 {
            return Err(ApiError::validation("quantity", "must be at least 1"));
        }
        patch.quantity = Some(quantity);
    }
    if let Some(name) = &req.item_name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("item_name", "must not be empty"));
        }
        patch.item_name = Some(name.trim().to_string());
    }
    if let Some(date) = &req.pickup_date {
        patch.pickup_date = Some(parse_pickup_date(date)?);
    }
    if let Some(from) = &req.pickup_from {
        if !lifecycle::is_valid_time_of_day(from) {
            return Err(ApiError::validation("pickup_from", "expected HH:MM"));
        }
        patch.pickup_from = Some(from.clone());
    }
    if let Some(to) = &req.pickup_to {
        if !lifecycle::is_valid_time_of_day(to) {
            return Err(ApiError::validation("pickup_to", "expected HH:MM"));
        }
        patch.pickup_to = Some(to.clone());
    }

    match repo::try_update_fields(&state.db, id, actor.id, &patch).await? {
        Some(donation) => Ok(donation),
        None => Err(modify_rejection(state, id, actor.id).await),
    }
}

pub async fn cancel(state: &AppState, actor: Actor, id: Uuid) -> ApiResult<Donation> {
    users::repo::require_active(&state.db, actor.id).await?;

    match repo::try_cancel(&state.db, id, actor.id).await? {
        Some(donation) => Ok(donation),
        None => Err(modify_rejection(state, id, actor.id).await),
    }
}

async fn modify_rejection(state: &AppState, id: Uuid, donor_id: Uuid) -> ApiError {
    match repo::find(&state.db, id).await {
        Ok(None) => ApiError::NotFound,
        Ok(Some(d)) if d.donor_id != donor_id => ApiError::forbidden("not your donation"),
        Ok(Some(d)) if d.driver_id.is_some() => {
            ApiError::conflict("a driver has already accepted this donation")
        }
        Ok(Some(_)) => ApiError::conflict("donation can no longer be changed"),
        Err(e) => e.into(),
    }
}

pub async fn approve(state: &AppState, id: Uuid) -> ApiResult<Donation> {
    match repo::try_approve(&state.db, id).await? {
        Some(donation) => Ok(donation),
        None => Err(match repo::find(&state.db, id).await {
            Ok(None) => ApiError::NotFound,
            Ok(Some(_)) => ApiError::conflict("donation is not pending approval"),
            Err(e) => e.into(),
        }),
    }
}

fn participant_ids(d: &Donation) -> Vec<Uuid> {
    let mut ids = vec![d.donor_id];
    ids.extend(d.receiver_id);
    ids.extend(d.driver_id);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn racing_accept_unique_violation_reads_as_active_order_conflict() {
        let err = remap_active_order_conflict(ApiError::conflict("resource already exists"));
        assert_eq!(err.to_string(), "driver already has an active order");
    }

    #[test]
    fn non_conflict_errors_pass_through_unchanged() {
        assert!(matches!(
            remap_active_order_conflict(ApiError::NotFound),
            ApiError::NotFound
        ));
        assert!(matches!(
            remap_active_order_conflict(ApiError::forbidden("not your donation")),
            ApiError::Forbidden(_)
        ));
    }
}
