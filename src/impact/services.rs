use uuid::Uuid;

use super::dto::{CreateReceiptRequest, ReceiptResponse};
use super::repo;
use crate::auth::Actor;
use crate::donations::lifecycle::DonationStatus;
use crate::donations::repo as donations_repo;
use crate::error::{ApiError, ApiResult};
use crate::geo::haversine_km;
use crate::state::AppState;
use crate::users;

/// Fixed emission factor: kg of methane avoided per kg of food diverted.
pub const METHANE_FACTOR: f64 = 0.05;

/// Two decimals, round half up (0.225 -> 0.23). Derived impact numbers must
/// not drift between implementations, so the rule is fixed here.
pub fn round_half_up_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn methane_saved_kg(quantity: i32, weight_per_serving: f64) -> f64 {
    round_half_up_2(quantity as f64 * weight_per_serving * METHANE_FACTOR)
}

pub async fn create_receipt(
    state: &AppState,
    actor: Actor,
    donation_id: Uuid,
    req: CreateReceiptRequest,
) -> ApiResult<ReceiptResponse> {
    users::repo::require_active(&state.db, actor.id).await?;

    if req.drop_location.trim().is_empty() {
        return Err(ApiError::validation("drop_location", "must not be empty"));
    }
    if req.people_fed < 1 {
        return Err(ApiError::validation("people_fed", "must be at least 1"));
    }
    if req.weight_per_serving < 0.001 {
        return Err(ApiError::validation(
            "weight_per_serving",
            "must be at least 0.001 kg",
        ));
    }

    let donation = donations_repo::find(&state.db, donation_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if donation.receiver_id != Some(actor.id) {
        return Err(ApiError::forbidden("not your donation"));
    }
    if donation.current_status() != DonationStatus::Delivered {
        return Err(ApiError::conflict("donation has not been delivered"));
    }

    // straight-line donor-to-receiver; unknown coordinates count as zero
    let distance_km = match (donation.donor_coords(), donation.receiver_coords()) {
        (Some(a), Some(b)) => haversine_km(a, b),
        _ => 0.0,
    };
    let methane = methane_saved_kg(donation.quantity, req.weight_per_serving);

    let receipt = match repo::insert(
        &state.db,
        donation_id,
        req.drop_location.trim(),
        req.people_fed,
        req.weight_per_serving,
        distance_km,
        methane,
    )
    .await
    {
        Ok(receipt) => receipt,
        Err(e) => {
            return Err(match ApiError::from(e) {
                ApiError::Conflict(_) => ApiError::conflict("receipt already exists"),
                other => other,
            })
        }
    };

    Ok(to_response(receipt, donation.quantity, donation.tracking_code))
}

pub async fn get_receipt(
    state: &AppState,
    actor: Actor,
    donation_id: Uuid,
) -> ApiResult<ReceiptResponse> {
    let donation = donations_repo::find(&state.db, donation_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let involved = donation.donor_id == actor.id
        || donation.receiver_id == Some(actor.id)
        || donation.driver_id == Some(actor.id)
        || actor.role == crate::auth::Role::Admin;
    if !involved {
        return Err(ApiError::forbidden("not your donation"));
    }

    let mut receipt = repo::find_by_donation(&state.db, donation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    // rows written before the field existed carry no methane value
    if receipt.methane_saved_kg <= 0.0 {
        receipt.methane_saved_kg = methane_saved_kg(donation.quantity, receipt.weight_per_serving);
    }

    Ok(to_response(receipt, donation.quantity, donation.tracking_code))
}

fn to_response(r: repo::ImpactReceipt, quantity: i32, tracking_code: String) -> ReceiptResponse {
    ReceiptResponse {
        id: r.id,
        donation_id: r.donation_id,
        tracking_code,
        drop_location: r.drop_location,
        people_fed: r.people_fed,
        weight_per_serving: r.weight_per_serving,
        total_weight_kg: quantity as f64 * r.weight_per_serving,
        distance_traveled_km: r.distance_traveled_km,
        methane_saved_kg: r.methane_saved_kg,
        created_at: r.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methane_rounds_half_up_at_midpoint() {
        // 15 servings at 0.3 kg -> 4.5 kg total -> 0.225 -> 0.23
        assert_eq!(methane_saved_kg(15, 0.3), 0.23);
    }

    #[test]
    fn methane_end_to_end_example() {
        // 10 servings at 0.4 kg -> 4.0 kg total -> 0.20
        assert_eq!(methane_saved_kg(10, 0.4), 0.20);
    }

    #[test]
    fn methane_scales_with_quantity() {
        assert_eq!(methane_saved_kg(1, 1.0), 0.05);
        assert_eq!(methane_saved_kg(100, 1.0), 5.0);
    }

    #[test]
    fn rounding_is_two_decimals_half_up() {
        assert_eq!(round_half_up_2(0.225), 0.23);
        assert_eq!(round_half_up_2(0.224), 0.22);
        assert_eq!(round_half_up_2(0.2), 0.2);
        assert_eq!(round_half_up_2(7.0), 7.0);
    }
}
