use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::dto::{ActiveDelivery, AvailableDonation, PickupOffer};
use super::repo::{self, AvailableRow};
use crate::error::ApiResult;
use crate::geo::Coordinates;
use crate::state::AppState;
use crate::users;

/// Business donors list under their business name, everyone else under their
/// profile name (or email when the profile has none).
fn donor_display_name(row: &AvailableRow) -> String {
    if row.donor_is_business {
        if let Some(name) = &row.donor_business_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
    }
    if row.donor_display_name.trim().is_empty() {
        row.donor_email.clone()
    } else {
        row.donor_display_name.clone()
    }
}

/// Total route must stay inside the driver service radius; the boundary
/// itself is still serviceable.
pub fn within_service_radius(total_km: f64, radius_km: f64) -> bool {
    total_km <= radius_km
}

/// Route length when the receiver leg may be unknown. A claim whose receiver
/// shared no usable location is still offered on the donor leg alone rather
/// than sitting unmatchable until the expiry sweep removes it.
pub fn route_total_km(to_donor_km: f64, donor_to_receiver_km: Option<f64>) -> f64 {
    to_donor_km + donor_to_receiver_km.unwrap_or(0.0)
}

/// Hour/minute countdown string for driver views.
pub fn format_time_until(expires_at: OffsetDateTime, now: OffsetDateTime) -> String {
    let remaining = expires_at - now;
    let minutes = remaining.whole_minutes();
    if minutes <= 0 {
        return "Expired".to_string();
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Unclaimed, unexpired listings annotated with donor identity and usable
/// coordinates. Stored coordinates outside the region are repaired from the
/// donor's address and persisted back without blocking the response.
pub async fn available_for_receiver(state: &AppState) -> ApiResult<Vec<AvailableDonation>> {
    let rows = repo::available_for_receiver(&state.db).await?;
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let name = donor_display_name(&row);
        let d = row.donation;

        let coords = match d.donor_coords() {
            Some(c) if state.config.region.contains(c.lat, c.lng) => Some(c),
            _ => match &row.donor_address {
                Some(address) => {
                    let geocoded = state.geocoder.geocode(address).await;
                    if let Some(c) = geocoded {
                        let db = state.db.clone();
                        let id = d.id;
                        tokio::spawn(async move {
                            if let Err(e) = repo::persist_donor_coords(&db, id, c).await {
                                warn!(error = %e, donation_id = %id, "coord fix-up persist failed");
                            }
                        });
                    }
                    geocoded
                }
                None => None,
            },
        };

        out.push(AvailableDonation {
            id: d.id,
            tracking_code: d.tracking_code,
            category: d.category,
            item_name: d.item_name,
            quantity: d.quantity,
            storage: d.storage,
            pickup_date: d.pickup_date,
            pickup_from: d.pickup_from,
            pickup_to: d.pickup_to,
            expires_at: d.expires_at,
            donor_name: name,
            donor_lat: coords.map(|c| c.lat),
            donor_lng: coords.map(|c| c.lng),
        });
    }
    Ok(out)
}

/// Claimed-and-unaccepted donations within the driver's service radius. Two
/// legs, driver to donor and donor to receiver, road distance preferred and
/// straight-line when routing is down. A missing receiver location drops the
/// second leg instead of the whole offer. No driver location, no pickups.
pub async fn available_pickups(state: &AppState, driver_id: Uuid) -> ApiResult<Vec<PickupOffer>> {
    let driver = users::repo::require_active(&state.db, driver_id).await?;
    let Some(driver_pos) = driver.current_location() else {
        return Ok(Vec::new());
    };

    let radius_km = state.config.matching.driver_radius_km;
    let candidates = repo::open_pickups(&state.db).await?;
    let mut offers = Vec::new();

    for d in candidates {
        let Some(donor) = d.donor_coords() else {
            // can't bound a route we can't compute
            continue;
        };
        let to_donor = state.distance.distance_km(driver_pos, donor).await;
        let donor_to_receiver = match d.receiver_coords() {
            Some(receiver) => Some(state.distance.distance_km(donor, receiver).await),
            None => None,
        };
        let total = route_total_km(to_donor, donor_to_receiver);

        if !within_service_radius(total, radius_km) {
            continue;
        }
        offers.push(PickupOffer {
            id: d.id,
            tracking_code: d.tracking_code,
            item_name: d.item_name,
            quantity: d.quantity,
            storage: d.storage,
            expires_at: d.expires_at,
            to_donor_km: to_donor,
            donor_to_receiver_km: donor_to_receiver,
            total_route_km: total,
        });
    }

    offers.sort_by(|a, b| a.total_route_km.total_cmp(&b.total_route_km));
    Ok(offers)
}

pub async fn active_deliveries(state: &AppState, driver_id: Uuid) -> ApiResult<Vec<ActiveDelivery>> {
    let driver = users::repo::require_active(&state.db, driver_id).await?;
    let driver_pos = driver.current_location();

    let rows = repo::active_for_driver(&state.db, driver_id).await?;
    let now = OffsetDateTime::now_utc();
    let mut out = Vec::with_capacity(rows.len());

    for d in rows {
        let to_donor = leg(state, driver_pos, d.donor_coords()).await;
        let to_receiver = leg(state, driver_pos, d.receiver_coords()).await;
        out.push(ActiveDelivery {
            id: d.id,
            tracking_code: d.tracking_code,
            status: d.status,
            item_name: d.item_name,
            quantity: d.quantity,
            expires_in: format_time_until(d.expires_at, now),
            to_donor_km: to_donor,
            to_receiver_km: to_receiver,
        });
    }
    Ok(out)
}

async fn leg(
    state: &AppState,
    from: Option<Coordinates>,
    to: Option<Coordinates>,
) -> Option<f64> {
    match (from, to) {
        (Some(a), Some(b)) => Some(state.distance.distance_km(a, b).await),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn service_radius_boundary_is_inclusive() {
        assert!(within_service_radius(40.0, 40.0));
        assert!(within_service_radius(39.99, 40.0));
        assert!(!within_service_radius(41.0, 40.0));
        assert!(!within_service_radius(40.01, 40.0));
    }

    #[test]
    fn missing_receiver_leg_still_yields_an_offerable_route() {
        assert_eq!(route_total_km(12.5, None), 12.5);
        assert!(within_service_radius(route_total_km(38.0, None), 40.0));
    }

    #[test]
    fn known_receiver_leg_counts_toward_the_radius() {
        assert_eq!(route_total_km(12.5, Some(7.5)), 20.0);
        assert!(!within_service_radius(route_total_km(30.0, Some(11.0)), 40.0));
    }

    #[test]
    fn time_until_hours_and_minutes() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(format_time_until(now + Duration::minutes(135), now), "2h 15m");
        assert_eq!(format_time_until(now + Duration::minutes(60), now), "1h 0m");
        assert_eq!(format_time_until(now + Duration::minutes(45), now), "45m");
    }

    #[test]
    fn time_until_past_is_expired() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(format_time_until(now - Duration::minutes(1), now), "Expired");
        assert_eq!(format_time_until(now, now), "Expired");
    }
}
