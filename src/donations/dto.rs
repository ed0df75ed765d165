use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::Donation;

#[derive(Debug, Deserialize)]
pub struct CreateDonationRequest {
    pub category: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    #[serde(default)]
    pub product_type: Option<String>,
    pub pickup_date: String, // YYYY-MM-DD
    pub pickup_from: String, // HH:MM
    pub pickup_to: String,   // HH:MM
    #[serde(default)]
    pub image_key: Option<String>,
    /// Donor-confirmed coordinates; ignored when outside the service region.
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Fallback for geocoding when coordinates are absent or rejected.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiry_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub package_expiry: Option<OffsetDateTime>,
    // advisory AI annotations from the upload pipeline
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub ai_quality: Option<String>,
    #[serde(default)]
    pub ai_freshness: Option<String>,
    #[serde(default)]
    pub ai_detected_items: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDonationRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub pickup_date: Option<String>,
    #[serde(default)]
    pub pickup_from: Option<String>,
    #[serde(default)]
    pub pickup_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// Delivery location confirmed per donation, independent of the account
    /// address. Outside the service region it is treated as absent.
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DonationResponse {
    pub id: Uuid,
    pub tracking_code: String,
    pub status: String,
    pub category: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    pub product_type: String,
    pub pickup_date: Date,
    pub pickup_from: String,
    pub pickup_to: String,
    pub expires_at: OffsetDateTime,
    pub actual_pickup_at: Option<OffsetDateTime>,
    pub receiver_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DonationResponse {
    pub fn from_donation(d: Donation, image_url: Option<String>) -> Self {
        Self {
            id: d.id,
            tracking_code: d.tracking_code,
            status: d.status,
            category: d.category,
            item_name: d.item_name,
            quantity: d.quantity,
            storage: d.storage,
            product_type: d.product_type,
            pickup_date: d.pickup_date,
            pickup_from: d.pickup_from,
            pickup_to: d.pickup_to,
            expires_at: d.expires_at,
            actual_pickup_at: d.actual_pickup_at,
            receiver_id: d.receiver_id,
            driver_id: d.driver_id,
            created_at: d.created_at,
            image_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailableDonation {
    pub id: Uuid,
    pub tracking_code: String,
    pub category: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    pub pickup_date: Date,
    pub pickup_from: String,
    pub pickup_to: String,
    pub expires_at: OffsetDateTime,
    pub donor_name: String,
    pub donor_lat: Option<f64>,
    pub donor_lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PickupOffer {
    pub id: Uuid,
    pub tracking_code: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    pub expires_at: OffsetDateTime,
    pub to_donor_km: f64,
    /// Unknown until the receiver has shared a usable delivery location.
    pub donor_to_receiver_km: Option<f64>,
    pub total_route_km: f64,
}

#[derive(Debug, Serialize)]
pub struct ActiveDelivery {
    pub id: Uuid,
    pub tracking_code: String,
    pub status: String,
    pub item_name: String,
    pub quantity: i32,
    pub expires_in: String,
    pub to_donor_km: Option<f64>,
    pub to_receiver_km: Option<f64>,
}
