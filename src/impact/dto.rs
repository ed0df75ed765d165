use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateReceiptRequest {
    pub drop_location: String,
    pub people_fed: i32,
    pub weight_per_serving: f64, // kg
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub tracking_code: String,
    pub drop_location: String,
    pub people_fed: i32,
    pub weight_per_serving: f64,
    pub total_weight_kg: f64,
    pub distance_traveled_km: f64,
    pub methane_saved_kg: f64,
    pub created_at: OffsetDateTime,
}
