use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ImpactReceipt {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub drop_location: String,
    pub people_fed: i32,
    pub weight_per_serving: f64,
    pub distance_traveled_km: f64,
    pub methane_saved_kg: f64,
    pub created_at: OffsetDateTime,
}

/// One receipt per donation; the unique constraint on donation_id turns a
/// lost race into a 23505 the caller reports as conflict.
pub async fn insert(
    db: &PgPool,
    donation_id: Uuid,
    drop_location: &str,
    people_fed: i32,
    weight_per_serving: f64,
    distance_traveled_km: f64,
    methane_saved_kg: f64,
) -> Result<ImpactReceipt, sqlx::Error> {
    sqlx::query_as::<_, ImpactReceipt>(
        r#"
        INSERT INTO impact_receipts (
            donation_id, drop_location, people_fed, weight_per_serving,
            distance_traveled_km, methane_saved_kg
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, donation_id, drop_location, people_fed, weight_per_serving,
                  distance_traveled_km, methane_saved_kg, created_at
        "#,
    )
    .bind(donation_id)
    .bind(drop_location)
    .bind(people_fed)
    .bind(weight_per_serving)
    .bind(distance_traveled_km)
    .bind(methane_saved_kg)
    .fetch_one(db)
    .await
}

pub async fn find_by_donation(
    db: &PgPool,
    donation_id: Uuid,
) -> Result<Option<ImpactReceipt>, sqlx::Error> {
    sqlx::query_as::<_, ImpactReceipt>(
        r#"
        SELECT id, donation_id, drop_location, people_fed, weight_per_serving,
               distance_traveled_km, methane_saved_kg, created_at
        FROM impact_receipts
        WHERE donation_id = $1
        "#,
    )
    .bind(donation_id)
    .fetch_optional(db)
    .await
}
