use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::lifecycle::DonationStatus;
use crate::geo::Coordinates;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Donation {
    pub id: Uuid,
    pub tracking_code: String,
    pub donor_id: Uuid,
    pub category: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    pub product_type: String,
    pub image_key: Option<String>,
    pub ai_confidence: Option<f64>,
    pub ai_quality: Option<String>,
    pub ai_freshness: Option<String>,
    pub ai_detected_items: Option<serde_json::Value>,
    pub pickup_date: Date,
    pub pickup_from: String,
    pub pickup_to: String,
    pub actual_pickup_at: Option<OffsetDateTime>,
    pub expires_at: OffsetDateTime,
    pub donor_lat: Option<f64>,
    pub donor_lng: Option<f64>,
    pub receiver_lat: Option<f64>,
    pub receiver_lng: Option<f64>,
    pub receiver_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: String,
    pub created_at: OffsetDateTime,
}

impl Donation {
    pub fn current_status(&self) -> DonationStatus {
        // the column carries a CHECK constraint matching the enum
        DonationStatus::parse(&self.status).unwrap_or(DonationStatus::Cancelled)
    }

    pub fn donor_coords(&self) -> Option<Coordinates> {
        match (self.donor_lat, self.donor_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    pub fn receiver_coords(&self) -> Option<Coordinates> {
        match (self.receiver_lat, self.receiver_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

/// Donation joined with the donor profile facts the receiver view annotates.
#[derive(Debug, FromRow)]
pub struct AvailableRow {
    #[sqlx(flatten)]
    pub donation: Donation,
    pub donor_display_name: String,
    pub donor_business_name: Option<String>,
    pub donor_is_business: bool,
    pub donor_email: String,
    pub donor_address: Option<String>,
}

#[derive(Debug)]
pub struct NewDonation {
    pub tracking_code: String,
    pub donor_id: Uuid,
    pub category: String,
    pub item_name: String,
    pub quantity: i32,
    pub storage: String,
    pub product_type: String,
    pub image_key: Option<String>,
    pub ai_confidence: Option<f64>,
    pub ai_quality: Option<String>,
    pub ai_freshness: Option<String>,
    pub ai_detected_items: Option<serde_json::Value>,
    pub pickup_date: Date,
    pub pickup_from: String,
    pub pickup_to: String,
    pub expires_at: OffsetDateTime,
    pub donor_coords: Option<Coordinates>,
}

#[derive(Debug, Default)]
pub struct DonationPatch {
    pub category: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<i32>,
    pub storage: Option<String>,
    pub pickup_date: Option<Date>,
    pub pickup_from: Option<String>,
    pub pickup_to: Option<String>,
}

/// Atomic increment-and-read on the per-day counter; concurrent creations on
/// the same day get distinct, gap-free numbers.
pub async fn next_tracking_seq(db: &PgPool, date: Date) -> Result<i32, sqlx::Error> {
    let (counter,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO tracking_sequences (seq_date, counter)
        VALUES ($1, 1)
        ON CONFLICT (seq_date)
        DO UPDATE SET counter = tracking_sequences.counter + 1
        RETURNING counter
        "#,
    )
    .bind(date)
    .fetch_one(db)
    .await?;
    Ok(counter)
}

pub async fn insert(db: &PgPool, n: &NewDonation) -> Result<Donation, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        INSERT INTO donations (
            tracking_code, donor_id, category, item_name, quantity, storage,
            product_type, image_key, ai_confidence, ai_quality, ai_freshness,
            ai_detected_items, pickup_date, pickup_from, pickup_to, expires_at,
            donor_lat, donor_lng
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(&n.tracking_code)
    .bind(n.donor_id)
    .bind(&n.category)
    .bind(&n.item_name)
    .bind(n.quantity)
    .bind(&n.storage)
    .bind(&n.product_type)
    .bind(&n.image_key)
    .bind(n.ai_confidence)
    .bind(&n.ai_quality)
    .bind(&n.ai_freshness)
    .bind(&n.ai_detected_items)
    .bind(n.pickup_date)
    .bind(&n.pickup_from)
    .bind(&n.pickup_to)
    .bind(n.expires_at)
    .bind(n.donor_coords.map(|c| c.lat))
    .bind(n.donor_coords.map(|c| c.lng))
    .fetch_one(db)
    .await
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_by_donor(db: &PgPool, donor_id: Uuid) -> Result<Vec<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        "SELECT * FROM donations WHERE donor_id = $1 ORDER BY created_at DESC",
    )
    .bind(donor_id)
    .fetch_all(db)
    .await
}

/// Claim: guard lives in the filter, so two racing receivers resolve at the
/// database and exactly one sees a row back.
pub async fn try_claim(
    db: &PgPool,
    id: Uuid,
    receiver_id: Uuid,
    coords: Option<Coordinates>,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        UPDATE donations
        SET status = 'assigned',
            receiver_id = $2,
            receiver_lat = COALESCE($3, receiver_lat),
            receiver_lng = COALESCE($4, receiver_lng)
        WHERE id = $1
          AND receiver_id IS NULL
          AND status IN ('pending', 'approved')
          AND expires_at > now()
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(receiver_id)
    .bind(coords.map(|c| c.lat))
    .bind(coords.map(|c| c.lng))
    .fetch_optional(db)
    .await
}

/// Accept-order: the single-active-order rule is part of the same statement.
/// Concurrent accepts on different donations slip past the subquery snapshot;
/// the `donations_driver_active_uq` partial index catches those as a unique
/// violation.
pub async fn try_accept(
    db: &PgPool,
    id: Uuid,
    driver_id: Uuid,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        UPDATE donations
        SET driver_id = $2
        WHERE id = $1
          AND status = 'assigned'
          AND driver_id IS NULL
          AND receiver_id IS NOT NULL
          AND expires_at > now()
          AND NOT EXISTS (
              SELECT 1 FROM donations active
              WHERE active.driver_id = $2
                AND active.status IN ('assigned', 'picked_up')
          )
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(driver_id)
    .fetch_optional(db)
    .await
}

/// Confirm-pickup covers two guard branches of one transition: the normal
/// path (driver already attached and equal to the actor) and the
/// backward-compatible path that attaches the driver in the same write.
pub async fn try_confirm_pickup(
    db: &PgPool,
    id: Uuid,
    driver_id: Uuid,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        UPDATE donations
        SET status = 'picked_up',
            actual_pickup_at = now(),
            driver_id = $2
        WHERE id = $1
          AND status = 'assigned'
          AND receiver_id IS NOT NULL
          AND (driver_id IS NULL OR driver_id = $2)
          AND expires_at > now()
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(driver_id)
    .fetch_optional(db)
    .await
}

pub async fn try_confirm_delivery(
    db: &PgPool,
    id: Uuid,
    driver_id: Uuid,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        UPDATE donations
        SET status = 'delivered'
        WHERE id = $1
          AND status = 'picked_up'
          AND driver_id = $2
          AND receiver_id IS NOT NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(driver_id)
    .fetch_optional(db)
    .await
}

const DONOR_MODIFY_GUARD: &str = r#"
          AND donor_id = $2
          AND (status IN ('pending', 'approved')
               OR (status = 'assigned' AND driver_id IS NULL))
"#;

pub async fn try_update_fields(
    db: &PgPool,
    id: Uuid,
    donor_id: Uuid,
    patch: &DonationPatch,
) -> Result<Option<Donation>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE donations
        SET category    = COALESCE($3, category),
            item_name   = COALESCE($4, item_name),
            quantity    = COALESCE($5, quantity),
            storage     = COALESCE($6, storage),
            pickup_date = COALESCE($7, pickup_date),
            pickup_from = COALESCE($8, pickup_from),
            pickup_to   = COALESCE($9, pickup_to)
        WHERE id = $1 {DONOR_MODIFY_GUARD}
        RETURNING *
        "#
    );
    sqlx::query_as::<_, Donation>(&sql)
        .bind(id)
        .bind(donor_id)
        .bind(&patch.category)
        .bind(&patch.item_name)
        .bind(patch.quantity)
        .bind(&patch.storage)
        .bind(patch.pickup_date)
        .bind(&patch.pickup_from)
        .bind(&patch.pickup_to)
        .fetch_optional(db)
        .await
}

pub async fn try_cancel(
    db: &PgPool,
    id: Uuid,
    donor_id: Uuid,
) -> Result<Option<Donation>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE donations
        SET status = 'cancelled'
        WHERE id = $1 {DONOR_MODIFY_GUARD}
        RETURNING *
        "#
    );
    sqlx::query_as::<_, Donation>(&sql)
        .bind(id)
        .bind(donor_id)
        .fetch_optional(db)
        .await
}

pub async fn try_approve(db: &PgPool, id: Uuid) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        UPDATE donations
        SET status = 'approved'
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn count_active_for_driver(db: &PgPool, driver_id: Uuid) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM donations
        WHERE driver_id = $1 AND status IN ('assigned', 'picked_up')
        "#,
    )
    .bind(driver_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Fix-up persist after a read-path re-geocode; best effort.
pub async fn persist_donor_coords(
    db: &PgPool,
    id: Uuid,
    coords: Coordinates,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE donations SET donor_lat = $2, donor_lng = $3 WHERE id = $1")
        .bind(id)
        .bind(coords.lat)
        .bind(coords.lng)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn available_for_receiver(db: &PgPool) -> Result<Vec<AvailableRow>, sqlx::Error> {
    sqlx::query_as::<_, AvailableRow>(
        r#"
        SELECT d.*,
               u.display_name  AS donor_display_name,
               u.business_name AS donor_business_name,
               u.is_business   AS donor_is_business,
               u.email         AS donor_email,
               u.address       AS donor_address
        FROM donations d
        JOIN users u ON u.id = d.donor_id
        WHERE d.status IN ('pending', 'approved')
          AND d.receiver_id IS NULL
          AND d.expires_at > now()
        ORDER BY d.created_at DESC
        "#,
    )
    .fetch_all(db)
    .await
}

/// Claimed-but-unaccepted donations: the pool a driver filters by distance.
pub async fn open_pickups(db: &PgPool) -> Result<Vec<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        SELECT * FROM donations
        WHERE status = 'assigned'
          AND receiver_id IS NOT NULL
          AND driver_id IS NULL
          AND expires_at > now()
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn active_for_driver(
    db: &PgPool,
    driver_id: Uuid,
) -> Result<Vec<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        SELECT * FROM donations
        WHERE driver_id = $1 AND status IN ('assigned', 'picked_up')
        ORDER BY expires_at ASC
        "#,
    )
    .bind(driver_id)
    .fetch_all(db)
    .await
}

#[derive(Debug, FromRow)]
pub struct ExpiredDonation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub image_key: Option<String>,
}

/// Hard delete of everything past expiry except delivered; idempotent, the
/// second run simply matches nothing.
pub async fn delete_expired(db: &PgPool) -> Result<Vec<ExpiredDonation>, sqlx::Error> {
    sqlx::query_as::<_, ExpiredDonation>(
        r#"
        DELETE FROM donations
        WHERE expires_at <= now() AND status <> 'delivered'
        RETURNING id, donor_id, image_key
        "#,
    )
    .fetch_all(db)
    .await
}

#[derive(Debug, FromRow)]
pub struct ExpiringDonation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub expires_at: OffsetDateTime,
}

pub async fn expiring_within(
    db: &PgPool,
    window_minutes: i64,
) -> Result<Vec<ExpiringDonation>, sqlx::Error> {
    sqlx::query_as::<_, ExpiringDonation>(
        r#"
        SELECT id, donor_id, expires_at FROM donations
        WHERE status <> 'delivered'
          AND expires_at > now()
          AND expires_at <= now() + make_interval(mins => $1::int)
        ORDER BY expires_at ASC
        "#,
    )
    .bind(window_minutes as i32)
    .fetch_all(db)
    .await
}
