use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::geo::Coordinates;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub business_name: Option<String>,
    pub role: String,
    pub is_business: bool,
    pub approval: String,
    pub address: Option<String>,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
}

impl User {
    pub fn current_location(&self) -> Option<Coordinates> {
        match (self.current_lat, self.current_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, display_name, business_name, role, is_business,
               approval, address, current_lat, current_lng
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Only approved accounts act on donations; approval gates actions, the
/// token only proves identity.
pub async fn require_active(db: &PgPool, id: Uuid) -> ApiResult<User> {
    let user = find(db, id)
        .await?
        .ok_or_else(|| ApiError::forbidden("unknown account"))?;
    if user.approval != "completed" {
        return Err(ApiError::forbidden("account is not approved"));
    }
    Ok(user)
}

pub async fn update_driver_location(
    db: &PgPool,
    driver_id: Uuid,
    coords: Coordinates,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET current_lat = $2, current_lng = $3 WHERE id = $1 AND role = 'driver'",
    )
    .bind(driver_id)
    .bind(coords.lat)
    .bind(coords.lng)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}
