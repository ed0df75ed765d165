pub mod handlers;
pub mod repo;

use axum::{routing::put, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/drivers/me/location", put(handlers::update_driver_location))
}
