pub mod dto;
pub mod handlers;
pub mod lifecycle;
pub mod matching;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/donations", post(handlers::create_donation))
        .route("/donations/mine", get(handlers::list_mine))
        .route("/donations/available", get(handlers::list_available))
        .route(
            "/donations/:id",
            get(handlers::get_donation).put(handlers::update_donation),
        )
        .route("/donations/:id/cancel", post(handlers::cancel_donation))
        .route("/donations/:id/approve", post(handlers::approve_donation))
        .route("/donations/:id/claim", post(handlers::claim_donation))
        .route("/donations/:id/accept", post(handlers::accept_order))
        .route("/donations/:id/pickup", post(handlers::confirm_pickup))
        .route("/donations/:id/deliver", post(handlers::confirm_delivery))
        .route("/pickups", get(handlers::list_pickups))
        .route("/deliveries/active", get(handlers::list_active_deliveries))
}
