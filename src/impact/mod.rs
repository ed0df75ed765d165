pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/donations/:id/receipt",
        get(handlers::get_receipt).post(handlers::create_receipt),
    )
}
