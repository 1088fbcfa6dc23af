pub mod callback;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod schemas;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};

use crate::db::ForwardingAddressStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ForwardingAddressStore,
    pub start_time: std::time::Instant,
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/addresses", post(handlers::addresses::create_address))
        .route(
            "/addresses/unconfirmed",
            get(handlers::addresses::list_unconfirmed),
        )
        .route(
            "/addresses/by-input/:input_address",
            get(handlers::addresses::get_by_input_address),
        )
        .route("/addresses/:id", get(handlers::addresses::get_address))
        .route(
            "/addresses/:id/callback-url",
            get(handlers::addresses::callback_url),
        )
        .route(
            "/addresses/:id/complete",
            post(handlers::addresses::complete_address),
        )
        .route(
            "/addresses/:id/transmit",
            post(handlers::addresses::transmit_address),
        )
        .route(
            "/addresses/:id/confirmations",
            post(handlers::addresses::update_confirmations),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(app_state)
}
