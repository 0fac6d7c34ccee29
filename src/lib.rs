use std::sync::Arc;

use axum::{
    body::{Bytes, Full},
    http::{header, Response, StatusCode},
    routing::{any, get},
    Router,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

pub mod db_service;
pub mod env_utils;
pub mod route_handlers;
pub mod secret;

/// Everything the webhook handler needs, injected at construction.
pub struct AppState {
    pub webhook_secret: String,
    pub store: Arc<dyn db_service::DepositStore>,
}

pub type SharedAppState = Arc<AppState>;

/**
 * main router for the app, defines the webhook event route
 * and the healthcheck
 **/
pub fn get_main_router(state: SharedAppState) -> Router {
    tracing::debug!("initializing router(s) ...");

    Router::new()
        .route("/api/webhook", any(route_handlers::webhook::handler))
        .route("/healthcheck", get(|| async { "Ok" }))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

// last-resort catch for anything the handler itself did not turn into a
// terminal response; the client only ever sees the generic localized body
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!("Erro interno no webhook: {}", detail);

    let body = json!({ "message": "Erro interno" }).to_string();

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::from(body))
        .expect("failed to build panic response")
}
