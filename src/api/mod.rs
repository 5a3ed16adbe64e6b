//! HTTP API: routing, handlers and error responses.

pub mod error;
mod providers;
mod service_areas;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::Store;

pub use error::{ApiError, ErrorResponse};

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/providers",
            get(providers::list).post(providers::create),
        )
        .route(
            "/providers/{id}",
            get(providers::retrieve)
                .put(providers::replace)
                .patch(providers::partial_update)
                .delete(providers::destroy),
        )
        .route(
            "/serviceareas",
            get(service_areas::list).post(service_areas::create),
        )
        .route(
            "/serviceareas/get_providers_in_the_area",
            get(service_areas::providers_in_the_area),
        )
        .route(
            "/serviceareas/{id}",
            get(service_areas::retrieve)
                .put(service_areas::replace)
                .patch(service_areas::partial_update)
                .delete(service_areas::destroy),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (providers, service_areas) = state.store.counts();

    Json(HealthResponse {
        status: "ok",
        providers,
        service_areas,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    providers: usize,
    service_areas: usize,
}

/// Path ids that are not unsigned integers cannot name a row.
fn parse_id(entity: &str, raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::NotFound(format!("{} {} not found", entity, raw)))
}
