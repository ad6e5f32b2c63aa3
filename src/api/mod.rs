pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{delete, get, post};
use axum::Router;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::auth::TokenVerifier;
use crate::registry::DeviceRegistry;
use crate::timeseries::engine::AggregationEngine;

use handlers::ApiDoc;

/// Shared per-request context: the aggregation engine over the reading
/// store, the device registry and the token verifier, all cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub engine: AggregationEngine,
    pub registry: Arc<dyn DeviceRegistry>,
    pub verifier: TokenVerifier,
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/v1/device-data/{device_id}",
            get(handlers::get_device_data),
        )
        .route(
            "/api/v1/device-data/{device_id}/analytics",
            get(handlers::get_device_analytics),
        )
        .route(
            "/api/v1/device-data/{device_id}/trends",
            get(handlers::get_device_trends),
        )
        .route(
            "/api/v1/device-data/{device_id}/batch",
            get(handlers::get_device_batch),
        )
        .route(
            "/api/v1/device-data/{device_id}/graph",
            get(handlers::get_device_graph),
        )
        .route(
            "/api/v1/device-data/{device_id}/timeseries",
            get(handlers::get_device_timeseries),
        )
        .route(
            "/api/devices",
            post(handlers::link_device).get(handlers::list_devices),
        )
        .route("/api/devices/{device_id}", delete(handlers::delete_device))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .fallback(handlers::route_not_found)
}
