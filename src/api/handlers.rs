use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::OpenApi;

use super::dto::{
    AnalyticsResponse, DeviceSummaryDto, DevicesResponse, GraphPointDto, LinkDeviceRequest,
    LinkDeviceResponse, LinkedDeviceDto, LocationDto, MessageResponse, ReadingDeviceDto,
    ReadingDto, TrendPointDto,
};
use super::errors::ApiError;
use super::AppState;
use crate::auth::{digest_secret, CurrentUser};
use crate::db::models::Device;
use crate::registry::DeviceRef;
use crate::timeseries::engine::{EngineError, SeriesOrder, DEFAULT_GRAPH_POINTS};
use crate::timeseries::shape::{
    shape_series, ChartDatasets, ChartSeries, SeriesFormat, SeriesPoint, SeriesStatistics,
    ShapedSeries, SimpleSeries,
};
use crate::timeseries::window::{DurationToken, TimeWindow};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DurationParams {
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GraphParams {
    pub duration: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesParams {
    pub limit: Option<i64>,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the path segment to a device, by id when it parses as a UUID and
/// by name otherwise. An unknown device reads the same as a device without
/// data, so callers cannot probe for device existence.
async fn resolve_device(state: &AppState, raw: &str) -> Result<Device, ApiError> {
    state
        .registry
        .resolve(&DeviceRef::parse(raw))
        .await?
        .ok_or_else(|| ApiError::NotFound("No data found for this device".to_owned()))
}

fn no_data_in_range(e: EngineError) -> ApiError {
    match e {
        EngineError::NoData => ApiError::NotFound(
            "No data found for this device in the selected time range".to_owned(),
        ),
        other => other.into(),
    }
}

// ---------------------------------------------------------------------------
// Device data
// ---------------------------------------------------------------------------

/// Full reading history for a device, newest first, with the device
/// reference expanded to its display name.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
    ),
    responses(
        (status = 200, description = "All readings for the device, newest first", body = Vec<ReadingDto>),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No data found for this device", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_data(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    let device = resolve_device(&state, &device_id).await?;
    let readings = state.engine.raw_history(device.id).await?;
    Ok(Json(
        readings
            .into_iter()
            .map(|r| ReadingDto::from_reading(r, &device))
            .collect(),
    ))
}

/// Avg/min/max temperature and humidity over a recent window. An
/// unrecognised `duration` silently falls back to 24h.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}/analytics",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
        ("duration" = Option<String>, Query, description = "Window width: 1h, 24h or 7d (default 24h)"),
    ),
    responses(
        (status = 200, description = "Summary statistics over the window", body = AnalyticsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No readings inside the window", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_analytics(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
    Query(params): Query<DurationParams>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let device = resolve_device(&state, &device_id).await?;
    let token = DurationToken::parse_lenient(params.duration.as_deref());
    let window = TimeWindow::ending_now(token);

    let summary = state
        .engine
        .window_summary(device.id, &window)
        .await
        .map_err(no_data_in_range)?;
    Ok(Json(AnalyticsResponse::new(token, &window, summary)))
}

/// The most recent readings in chronological order, reduced to
/// temperature/humidity trend points.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}/trends",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
        ("limit" = Option<i64>, Query, description = "Number of most recent samples (default 24)"),
    ),
    responses(
        (status = 200, description = "Trend points, oldest first", body = Vec<TrendPointDto>),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No data found for this device", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_trends(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TrendPointDto>>, ApiError> {
    let device = resolve_device(&state, &device_id).await?;
    let series = state
        .engine
        .recent_series(device.id, params.limit, SeriesOrder::Chronological)
        .await?;
    Ok(Json(series.into_iter().map(Into::into).collect()))
}

/// Same samples as `/trends` but in store order, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}/batch",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
        ("limit" = Option<i64>, Query, description = "Number of most recent samples (default 24)"),
    ),
    responses(
        (status = 200, description = "Trend points, newest first", body = Vec<TrendPointDto>),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No data found for this device", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_batch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TrendPointDto>>, ApiError> {
    let device = resolve_device(&state, &device_id).await?;
    let series = state
        .engine
        .recent_series(device.id, params.limit, SeriesOrder::NewestFirst)
        .await?;
    Ok(Json(series.into_iter().map(Into::into).collect()))
}

/// Bucketed averages spanning the window, one point per nonempty bucket.
/// Unlike `/analytics`, the duration here is validated strictly and an
/// unknown token is rejected before the store is consulted.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}/graph",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
        ("duration" = Option<String>, Query, description = "Window width: 1h, 24h, 7d or 30d (default 24h)"),
        ("points" = Option<i64>, Query, description = "Target bucket count (default 24)"),
    ),
    responses(
        (status = 200, description = "Averaged buckets, ascending by timestamp", body = Vec<GraphPointDto>),
        (status = 400, description = "Invalid duration", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No readings inside the window", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_graph(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
    Query(params): Query<GraphParams>,
) -> Result<Json<Vec<GraphPointDto>>, ApiError> {
    // Strict validation happens before any lookup.
    let token = match params.duration.as_deref() {
        None => DurationToken::OneDay,
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::timeseries::window::UnknownDuration| {
                ApiError::Validation(e.to_string())
            })?,
    };

    let device = resolve_device(&state, &device_id).await?;
    let window = TimeWindow::ending_now(token);
    let points = params.points.unwrap_or(DEFAULT_GRAPH_POINTS);

    let series = state
        .engine
        .graph_series(device.id, &window, points)
        .await
        .map_err(no_data_in_range)?;
    Ok(Json(series.into_iter().map(Into::into).collect()))
}

/// The most recent readings shaped for display: tabular by default, or
/// chart-ready parallel arrays with `format=chart`. Both carry statistics
/// derived from the rounded series.
#[utoipa::path(
    get,
    path = "/api/v1/device-data/{device_id}/timeseries",
    params(
        ("device_id" = String, Path, description = "Device UUID or unique device name"),
        ("limit" = Option<i64>, Query, description = "Number of most recent samples (default 24)"),
        ("format" = Option<String>, Query, description = "Output encoding: simple (default) or chart"),
    ),
    responses(
        (status = 200, description = "Shaped series with statistics", body = ShapedSeries),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "No data found for this device", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-data"
)]
pub async fn get_device_timeseries(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(device_id): Path<String>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<ShapedSeries>, ApiError> {
    let device = resolve_device(&state, &device_id).await?;
    let format = SeriesFormat::parse_lenient(params.format.as_deref());
    let series = state
        .engine
        .recent_series(device.id, params.limit, SeriesOrder::Chronological)
        .await?;
    Ok(Json(shape_series(&series, format)))
}

// ---------------------------------------------------------------------------
// Device management
// ---------------------------------------------------------------------------

/// Claim a device by presenting its provisioning credentials. Linking is
/// exclusive: a device already owned by any user cannot be claimed again.
#[utoipa::path(
    post,
    path = "/api/devices",
    request_body = LinkDeviceRequest,
    responses(
        (status = 200, description = "Device linked to the current user", body = LinkDeviceResponse),
        (status = 400, description = "Device already linked", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "Unknown device or wrong credentials", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn link_device(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<LinkDeviceRequest>,
) -> Result<Json<LinkDeviceResponse>, ApiError> {
    let digest = digest_secret(&req.device_password);
    let device = state
        .registry
        .find_by_credentials(&req.device_name, &digest)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Device not found or incorrect credentials".to_owned())
        })?;

    if device.user_id.is_some() {
        return Err(ApiError::Validation(
            "Device is already registered to another user".to_owned(),
        ));
    }

    let device = state.registry.link(device.id, user.0).await?;
    Ok(Json(LinkDeviceResponse {
        message: "Device linked successfully".to_owned(),
        device: LinkedDeviceDto {
            id: device.id,
            device_name: device.device_name,
        },
    }))
}

/// All devices linked to the current user.
#[utoipa::path(
    get,
    path = "/api/devices",
    responses(
        (status = 200, description = "Devices owned by the current user", body = DevicesResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DevicesResponse>, ApiError> {
    let devices = state.registry.devices_for_user(user.0).await?;
    Ok(Json(DevicesResponse {
        devices: devices.into_iter().map(DeviceSummaryDto::from).collect(),
    }))
}

/// Unlink and delete a device. Only the owner may delete; anything else
/// reads as not found.
#[utoipa::path(
    delete,
    path = "/api/devices/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device UUID"),
    ),
    responses(
        (status = 200, description = "Device deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "Device not found or not owned", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn delete_device(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(device_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let not_found = || ApiError::NotFound("Device not found or unauthorized".to_owned());

    let device_id = uuid::Uuid::parse_str(&device_id).map_err(|_| not_found())?;
    if !state.registry.delete_owned(device_id, user.0).await? {
        return Err(not_found());
    }
    Ok(Json(MessageResponse {
        message: "Device deleted successfully".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"healthy"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// JSON 404 for anything outside the routing table.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_owned())
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_device_data,
        get_device_analytics,
        get_device_trends,
        get_device_batch,
        get_device_graph,
        get_device_timeseries,
        link_device,
        list_devices,
        delete_device,
        health,
    ),
    components(schemas(
        ReadingDto,
        ReadingDeviceDto,
        LocationDto,
        TrendPointDto,
        GraphPointDto,
        AnalyticsResponse,
        ShapedSeries,
        SimpleSeries,
        ChartSeries,
        ChartDatasets,
        SeriesPoint,
        SeriesStatistics,
        LinkDeviceRequest,
        LinkDeviceResponse,
        LinkedDeviceDto,
        DeviceSummaryDto,
        DevicesResponse,
        MessageResponse,
    )),
    tags(
        (name = "device-data", description = "Time-series queries over sensor readings"),
        (name = "devices", description = "Device linking and management"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "IoT Telemetry API",
        version = "0.1.0",
        description = "REST API for device-linked sensor telemetry"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
