//! Wire DTOs. Field names are camelCase to match the JSON contract the
//! existing clients were built against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::{Device, Reading};
use crate::timeseries::engine::{GraphPoint, TrendPoint, WindowSummary};
use crate::timeseries::window::{DurationToken, TimeWindow};

/// Expanded device reference attached to every raw reading.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDeviceDto {
    pub id: Uuid,
    pub device_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    pub latitude: f64,
    pub longitude: f64,
}

/// One raw reading as served by the history endpoint. Absent measurements
/// are omitted from the JSON rather than rendered as null.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub id: Uuid,
    pub device: ReadingDeviceDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationDto>,
    pub created_at: DateTime<Utc>,
}

impl ReadingDto {
    pub fn from_reading(r: Reading, device: &Device) -> Self {
        let location = match (r.latitude, r.longitude) {
            (Some(latitude), Some(longitude)) => Some(LocationDto {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            device: ReadingDeviceDto {
                id: device.id,
                device_name: device.device_name.clone(),
            },
            temperature: r.temperature,
            humidity: r.humidity,
            location,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendPointDto {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<TrendPoint> for TrendPointDto {
    fn from(p: TrendPoint) -> Self {
        Self {
            temperature: p.temperature,
            humidity: p.humidity,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphPointDto {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<GraphPoint> for GraphPointDto {
    fn from(p: GraphPoint) -> Self {
        Self {
            timestamp: p.timestamp,
            temperature: p.temperature,
            humidity: p.humidity,
        }
    }
}

/// Summary statistics over the resolved window, unrounded, together with
/// the window that produced them.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    /// The effective duration token after lenient parsing.
    pub duration: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sample_count: i64,
    pub avg_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
}

impl AnalyticsResponse {
    pub fn new(token: DurationToken, window: &TimeWindow, summary: WindowSummary) -> Self {
        Self {
            duration: token.as_str().to_owned(),
            start_time: window.start,
            end_time: window.end,
            sample_count: summary.sample_count,
            avg_temperature: summary.avg_temperature,
            min_temperature: summary.min_temperature,
            max_temperature: summary.max_temperature,
            avg_humidity: summary.avg_humidity,
            min_humidity: summary.min_humidity,
            max_humidity: summary.max_humidity,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkDeviceRequest {
    pub device_name: String,
    pub device_password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDeviceDto {
    pub id: Uuid,
    pub device_name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkDeviceResponse {
    pub message: String,
    pub device: LinkedDeviceDto,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummaryDto {
    pub id: Uuid,
    pub device_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceSummaryDto {
    fn from(d: Device) -> Self {
        Self {
            id: d.id,
            device_name: d.device_name,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceSummaryDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
