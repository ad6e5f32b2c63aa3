use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered sensor unit.
///
/// `device_password` holds the SHA-256 hex digest of the shared secret the
/// physical device was provisioned with; the plaintext is only seen once, at
/// link time. `user_id` is `None` until a user claims the device.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub device_name: String,
    pub device_password: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// True when this device is currently linked to `user`.
    pub fn is_owned_by(&self, user: Uuid) -> bool {
        self.user_id == Some(user)
    }
}

/// One sensor observation. Append-only: rows are inserted by the ingestion
/// path and never updated or deleted here.
///
/// All measurement fields are optional; a device may report any subset of
/// temperature (°C), relative humidity (%) and GPS position per sample.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub device_id: Uuid,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}
