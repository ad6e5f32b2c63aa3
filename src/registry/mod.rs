//! Device registry: identity resolution, credential matching and ownership.
//!
//! The data path consumes this through [`DeviceRegistry::resolve`]; the
//! device-management endpoints use the remaining operations.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::Device;

/// How a caller identified a device in the URL. Parsed once at the API
/// boundary and never re-derived downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRef {
    ById(Uuid),
    ByName(String),
}

impl DeviceRef {
    /// A path segment that parses as a UUID refers to a device by id;
    /// anything else is treated as a device name.
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => Self::ById(id),
            Err(_) => Self::ByName(raw.to_owned()),
        }
    }
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Look a device up by id or unique name.
    async fn resolve(&self, device: &DeviceRef) -> Result<Option<Device>>;

    /// The device whose name and stored secret digest both match, if any.
    async fn find_by_credentials(
        &self,
        device_name: &str,
        secret_digest: &str,
    ) -> Result<Option<Device>>;

    /// Record `user_id` as the device's owner and return the updated row.
    async fn link(&self, device_id: Uuid, user_id: Uuid) -> Result<Device>;

    /// All devices currently linked to `user_id`.
    async fn devices_for_user(&self, user_id: Uuid) -> Result<Vec<Device>>;

    /// Delete the device only if `user_id` owns it. Returns whether a row
    /// was removed.
    async fn delete_owned(&self, device_id: Uuid, user_id: Uuid) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_segment_parses_by_id() {
        let id = Uuid::new_v4();
        assert_eq!(DeviceRef::parse(&id.to_string()), DeviceRef::ById(id));
    }

    #[test]
    fn non_uuid_segment_parses_by_name() {
        assert_eq!(
            DeviceRef::parse("greenhouse-1"),
            DeviceRef::ByName("greenhouse-1".to_owned())
        );
    }
}
