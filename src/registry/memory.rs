//! In-memory [`DeviceRegistry`] used by handler tests.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::Device;

use super::{DeviceRef, DeviceRegistry};

#[derive(Clone, Default)]
pub struct MemoryDeviceRegistry {
    devices: Arc<RwLock<Vec<Device>>>,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, device: Device) {
        self.devices.write().await.push(device);
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn resolve(&self, device: &DeviceRef) -> Result<Option<Device>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .find(|d| match device {
                DeviceRef::ById(id) => d.id == *id,
                DeviceRef::ByName(name) => d.device_name == *name,
            })
            .cloned())
    }

    async fn find_by_credentials(
        &self,
        device_name: &str,
        secret_digest: &str,
    ) -> Result<Option<Device>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .find(|d| d.device_name == device_name && d.device_password == secret_digest)
            .cloned())
    }

    async fn link(&self, device_id: Uuid, user_id: Uuid) -> Result<Device> {
        let mut devices = self.devices.write().await;
        let device = devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .context("no such device")?;
        device.user_id = Some(user_id);
        Ok(device.clone())
    }

    async fn devices_for_user(&self, user_id: Uuid) -> Result<Vec<Device>> {
        let devices = self.devices.read().await;
        let mut owned: Vec<Device> = devices
            .iter()
            .filter(|d| d.user_id == Some(user_id))
            .cloned()
            .collect();
        owned.sort_by_key(|d| d.created_at);
        Ok(owned)
    }

    async fn delete_owned(&self, device_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut devices = self.devices.write().await;
        let before = devices.len();
        devices.retain(|d| !(d.id == device_id && d.user_id == Some(user_id)));
        Ok(devices.len() < before)
    }
}
