use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Device;

use super::{DeviceRef, DeviceRegistry};

const DEVICE_COLUMNS: &str = "id, device_name, device_password, user_id, created_at";

#[derive(Debug, Clone)]
pub struct PgDeviceRegistry {
    pool: PgPool,
}

impl PgDeviceRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistry for PgDeviceRegistry {
    async fn resolve(&self, device: &DeviceRef) -> Result<Option<Device>> {
        let row = match device {
            DeviceRef::ById(id) => {
                sqlx::query_as::<_, Device>(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
            }
            DeviceRef::ByName(name) => {
                sqlx::query_as::<_, Device>(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE device_name = $1"
                ))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
            }
        };
        row.context("device lookup failed")
    }

    async fn find_by_credentials(
        &self,
        device_name: &str,
        secret_digest: &str,
    ) -> Result<Option<Device>> {
        sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices \
             WHERE device_name = $1 AND device_password = $2"
        ))
        .bind(device_name)
        .bind(secret_digest)
        .fetch_optional(&self.pool)
        .await
        .context("device credential lookup failed")
    }

    async fn link(&self, device_id: Uuid, user_id: Uuid) -> Result<Device> {
        sqlx::query_as::<_, Device>(&format!(
            "UPDATE devices SET user_id = $2 WHERE id = $1 RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(device_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("device link update failed")
    }

    async fn devices_for_user(&self, user_id: Uuid) -> Result<Vec<Device>> {
        sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices \
             WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("device listing failed")
    }

    async fn delete_owned(&self, device_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("device delete failed")?;
        Ok(result.rows_affected() > 0)
    }
}
