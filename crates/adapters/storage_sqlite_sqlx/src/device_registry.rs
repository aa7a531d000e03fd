//! `SQLite` implementation of [`DeviceRegistry`].

use sqlx::{Row, SqlitePool};

use grainhub_app::ports::DeviceRegistry;
use grainhub_domain::device::{Device, DeviceCode};
use grainhub_domain::error::HubError;

use crate::error::StorageError;

const SELECT_CODES: &str = "SELECT code FROM devices ORDER BY code";
const UPSERT: &str = r"
    INSERT INTO devices (code, label) VALUES (?, ?)
    ON CONFLICT (code) DO UPDATE SET label = excluded.label
";

/// `SQLite`-backed device registry.
pub struct SqliteDeviceRegistry {
    pool: SqlitePool,
}

impl SqliteDeviceRegistry {
    /// Create a new registry using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a device (provisioning helper, not part of the port).
    ///
    /// # Errors
    ///
    /// Returns a storage error from the underlying query.
    pub async fn register(&self, device: Device) -> Result<Device, HubError> {
        sqlx::query(UPSERT)
            .bind(device.code.as_str())
            .bind(&device.label)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(device)
    }
}

impl DeviceRegistry for SqliteDeviceRegistry {
    async fn list_codes(&self) -> Result<Vec<DeviceCode>, HubError> {
        let rows = sqlx::query(SELECT_CODES)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| {
                let code: String = row.try_get("code").map_err(StorageError::from)?;
                DeviceCode::new(code).map_err(HubError::from)
            })
            .collect()
    }
}
