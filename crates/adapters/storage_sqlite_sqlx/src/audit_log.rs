//! `SQLite` implementation of [`AuditSink`] — append-only dispatch trail.

use sqlx::SqlitePool;

use grainhub_app::ports::AuditSink;
use grainhub_domain::audit::AuditRecord;
use grainhub_domain::error::HubError;

use crate::error::StorageError;

const INSERT: &str = r"
    INSERT INTO audit_log (ts, actor, role, mode, device_code, moisture, correction)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

/// `SQLite`-backed audit sink.
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    /// Create a new audit sink using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AuditSink for SqliteAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<(), HubError> {
        sqlx::query(INSERT)
            .bind(record.timestamp.to_rfc3339())
            .bind(&record.actor)
            .bind(&record.role)
            .bind(record.mode.as_str())
            .bind(record.device_code.as_str())
            .bind(record.moisture)
            .bind(record.correction)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
