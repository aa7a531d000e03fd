//! `SQLite` implementation of [`TimerRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use grainhub_app::ports::TimerRepository;
use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::HubError;
use grainhub_domain::time::Timestamp;
use grainhub_domain::timer::{Timer, TimerMode, unbounded_stop_time};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Timer`].
struct Wrapper(Timer);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_code: String = row.try_get("device_code")?;
        let mode: String = row.try_get("mode")?;
        let start_time: String = row.try_get("start_time")?;
        let duration_seconds: i64 = row.try_get("duration_seconds")?;
        let target_stop_time: String = row.try_get("target_stop_time")?;

        let device_code =
            DeviceCode::new(device_code).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let mode = TimerMode::from_str(&mode).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let start_time = parse_timestamp(&start_time)?;
        let target_stop_time = parse_timestamp(&target_stop_time)?;

        Ok(Self(Timer {
            device_code,
            mode,
            start_time,
            duration_seconds,
            target_stop_time,
        }))
    }
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

const SELECT_ALL: &str = "SELECT * FROM timers";
const UPSERT: &str = r"
    INSERT INTO timers (device_code, mode, start_time, duration_seconds, target_stop_time)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT (device_code) DO UPDATE SET
        mode = excluded.mode,
        start_time = excluded.start_time,
        duration_seconds = excluded.duration_seconds,
        target_stop_time = excluded.target_stop_time
";
const PROMOTE: &str = r"
    UPDATE timers
    SET mode = ?, start_time = ?, duration_seconds = 0, target_stop_time = ?
    WHERE device_code = ?
";

/// `SQLite`-backed timer repository.
pub struct SqliteTimerRepository {
    pool: SqlitePool,
}

impl SqliteTimerRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TimerRepository for SqliteTimerRepository {
    async fn list_active(&self) -> Result<Vec<Timer>, HubError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn insert(&self, timer: Timer) -> Result<Timer, HubError> {
        timer.validate()?;

        sqlx::query(UPSERT)
            .bind(timer.device_code.as_str())
            .bind(timer.mode.as_str())
            .bind(timer.start_time.to_rfc3339())
            .bind(timer.duration_seconds)
            .bind(timer.target_stop_time.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(timer)
    }

    async fn delete_many(&self, codes: &[DeviceCode]) -> Result<u64, HubError> {
        if codes.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; codes.len()].join(", ");
        let sql = format!("DELETE FROM timers WHERE device_code IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for code in codes {
            query = query.bind(code.as_str());
        }

        let result = query.execute(&self.pool).await.map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn promote_to_auto(&self, code: &DeviceCode, now: Timestamp) -> Result<(), HubError> {
        sqlx::query(PROMOTE)
            .bind(TimerMode::Auto.as_str())
            .bind(now.to_rfc3339())
            .bind(unbounded_stop_time(now).to_rfc3339())
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
