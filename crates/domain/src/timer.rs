//! Timer — the persisted desired run-state of one device.
//!
//! At most one timer row exists per device; a device with no row is in the
//! implicit "stopped" desired state. Only the reconciler mutates timers:
//! manual rows are deleted once their stop time has passed, and
//! `pending_auto_restart` rows are promoted back to `auto`.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::device::DeviceCode;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// How far in the future an `auto` timer's stop time is pushed.
///
/// `auto` timers have no natural expiry; the stop time is a distant sentinel
/// that still compares with ordinary timestamp arithmetic.
const UNBOUNDED_DAYS: i64 = 3650;

/// Stop time used for timers with no natural expiry (ten years out).
#[must_use]
pub fn unbounded_stop_time(now: Timestamp) -> Timestamp {
    now + Duration::days(UNBOUNDED_DAYS)
}

/// Desired run mode recorded in a timer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Operator-started run with an explicit stop time.
    Manual,
    /// Continuous automatic operation, no natural expiry.
    Auto,
    /// Stopped for a cool-down period, then resume automatic operation.
    PendingAutoRestart,
}

impl TimerMode {
    /// Storage/wire string for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
            Self::PendingAutoRestart => "pending_auto_restart",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            "pending_auto_restart" => Ok(Self::PendingAutoRestart),
            other => Err(ValidationError::UnknownTimerMode(other.to_string())),
        }
    }
}

/// Desired run-state row for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub device_code: DeviceCode,
    pub mode: TimerMode,
    pub start_time: Timestamp,
    /// Planned run length in seconds; `0` means "until explicitly changed".
    pub duration_seconds: i64,
    pub target_stop_time: Timestamp,
}

impl Timer {
    /// Manual run starting at `start` for `duration_seconds`.
    #[must_use]
    pub fn manual(device_code: DeviceCode, start: Timestamp, duration_seconds: i64) -> Self {
        Self {
            device_code,
            mode: TimerMode::Manual,
            start_time: start,
            duration_seconds,
            target_stop_time: start + Duration::seconds(duration_seconds),
        }
    }

    /// Unbounded automatic run starting at `now`.
    #[must_use]
    pub fn auto(device_code: DeviceCode, now: Timestamp) -> Self {
        Self {
            device_code,
            mode: TimerMode::Auto,
            start_time: now,
            duration_seconds: 0,
            target_stop_time: unbounded_stop_time(now),
        }
    }

    /// Cool-down row: stopped now, resume automatic operation once
    /// `cooldown_seconds` have passed.
    #[must_use]
    pub fn pending_auto_restart(
        device_code: DeviceCode,
        now: Timestamp,
        cooldown_seconds: i64,
    ) -> Self {
        Self {
            device_code,
            mode: TimerMode::PendingAutoRestart,
            start_time: now,
            duration_seconds: cooldown_seconds,
            target_stop_time: now + Duration::seconds(cooldown_seconds),
        }
    }

    /// Whether the desired run period has ended.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.target_stop_time <= now
    }

    /// The rewrite applied when a cool-down ends: same device, `auto` mode,
    /// restarted at `now`, unbounded stop time.
    #[must_use]
    pub fn promoted_to_auto(&self, now: Timestamp) -> Self {
        Self::auto(self.device_code.clone(), now)
    }

    /// Check row invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeDuration`] when `duration_seconds`
    /// is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_seconds < 0 {
            return Err(ValidationError::NegativeDuration(self.duration_seconds));
        }
        Ok(())
    }
}
