//! Command — an outbound, fire-and-forget control message for one device.
//!
//! The closed [`Command`] union is what the services reason about; the
//! string-tagged wire shape only appears at the serialization boundary
//! ([`Command::wire_payload`]). Receivers treat repeated identical commands
//! as idempotent, so at-least-once delivery is acceptable.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::device::DeviceCode;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// Topic namespace shared by every device in the fleet.
pub const DEFAULT_NAMESPACE: &str = "c2tech";

/// Default reporting interval sent with an automatic-mode start, in seconds.
pub const DEFAULT_AUTO_INTERVAL_SECS: u32 = 300;

/// Command topic for a device: `{namespace}/{code}/cmd`.
#[must_use]
pub fn command_topic(namespace: &str, code: &DeviceCode) -> String {
    format!("{namespace}/{code}/cmd")
}

/// Telemetry topic for a device: `{namespace}/{code}/telemetry`.
#[must_use]
pub fn telemetry_topic(namespace: &str, code: &DeviceCode) -> String {
    format!("{namespace}/{code}/telemetry")
}

/// Run mode carried by start and set-mode commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Manual,
    Auto,
}

impl RunMode {
    /// Wire string for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(ValidationError::UnknownRunMode(other.to_string())),
        }
    }
}

/// Outbound control message, checked at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Drive the device to the stopped state.
    Stop,
    /// Start a manual run with calibration parameters.
    StartManual { moisture: f64, correction: f64 },
    /// Switch the device's operating mode, optionally with a reporting
    /// interval in seconds.
    SetMode {
        mode: RunMode,
        interval_secs: Option<u32>,
    },
}

impl Command {
    /// Build a manual-start command after range-checking the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MoistureOutOfRange`] unless
    /// `moisture ∈ [0, 100]`, and [`ValidationError::CorrectionOutOfRange`]
    /// unless `correction ∈ [-50, 50]`.
    pub fn start_manual(moisture: f64, correction: f64) -> Result<Self, ValidationError> {
        if !(0.0..=100.0).contains(&moisture) {
            return Err(ValidationError::MoistureOutOfRange(moisture));
        }
        if !(-50.0..=50.0).contains(&correction) {
            return Err(ValidationError::CorrectionOutOfRange(correction));
        }
        Ok(Self::StartManual {
            moisture,
            correction,
        })
    }

    /// Build a set-mode command.
    #[must_use]
    pub fn set_mode(mode: RunMode, interval_secs: Option<u32>) -> Self {
        Self::SetMode {
            mode,
            interval_secs,
        }
    }

    /// Serialize to the device wire shape, stamped with `issued_at`.
    ///
    /// The `cmd` tag strings (`stop`, `START`, `SET_MODE`) are part of the
    /// device firmware contract and must not change.
    #[must_use]
    pub fn wire_payload(&self, issued_at: Timestamp) -> Value {
        let timestamp = issued_at.to_rfc3339();
        match self {
            Self::Stop => json!({
                "cmd": "stop",
                "mode": "manual",
                "timestamp": timestamp,
            }),
            Self::StartManual {
                moisture,
                correction,
            } => json!({
                "cmd": "START",
                "mode": "manual",
                "moisture": moisture,
                "correction": correction,
                "timestamp": timestamp,
            }),
            Self::SetMode {
                mode,
                interval_secs,
            } => {
                let mut payload = json!({
                    "cmd": "SET_MODE",
                    "mode": mode.as_str(),
                    "timestamp": timestamp,
                });
                if let Some(secs) = interval_secs {
                    payload["time_interval"] = json!(secs);
                }
                payload
            }
        }
    }
}
