//! Audit record — who requested which dispatch, and with what parameters.
//!
//! Append-only. Written for every run/set-mode request regardless of
//! transport outcome; never read back by this system.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::DeviceCode;
use crate::time::Timestamp;

/// Identity attached to a dispatch request.
///
/// An unverifiable or missing token degrades to [`Actor::anonymous`] rather
/// than blocking the command: hardware control stays available even when the
/// audit trail loses precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub identity: String,
    pub role: String,
}

impl Actor {
    /// The fallback identity for unauthenticated requests.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            identity: "anonymous".to_string(),
            role: "anonymous".to_string(),
        }
    }
}

/// Whether a dispatch targeted real hardware or the default test device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// No device code supplied; published to the default device for
    /// smoke-testing.
    DryRun,
    /// Addressed to a specific device.
    Live,
}

impl DispatchMode {
    /// Wire/storage string (`dry-run` or `live`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: Timestamp,
    pub actor: String,
    pub role: String,
    pub mode: DispatchMode,
    pub device_code: DeviceCode,
    pub moisture: Option<f64>,
    pub correction: Option<f64>,
}

impl AuditRecord {
    /// Build a record for a dispatch performed by `actor` at `timestamp`.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        actor: &Actor,
        mode: DispatchMode,
        device_code: DeviceCode,
        moisture: Option<f64>,
        correction: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            actor: actor.identity.clone(),
            role: actor.role.clone(),
            mode,
            device_code,
            moisture,
            correction,
        }
    }
}
