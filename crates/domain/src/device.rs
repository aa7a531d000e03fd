//! Device — a physical measurement unit addressed by its stable code.
//!
//! Devices have no independent lifecycle here; membership in the registry is
//! what makes a code known to the reconciler. A device the registry knows
//! about but no timer tracks is, by policy, driven to the stopped state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable identifier assigned to a device by the operator (e.g. `mm000042`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceCode(String);

impl DeviceCode {
    /// Wrap a raw code after checking it is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDeviceCode`] when the code is empty
    /// or whitespace-only.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ValidationError::EmptyDeviceCode);
        }
        Ok(Self(code))
    }

    /// Borrow the raw code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A registry row: a known device and its optional human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub code: DeviceCode,
    pub label: Option<String>,
}

impl Device {
    /// Create a device registry entry.
    #[must_use]
    pub fn new(code: DeviceCode, label: Option<String>) -> Self {
        Self { code, label }
    }
}
