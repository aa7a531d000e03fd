//! Simulated telemetry — fabricated sensor readings injected by operators.
//!
//! These are not commands: they go out on the telemetry topic and let
//! downstream consumers be tested without real hardware. The `event: "test"`
//! tag marks them as synthetic.

use serde_json::{Value, json};

use crate::device::DeviceCode;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// What the fabricated reading should claim the sensor saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Grain present: moisture and temperature channels read `1`.
    Rice,
    /// Empty chamber: both channels read `0`.
    NoRice,
}

impl SampleKind {
    /// Parse the request `type` field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownSampleType`] for anything but
    /// `rice` or `no-rice`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "rice" => Ok(Self::Rice),
            "no-rice" => Ok(Self::NoRice),
            other => Err(ValidationError::UnknownSampleType(other.to_string())),
        }
    }

    /// The binary channel value this sample kind maps to.
    #[must_use]
    pub fn signal(self) -> u8 {
        match self {
            Self::Rice => 1,
            Self::NoRice => 0,
        }
    }
}

/// A fabricated sensor reading for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedReading {
    pub device_code: DeviceCode,
    pub sample: SampleKind,
    pub time: Timestamp,
}

impl SimulatedReading {
    /// Create a reading stamped at `time`.
    #[must_use]
    pub fn new(device_code: DeviceCode, sample: SampleKind, time: Timestamp) -> Self {
        Self {
            device_code,
            sample,
            time,
        }
    }

    /// Serialize to the telemetry wire shape.
    #[must_use]
    pub fn wire_payload(&self) -> Value {
        let signal = self.sample.signal();
        json!({
            "time": self.time.to_rfc3339(),
            "moisture_machine": signal,
            "temperature": signal,
            "device_code": self.device_code.as_str(),
            "event": "test",
        })
    }
}
