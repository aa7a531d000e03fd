//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! at the port boundary. Validation problems are rejected before any IO and
//! surface as 4xx responses; storage and channel problems carry their typed
//! source error boxed.

use std::fmt;

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Malformed or out-of-range request input. Never retried.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The command channel failed to connect or publish.
    #[error("command channel error")]
    Channel(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Input rejected before any IO was performed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The `command` field was neither `run_manual` nor `set_mode`.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Moisture must lie in `[0, 100]`.
    #[error("moisture {0} out of range 0..=100")]
    MoistureOutOfRange(f64),

    /// Correction must lie in `[-50, 50]`.
    #[error("correction {0} out of range -50..=50")]
    CorrectionOutOfRange(f64),

    /// A numeric field did not parse as a number.
    #[error("expected a number, got {0:?}")]
    NotANumber(String),

    /// Timer durations must be non-negative.
    #[error("duration {0} must be non-negative")]
    NegativeDuration(i64),

    /// The request requires a device code and none was given.
    #[error("device code is required")]
    MissingDeviceCode,

    /// Device codes must be non-empty.
    #[error("device code must not be empty")]
    EmptyDeviceCode,

    /// The requested run mode was neither `manual` nor `auto`.
    #[error("unknown run mode: {0:?}")]
    UnknownRunMode(String),

    /// The stored timer mode string is not a known variant.
    #[error("unknown timer mode: {0:?}")]
    UnknownTimerMode(String),

    /// The simulated sample type was neither `rice` nor `no-rice`.
    #[error("unknown sample type: {0:?}")]
    UnknownSampleType(String),
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct NotFoundError {
    /// Kind of record that was looked up (e.g. `"Timer"`).
    pub entity: &'static str,
    /// The identifier that missed.
    pub id: String,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} not found", self.entity, self.id)
    }
}
