//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for timer bounds, command payloads, and audit records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
