//! # grainhub-adapter-http-axum
//!
//! HTTP adapter using [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Expose the dispatch surface: `POST /run_manual`, `POST /simulate_sensor`
//! - Expose the scheduler trigger: `POST /check_timers`
//! - Verify bearer tokens for the audit trail (degrading to `anonymous`,
//!   never blocking dispatch)
//! - Map service results to the response shapes external callers rely on
//!
//! ## Dependency rule
//! Depends on `grainhub-app` and `grainhub-domain`. The `app` and `domain`
//! crates must never reference this adapter.

pub mod api;
pub mod auth;
pub mod router;
pub mod state;
