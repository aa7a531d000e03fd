//! # grainhub-domain
//!
//! Pure domain model for the grainhub device control system.
//!
//! ## Responsibilities
//! - Foundational types: device codes, error conventions, timestamps
//! - Define **Timers** (the persisted desired run-state of one device)
//! - Define **Commands** (outbound start/stop/set-mode messages) and their
//!   wire payload shapes
//! - Define **Simulated readings** (operator-injected telemetry)
//! - Define **Audit records** (who requested what action and when)
//! - Contain the reconciliation planning logic: classify the device
//!   population against the timer set and decide which commands to send
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod audit;
pub mod command;
pub mod device;
pub mod plan;
pub mod telemetry;
pub mod timer;
