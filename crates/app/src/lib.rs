//! # grainhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TimerRepository` — desired-run-state rows
//!   - `DeviceRegistry` — the set of known device codes
//!   - `CommandChannel` — batch publish to the transport
//!   - `AuditSink` — append-only dispatch audit trail
//! - Define **driving/inbound ports** as use-case structs:
//!   - `Reconciler` — the periodic gather → plan → dispatch → commit cycle
//!   - `Dispatcher` — validated on-demand command issue and telemetry
//!     simulation
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `grainhub-domain` only. Never imports adapter crates.
//! Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
