//! # grainhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the storage port traits defined in `grainhub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `grainhub-app` (for port traits) and `grainhub-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

pub mod audit_log;
pub mod device_registry;
pub mod error;
pub mod pool;
pub mod timer_repo;

pub use audit_log::SqliteAuditLog;
pub use device_registry::SqliteDeviceRegistry;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use timer_repo::SqliteTimerRepository;
