//! Storage ports — the timer store and the device registry.
//!
//! The timer store holds at most one desired-run-state row per device; the
//! registry enumerates every device code the fleet knows about. Neither
//! write is transactionally coupled to the command channel — the cycle
//! commits only after a dispatch attempt, and commands are idempotent on
//! the receiving end.

use std::future::Future;

use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::HubError;
use grainhub_domain::time::Timestamp;
use grainhub_domain::timer::Timer;

/// Repository for desired-run-state rows, keyed by device code.
pub trait TimerRepository {
    /// All current desired-state rows.
    fn list_active(&self) -> impl Future<Output = Result<Vec<Timer>, HubError>> + Send;

    /// Create or replace the row for a device. Callers outside the
    /// reconciler (operator start paths, provisioning) use this; the
    /// reconciler itself only deletes and promotes.
    fn insert(&self, timer: Timer) -> impl Future<Output = Result<Timer, HubError>> + Send;

    /// Remove the rows for the given devices, returning how many existed.
    fn delete_many(
        &self,
        codes: &[DeviceCode],
    ) -> impl Future<Output = Result<u64, HubError>> + Send;

    /// Rewrite a cool-down row to unbounded automatic operation: `mode=auto`,
    /// `start_time=now`, `duration_seconds=0`, stop time ten years out.
    fn promote_to_auto(
        &self,
        code: &DeviceCode,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Enumerable set of known device codes.
pub trait DeviceRegistry {
    /// Every device code the fleet knows about.
    fn list_codes(&self) -> impl Future<Output = Result<Vec<DeviceCode>, HubError>> + Send;
}

impl<T: TimerRepository + Send + Sync> TimerRepository for std::sync::Arc<T> {
    fn list_active(&self) -> impl Future<Output = Result<Vec<Timer>, HubError>> + Send {
        (**self).list_active()
    }

    fn insert(&self, timer: Timer) -> impl Future<Output = Result<Timer, HubError>> + Send {
        (**self).insert(timer)
    }

    fn delete_many(
        &self,
        codes: &[DeviceCode],
    ) -> impl Future<Output = Result<u64, HubError>> + Send {
        (**self).delete_many(codes)
    }

    fn promote_to_auto(
        &self,
        code: &DeviceCode,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).promote_to_auto(code, now)
    }
}

impl<T: DeviceRegistry + Send + Sync> DeviceRegistry for std::sync::Arc<T> {
    fn list_codes(&self) -> impl Future<Output = Result<Vec<DeviceCode>, HubError>> + Send {
        (**self).list_codes()
    }
}
