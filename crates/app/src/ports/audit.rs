//! Audit port — append-only record of dispatch requests.

use std::future::Future;

use grainhub_domain::audit::AuditRecord;
use grainhub_domain::error::HubError;

/// Appends audit records. Never queried by this system.
pub trait AuditSink {
    /// Append one record.
    fn append(&self, record: AuditRecord) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: AuditSink + Send + Sync> AuditSink for std::sync::Arc<T> {
    fn append(&self, record: AuditRecord) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).append(record)
    }
}
