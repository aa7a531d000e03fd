//! Shared application state for axum handlers.

use std::sync::Arc;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};
use grainhub_app::services::dispatcher::Dispatcher;
use grainhub_app::services::reconciler::Reconciler;

use crate::auth::TokenVerifier;

/// Application state shared across all axum handlers.
///
/// Generic over the port implementations to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<TR, DR, CC, AS> {
    /// Periodic reconciliation service, also driven by `/check_timers`.
    pub reconciler: Arc<Reconciler<TR, DR, CC>>,
    /// On-demand command issuer.
    pub dispatcher: Arc<Dispatcher<CC, AS>>,
    /// Bearer-token verifier for the audit trail.
    pub verifier: Arc<TokenVerifier>,
}

impl<TR, DR, CC, AS> Clone for AppState<TR, DR, CC, AS> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Arc::clone(&self.reconciler),
            dispatcher: Arc::clone(&self.dispatcher),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<TR, DR, CC, AS> AppState<TR, DR, CC, AS>
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        reconciler: Reconciler<TR, DR, CC>,
        dispatcher: Dispatcher<CC, AS>,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            dispatcher: Arc::new(dispatcher),
            verifier: Arc::new(verifier),
        }
    }

    /// Create a new application state from pre-wrapped `Arc` services.
    ///
    /// Use this when services need to be shared with background tasks
    /// before constructing the HTTP state.
    pub fn from_arcs(
        reconciler: Arc<Reconciler<TR, DR, CC>>,
        dispatcher: Arc<Dispatcher<CC, AS>>,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            reconciler,
            dispatcher,
            verifier,
        }
    }
}
