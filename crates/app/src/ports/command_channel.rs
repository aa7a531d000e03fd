//! Command channel port — batch publish over the device transport.
//!
//! One call owns one scoped connection: open, publish everything at
//! at-least-once quality, close on every exit path. Delivery is
//! fire-and-forget; no device acks are consumed.

use std::future::Future;

use serde_json::Value;

use grainhub_domain::error::HubError;

/// One topic/payload pair queued for publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub payload: Value,
}

impl Publication {
    /// Pair a topic with its payload.
    #[must_use]
    pub fn new(topic: String, payload: Value) -> Self {
        Self { topic, payload }
    }
}

/// A message that could not be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub topic: String,
    pub reason: String,
}

/// Outcome of one batch publish.
///
/// The channel is best-effort past the connection: a per-message failure is
/// recorded here and the remaining messages are still attempted. Only a
/// connection-level failure turns the whole call into an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Messages the transport accepted.
    pub delivered: usize,
    /// Messages the transport rejected.
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    /// Whether every message in the batch was accepted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publishes batches of messages to the device transport.
pub trait CommandChannel {
    /// Open one connection, publish every message, close the connection.
    ///
    /// An empty batch must complete without touching the transport.
    fn publish_batch(
        &self,
        batch: Vec<Publication>,
    ) -> impl Future<Output = Result<PublishReport, HubError>> + Send;
}

impl<T: CommandChannel + Send + Sync> CommandChannel for std::sync::Arc<T> {
    fn publish_batch(
        &self,
        batch: Vec<Publication>,
    ) -> impl Future<Output = Result<PublishReport, HubError>> + Send {
        (**self).publish_batch(batch)
    }
}
