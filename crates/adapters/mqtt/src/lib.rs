//! # grainhub-adapter-mqtt
//!
//! MQTT implementation of the [`CommandChannel`] port via
//! [rumqttc](https://docs.rs/rumqttc).
//!
//! ## Responsibilities
//! - Open one scoped broker connection per batch, close it on every exit path
//! - Publish every message at QoS 1 (at-least-once)
//! - Bound the broker handshake with a connect timeout; a handshake failure
//!   fails the whole batch
//! - Report per-message enqueue failures without abandoning the rest of the
//!   batch
//!
//! ## Dependency rule
//! Depends on `grainhub-app` (for the port trait) and `grainhub-domain`.

pub mod config;
pub mod error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};

use grainhub_app::ports::{CommandChannel, Publication, PublishFailure, PublishReport};
use grainhub_domain::error::HubError;

use crate::config::MqttConfig;
use crate::error::ChannelError;

/// Command channel that opens a fresh broker connection per batch.
///
/// Connections are deliberately not reused: each invocation owns its own
/// client and event loop, and dropping them tears the socket down even on
/// early error returns.
pub struct MqttCommandChannel {
    config: MqttConfig,
    sequence: AtomicU64,
}

impl MqttCommandChannel {
    /// Create a channel for the given broker.
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(0),
        }
    }

    fn options(&self) -> MqttOptions {
        let attempt = self.sequence.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("{}-{attempt}", self.config.client_id);
        let mut options = MqttOptions::new(
            client_id,
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        options
    }
}

impl CommandChannel for MqttCommandChannel {
    async fn publish_batch(&self, batch: Vec<Publication>) -> Result<PublishReport, HubError> {
        if batch.is_empty() {
            return Ok(PublishReport::default());
        }

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let (client, mut eventloop) = AsyncClient::new(self.options(), batch.len() + 1);

        // Await the broker handshake under the bounded connect timeout.
        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(err) => return Err(ChannelError::Connection(err)),
                }
            }
        };
        match tokio::time::timeout(timeout, handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(ChannelError::ConnectTimeout(self.config.connect_timeout_secs).into());
            }
        }

        let mut failures = Vec::new();
        let mut enqueued = 0_usize;
        for Publication { topic, payload } in batch {
            match client
                .publish(topic.clone(), QoS::AtLeastOnce, false, payload.to_string())
                .await
            {
                Ok(()) => enqueued += 1,
                Err(err) => {
                    tracing::warn!(topic = %topic, error = %err, "failed to enqueue publish");
                    failures.push(PublishFailure {
                        topic,
                        reason: err.to_string(),
                    });
                }
            }
        }

        // Drive the event loop until the broker has acknowledged every
        // queued message.
        let drain = async {
            let mut acked = 0_usize;
            while acked < enqueued {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::PubAck(_))) => acked += 1,
                    Ok(_) => {}
                    Err(err) => return Err(ChannelError::Connection(err)),
                }
            }
            Ok(())
        };
        match tokio::time::timeout(timeout, drain).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(ChannelError::AckTimeout(self.config.connect_timeout_secs).into());
            }
        }

        // Send DISCONNECT and flush it; the connection is closed by drop if
        // the broker never answers.
        if client.disconnect().await.is_ok() {
            let flush = async {
                loop {
                    match eventloop.poll().await {
                        Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            };
            let _ = tokio::time::timeout(timeout, flush).await;
        }

        tracing::debug!(delivered = enqueued, failed = failures.len(), "batch published");
        Ok(PublishReport {
            delivered: enqueued,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unreachable_channel() -> MqttCommandChannel {
        MqttCommandChannel::new(MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            // Nothing listens here; the connect must fail fast.
            broker_port: 1,
            connect_timeout_secs: 2,
            ..MqttConfig::default()
        })
    }

    #[tokio::test]
    async fn should_short_circuit_empty_batch_without_connecting() {
        let channel = unreachable_channel();
        let report = channel.publish_batch(vec![]).await.unwrap();
        assert_eq!(report, PublishReport::default());
    }

    #[tokio::test]
    async fn should_fail_whole_batch_when_broker_is_unreachable() {
        let channel = unreachable_channel();
        let batch = vec![Publication::new(
            "c2tech/mm000001/cmd".to_string(),
            json!({"cmd": "stop"}),
        )];

        let result = channel.publish_batch(batch).await;
        assert!(matches!(result, Err(HubError::Channel(_))));
    }

    #[tokio::test]
    async fn should_use_distinct_client_ids_per_invocation() {
        let channel = unreachable_channel();
        let first = channel.options().client_id();
        let second = channel.options().client_id();
        assert_ne!(first, second);
    }
}
