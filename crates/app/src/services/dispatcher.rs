//! Dispatcher — validated on-demand command issue and telemetry simulation.
//!
//! The run/set-mode path validates before any IO, falls back to the default
//! device when no code is given (tagging the receipt as a dry-run), and
//! acknowledges optimistically: a publish failure is logged, audited, and
//! still answered with success. The simulate path is stricter — a publish
//! failure there fails the request.

use grainhub_domain::audit::{Actor, AuditRecord, DispatchMode};
use grainhub_domain::command::{Command, DEFAULT_NAMESPACE, RunMode, command_topic, telemetry_topic};
use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::HubError;
use grainhub_domain::telemetry::{SampleKind, SimulatedReading};
use grainhub_domain::time::Timestamp;

use crate::ports::{AuditSink, CommandChannel, Publication};

/// Tunables for on-demand dispatch.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Topic namespace commands are published under.
    pub namespace: String,
    /// Device addressed when a request carries no device code.
    pub default_device: DeviceCode,
}

impl DispatcherConfig {
    /// Namespace `c2tech`, default device `mm000000`.
    ///
    /// # Panics
    ///
    /// Never — the built-in default device code is non-empty.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_device: DeviceCode::new("mm000000").expect("default device code is non-empty"),
        }
    }
}

/// The operation requested on the run/set-mode path.
#[derive(Debug, Clone, PartialEq)]
pub enum RunCommandKind {
    /// Start a manual run with calibration parameters.
    RunManual { moisture: f64, correction: f64 },
    /// Switch the operating mode.
    SetMode {
        mode: RunMode,
        interval_secs: Option<u32>,
    },
}

/// A validated run/set-mode request.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub kind: RunCommandKind,
    /// Target device; `None` means dry-run against the default device.
    pub device: Option<DeviceCode>,
}

/// Acknowledgement returned by the run/set-mode path.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub mode: DispatchMode,
    pub device: DeviceCode,
    pub topic: String,
    /// Whether the transport accepted the message. The receipt is returned
    /// as a success either way.
    pub delivered: bool,
}

/// Acknowledgement returned by the simulate path.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateReceipt {
    pub device: DeviceCode,
    pub topic: String,
    pub payload: serde_json::Value,
}

/// On-demand command issuer.
pub struct Dispatcher<CC, AS> {
    channel: CC,
    audit: AS,
    config: DispatcherConfig,
}

impl<CC, AS> Dispatcher<CC, AS>
where
    CC: CommandChannel + Send + Sync,
    AS: AuditSink + Send + Sync,
{
    /// Create a dispatcher over the given ports.
    pub fn new(channel: CC, audit: AS, config: DispatcherConfig) -> Self {
        Self {
            channel,
            audit,
            config,
        }
    }

    /// Issue a run/set-mode command on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when the parameters are out of
    /// range — before any network IO. Transport failures do **not** error:
    /// the receipt reports success with `delivered = false`.
    #[tracing::instrument(skip(self, request), fields(actor = %actor.identity))]
    pub async fn run_request(
        &self,
        request: RunRequest,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<DispatchReceipt, HubError> {
        let command = match request.kind {
            RunCommandKind::RunManual {
                moisture,
                correction,
            } => Command::start_manual(moisture, correction)?,
            RunCommandKind::SetMode {
                mode,
                interval_secs,
            } => Command::set_mode(mode, interval_secs),
        };

        let (device, mode) = match request.device {
            Some(device) => (device, DispatchMode::Live),
            None => (self.config.default_device.clone(), DispatchMode::DryRun),
        };
        let topic = command_topic(&self.config.namespace, &device);

        let publication = Publication::new(topic.clone(), command.wire_payload(now));
        let delivered = match self.channel.publish_batch(vec![publication]).await {
            Ok(report) if report.is_complete() => true,
            Ok(report) => {
                tracing::warn!(
                    topic = %topic,
                    failures = report.failures.len(),
                    "publish rejected, acknowledging anyway"
                );
                false
            }
            Err(err) => {
                tracing::warn!(topic = %topic, error = %err, "publish failed, acknowledging anyway");
                false
            }
        };

        let (moisture, correction) = match command {
            Command::StartManual {
                moisture,
                correction,
            } => (Some(moisture), Some(correction)),
            Command::Stop | Command::SetMode { .. } => (None, None),
        };
        let record = AuditRecord::new(now, actor, mode, device.clone(), moisture, correction);
        if let Err(err) = self.audit.append(record).await {
            // Hardware control stays available even when the trail does not.
            tracing::warn!(error = %err, "audit append failed");
        }

        Ok(DispatchReceipt {
            mode,
            device,
            topic,
            delivered,
        })
    }

    /// Publish a fabricated sensor reading for `device`.
    ///
    /// # Errors
    ///
    /// Unlike [`run_request`](Self::run_request), a transport failure here
    /// propagates as [`HubError::Channel`].
    #[tracing::instrument(skip(self))]
    pub async fn simulate(
        &self,
        device: DeviceCode,
        sample: SampleKind,
        now: Timestamp,
    ) -> Result<SimulateReceipt, HubError> {
        let reading = SimulatedReading::new(device.clone(), sample, now);
        let topic = telemetry_topic(&self.config.namespace, &device);
        let payload = reading.wire_payload();

        let report = self
            .channel
            .publish_batch(vec![Publication::new(topic.clone(), payload.clone())])
            .await?;
        if let Some(failure) = report.failures.first() {
            return Err(HubError::Channel(failure.reason.clone().into()));
        }

        Ok(SimulateReceipt {
            device,
            topic,
            payload,
        })
    }
}
