//! Reconciler — the periodic gather → plan → dispatch → commit cycle.
//!
//! Each cycle reads a snapshot of the timer store and the device registry,
//! plans the corrective command set, publishes it as one batch, and only
//! then mutates the store. A channel failure aborts the cycle before any
//! mutation, so the next cycle recomputes the same targets — retry by
//! construction, safe because the commands are idempotent.

use grainhub_domain::command::{Command, DEFAULT_AUTO_INTERVAL_SECS, DEFAULT_NAMESPACE, RunMode, command_topic};
use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::HubError;
use grainhub_domain::plan::CyclePlan;
use grainhub_domain::time::Timestamp;

use crate::ports::{CommandChannel, DeviceRegistry, Publication, TimerRepository};

/// Tunables for the reconciliation cycle.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Topic namespace commands are published under.
    pub namespace: String,
    /// `time_interval` sent with a start-auto command, in seconds.
    pub auto_interval_secs: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            auto_interval_secs: DEFAULT_AUTO_INTERVAL_SECS,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleOutcome {
    /// Devices that were sent a stop command (safety stops and expiries).
    pub stopped_devices: Vec<DeviceCode>,
    /// Devices whose cool-down ended and were switched back to auto.
    pub promoted_devices: Vec<DeviceCode>,
    /// Expired manual rows removed from the store.
    pub expired_cleared: u64,
}

/// Periodic reconciliation service.
pub struct Reconciler<TR, DR, CC> {
    timers: TR,
    registry: DR,
    channel: CC,
    config: ReconcilerConfig,
}

impl<TR, DR, CC> Reconciler<TR, DR, CC>
where
    TR: TimerRepository + Send + Sync,
    DR: DeviceRegistry + Send + Sync,
    CC: CommandChannel + Send + Sync,
{
    /// Create a reconciler over the given ports.
    pub fn new(timers: TR, registry: DR, channel: CC, config: ReconcilerConfig) -> Self {
        Self {
            timers,
            registry,
            channel,
            config,
        }
    }

    /// Run one reconciliation cycle evaluated against `now`.
    ///
    /// # Errors
    ///
    /// Propagates storage errors from the reads and the commit, and channel
    /// errors from the batch publish. On a publish error the store is left
    /// unmodified.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self, now: Timestamp) -> Result<CycleOutcome, HubError> {
        let active = self.timers.list_active().await?;
        let devices = self.registry.list_codes().await?;

        let plan = CyclePlan::build(now, &devices, &active);
        if plan.is_noop() {
            tracing::debug!("all devices compliant, nothing to dispatch");
            return Ok(CycleOutcome::default());
        }

        let batch = self.build_batch(&plan, now);
        let report = self.channel.publish_batch(batch).await?;
        if !report.is_complete() {
            tracing::warn!(
                delivered = report.delivered,
                failed = report.failures.len(),
                "partial batch delivery, committing anyway"
            );
        }

        let expired_cleared = if plan.expiry_stops.is_empty() {
            0
        } else {
            self.timers.delete_many(&plan.expiry_stops).await?
        };
        for code in &plan.auto_restarts {
            self.timers.promote_to_auto(code, now).await?;
        }

        let outcome = CycleOutcome {
            stopped_devices: plan.stop_targets().cloned().collect(),
            promoted_devices: plan.auto_restarts.clone(),
            expired_cleared,
        };
        tracing::info!(
            stopped = outcome.stopped_devices.len(),
            promoted = outcome.promoted_devices.len(),
            expired_cleared = outcome.expired_cleared,
            "reconciliation cycle committed"
        );
        Ok(outcome)
    }

    fn build_batch(&self, plan: &CyclePlan, now: Timestamp) -> Vec<Publication> {
        let stop = Command::Stop;
        let start_auto = Command::set_mode(RunMode::Auto, Some(self.config.auto_interval_secs));

        plan.stop_targets()
            .map(|code| {
                Publication::new(
                    command_topic(&self.config.namespace, code),
                    stop.wire_payload(now),
                )
            })
            .chain(plan.auto_restarts.iter().map(|code| {
                Publication::new(
                    command_topic(&self.config.namespace, code),
                    start_auto.wire_payload(now),
                )
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grainhub_domain::timer::{Timer, TimerMode};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    use crate::ports::{PublishFailure, PublishReport};

    struct InMemoryTimers {
        store: Mutex<HashMap<DeviceCode, Timer>>,
    }

    impl InMemoryTimers {
        fn with(timers: Vec<Timer>) -> Self {
            Self {
                store: Mutex::new(
                    timers
                        .into_iter()
                        .map(|t| (t.device_code.clone(), t))
                        .collect(),
                ),
            }
        }

        fn get(&self, code: &str) -> Option<Timer> {
            let store = self.store.lock().unwrap();
            store.get(&DeviceCode::new(code).unwrap()).cloned()
        }
    }

    impl TimerRepository for InMemoryTimers {
        fn list_active(&self) -> impl Future<Output = Result<Vec<Timer>, HubError>> + Send {
            let result: Vec<Timer> = self.store.lock().unwrap().values().cloned().collect();
            async { Ok(result) }
        }

        fn insert(&self, timer: Timer) -> impl Future<Output = Result<Timer, HubError>> + Send {
            let mut store = self.store.lock().unwrap();
            store.insert(timer.device_code.clone(), timer.clone());
            async { Ok(timer) }
        }

        fn delete_many(
            &self,
            codes: &[DeviceCode],
        ) -> impl Future<Output = Result<u64, HubError>> + Send {
            let mut store = self.store.lock().unwrap();
            let mut removed = 0;
            for code in codes {
                if store.remove(code).is_some() {
                    removed += 1;
                }
            }
            async move { Ok(removed) }
        }

        fn promote_to_auto(
            &self,
            code: &DeviceCode,
            now: Timestamp,
        ) -> impl Future<Output = Result<(), HubError>> + Send {
            let mut store = self.store.lock().unwrap();
            if let Some(timer) = store.get(code) {
                let promoted = timer.promoted_to_auto(now);
                store.insert(code.clone(), promoted);
            }
            async { Ok(()) }
        }
    }

    struct StaticRegistry(Vec<DeviceCode>);

    impl DeviceRegistry for StaticRegistry {
        fn list_codes(&self) -> impl Future<Output = Result<Vec<DeviceCode>, HubError>> + Send {
            let codes = self.0.clone();
            async { Ok(codes) }
        }
    }

    /// Records every batch it is asked to publish.
    #[derive(Default)]
    struct RecordingChannel {
        batches: Mutex<Vec<Vec<Publication>>>,
    }

    impl RecordingChannel {
        fn batches(&self) -> Vec<Vec<Publication>> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl CommandChannel for RecordingChannel {
        fn publish_batch(
            &self,
            batch: Vec<Publication>,
        ) -> impl Future<Output = Result<PublishReport, HubError>> + Send {
            let delivered = batch.len();
            self.batches.lock().unwrap().push(batch);
            async move {
                Ok(PublishReport {
                    delivered,
                    ..PublishReport::default()
                })
            }
        }
    }

    /// Fails every batch with a connection-level error.
    struct DownChannel;

    impl CommandChannel for DownChannel {
        fn publish_batch(
            &self,
            _batch: Vec<Publication>,
        ) -> impl Future<Output = Result<PublishReport, HubError>> + Send {
            async { Err(HubError::Channel("connection refused".into())) }
        }
    }

    /// Accepts the batch but reports every message as failed.
    struct LossyChannel;

    impl CommandChannel for LossyChannel {
        fn publish_batch(
            &self,
            batch: Vec<Publication>,
        ) -> impl Future<Output = Result<PublishReport, HubError>> + Send {
            let failures = batch
                .into_iter()
                .map(|p| PublishFailure {
                    topic: p.topic,
                    reason: "queue full".to_string(),
                })
                .collect();
            async move {
                Ok(PublishReport {
                    delivered: 0,
                    failures,
                })
            }
        }
    }

    fn code(s: &str) -> DeviceCode {
        DeviceCode::new(s).unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn reconciler<CC: CommandChannel + Send + Sync>(
        timers: InMemoryTimers,
        devices: Vec<DeviceCode>,
        channel: CC,
    ) -> Reconciler<InMemoryTimers, StaticRegistry, CC> {
        Reconciler::new(
            timers,
            StaticRegistry(devices),
            channel,
            ReconcilerConfig::default(),
        )
    }

    #[tokio::test]
    async fn should_safety_stop_untracked_device_every_cycle() {
        let svc = reconciler(
            InMemoryTimers::with(vec![]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        let first = svc.run_cycle(at(100)).await.unwrap();
        let second = svc.run_cycle(at(160)).await.unwrap();
        assert_eq!(first.stopped_devices, vec![code("mm000001")]);
        assert_eq!(second.stopped_devices, vec![code("mm000001")]);

        let batches = svc.channel.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][0].topic, "c2tech/mm000001/cmd");
        assert_eq!(batches[0][0].payload["cmd"], "stop");
        assert_eq!(batches[0][0].payload["mode"], "manual");
    }

    #[tokio::test]
    async fn should_delete_expired_manual_row_in_same_cycle_as_dispatch() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::manual(code("mm000001"), at(0), 600)]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        let outcome = svc.run_cycle(at(600)).await.unwrap();
        assert_eq!(outcome.stopped_devices, vec![code("mm000001")]);
        assert_eq!(outcome.expired_cleared, 1);
        assert!(svc.timers.get("mm000001").is_none());

        let batches = svc.channel.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].payload["cmd"], "stop");
    }

    #[tokio::test]
    async fn should_promote_expired_cooldown_row_and_send_one_set_mode() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::pending_auto_restart(code("mm000001"), at(0), 120)]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        let outcome = svc.run_cycle(at(120)).await.unwrap();
        assert_eq!(outcome.promoted_devices, vec![code("mm000001")]);
        assert!(outcome.stopped_devices.is_empty());

        let promoted = svc.timers.get("mm000001").unwrap();
        assert_eq!(promoted.mode, TimerMode::Auto);
        assert_eq!(promoted.duration_seconds, 0);
        assert!(promoted.target_stop_time >= at(120) + Duration::days(3650));

        let batches = svc.channel.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].payload["cmd"], "SET_MODE");
        assert_eq!(batches[0][0].payload["mode"], "auto");
        assert_eq!(batches[0][0].payload["time_interval"], 300);
    }

    #[tokio::test]
    async fn should_send_only_start_auto_when_device_is_restarting() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::pending_auto_restart(code("mm000001"), at(0), 120)]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        svc.run_cycle(at(500)).await.unwrap();

        let batches = svc.channel.batches();
        let commands: Vec<&str> = batches[0]
            .iter()
            .map(|p| p.payload["cmd"].as_str().unwrap())
            .collect();
        assert_eq!(commands, vec!["SET_MODE"]);
    }

    #[tokio::test]
    async fn should_perform_no_publish_when_everything_is_compliant() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::auto(code("mm000001"), at(0))]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        let outcome = svc.run_cycle(at(1_000)).await.unwrap();
        assert_eq!(outcome, CycleOutcome::default());
        assert!(svc.channel.batches().is_empty());
    }

    #[tokio::test]
    async fn should_leave_store_untouched_when_channel_is_down() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::manual(code("mm000001"), at(0), 600)]),
            vec![code("mm000001"), code("mm000002")],
            DownChannel,
        );

        let result = svc.run_cycle(at(600)).await;
        assert!(matches!(result, Err(HubError::Channel(_))));
        assert!(svc.timers.get("mm000001").is_some());
    }

    #[tokio::test]
    async fn should_commit_on_partial_delivery() {
        // Best-effort channel policy: per-message failures do not block the
        // commit, only a connection-level error does.
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::manual(code("mm000001"), at(0), 600)]),
            vec![code("mm000001")],
            LossyChannel,
        );

        let outcome = svc.run_cycle(at(600)).await.unwrap();
        assert_eq!(outcome.expired_cleared, 1);
        assert!(svc.timers.get("mm000001").is_none());
    }

    #[tokio::test]
    async fn should_recompute_same_targets_after_failed_cycle() {
        let timers = InMemoryTimers::with(vec![Timer::manual(code("mm000001"), at(0), 600)]);
        let devices = vec![code("mm000001"), code("mm000002")];

        let down = Reconciler::new(
            InMemoryTimers::with(vec![Timer::manual(code("mm000001"), at(0), 600)]),
            StaticRegistry(devices.clone()),
            DownChannel,
            ReconcilerConfig::default(),
        );
        assert!(down.run_cycle(at(600)).await.is_err());

        let up = reconciler(timers, devices, RecordingChannel::default());
        let outcome = up.run_cycle(at(600)).await.unwrap();
        assert_eq!(
            outcome.stopped_devices,
            vec![code("mm000002"), code("mm000001")]
        );
    }

    #[tokio::test]
    async fn should_not_double_promote_on_back_to_back_cycles() {
        let svc = reconciler(
            InMemoryTimers::with(vec![Timer::pending_auto_restart(code("mm000001"), at(0), 120)]),
            vec![code("mm000001")],
            RecordingChannel::default(),
        );

        let first = svc.run_cycle(at(120)).await.unwrap();
        assert_eq!(first.promoted_devices, vec![code("mm000001")]);

        // The promoted row is now an unexpired auto timer: the second cycle
        // has nothing to do for this device.
        let second = svc.run_cycle(at(121)).await.unwrap();
        assert!(second.promoted_devices.is_empty());
        assert!(second.stopped_devices.is_empty());
        assert_eq!(svc.channel.batches().len(), 1);
    }
}
