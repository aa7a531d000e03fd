//! Reconciliation planning — classify the device population against the
//! timer set and decide which commands this cycle must send.
//!
//! The planner is pure: it sees a snapshot of the registry and the active
//! timers and produces target sets. All IO (reads, the batch publish, the
//! store mutations) stays in the application service, so every policy rule
//! here is unit-testable without a broker or a database.

use std::collections::{HashMap, HashSet};

use crate::device::DeviceCode;
use crate::time::Timestamp;
use crate::timer::{Timer, TimerMode};

/// What one device's desired run-state is, made explicit.
///
/// The store encodes "stopped" as the absence of a timer row; inside the
/// planner that convention becomes a tagged variant so the safety-stop rule
/// reads as a match, not as a missing map entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredState {
    /// A timer row governs this device.
    Tracked(Timer),
    /// No timer row: the device should be stopped.
    Untracked,
}

/// Compute the desired state of every registered device.
#[must_use]
pub fn desired_states(devices: &[DeviceCode], timers: &[Timer]) -> Vec<(DeviceCode, DesiredState)> {
    let by_code: HashMap<&DeviceCode, &Timer> =
        timers.iter().map(|t| (&t.device_code, t)).collect();
    devices
        .iter()
        .map(|code| {
            let state = by_code
                .get(code)
                .map_or(DesiredState::Untracked, |t| DesiredState::Tracked((*t).clone()));
            (code.clone(), state)
        })
        .collect()
}

/// Target sets for one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CyclePlan {
    /// Devices with no timer row at all: the standing safety-stop policy.
    pub safety_stops: Vec<DeviceCode>,
    /// Devices whose manual run period has ended.
    pub expiry_stops: Vec<DeviceCode>,
    /// Devices whose cool-down has ended and should resume automatic
    /// operation.
    pub auto_restarts: Vec<DeviceCode>,
}

impl CyclePlan {
    /// Build the plan for one cycle from a snapshot of the registry and the
    /// active timers, evaluated against `now`.
    #[must_use]
    pub fn build(now: Timestamp, devices: &[DeviceCode], timers: &[Timer]) -> Self {
        let mut expiry_stops = Vec::new();
        let mut auto_restarts = Vec::new();

        for timer in timers {
            if !timer.is_expired(now) {
                continue;
            }
            match timer.mode {
                TimerMode::PendingAutoRestart => auto_restarts.push(timer.device_code.clone()),
                TimerMode::Manual | TimerMode::Auto => {
                    expiry_stops.push(timer.device_code.clone());
                }
            }
        }

        // A device about to receive start-auto must never also receive a
        // stop in the same cycle.
        let restarting: HashSet<&DeviceCode> = auto_restarts.iter().collect();
        let safety_stops = desired_states(devices, timers)
            .into_iter()
            .filter_map(|(code, state)| match state {
                DesiredState::Untracked if !restarting.contains(&code) => Some(code),
                DesiredState::Untracked | DesiredState::Tracked(_) => None,
            })
            .collect();

        Self {
            safety_stops,
            expiry_stops,
            auto_restarts,
        }
    }

    /// All devices that receive a stop command this cycle.
    pub fn stop_targets(&self) -> impl Iterator<Item = &DeviceCode> {
        self.safety_stops.iter().chain(self.expiry_stops.iter())
    }

    /// Whether this cycle has nothing to send.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.safety_stops.is_empty()
            && self.expiry_stops.is_empty()
            && self.auto_restarts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn code(s: &str) -> DeviceCode {
        DeviceCode::new(s).unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn should_mark_registered_device_without_timer_as_untracked() {
        let devices = vec![code("mm000001"), code("mm000002")];
        let timers = vec![Timer::manual(code("mm000002"), at(0), 600)];

        let states = desired_states(&devices, &timers);
        assert_eq!(states[0], (code("mm000001"), DesiredState::Untracked));
        assert!(matches!(states[1].1, DesiredState::Tracked(_)));
    }

    #[test]
    fn should_safety_stop_every_untracked_device() {
        let devices = vec![code("mm000001"), code("mm000002"), code("mm000003")];
        let timers = vec![Timer::auto(code("mm000002"), at(0))];

        let plan = CyclePlan::build(at(100), &devices, &timers);
        assert_eq!(plan.safety_stops, vec![code("mm000001"), code("mm000003")]);
        assert!(plan.expiry_stops.is_empty());
        assert!(plan.auto_restarts.is_empty());
    }

    #[test]
    fn should_keep_safety_stopping_on_every_cycle() {
        // The safety stop is a standing invariant, not one-shot: the same
        // untracked device is targeted again on the next cycle.
        let devices = vec![code("mm000001")];
        let first = CyclePlan::build(at(100), &devices, &[]);
        let second = CyclePlan::build(at(160), &devices, &[]);
        assert_eq!(first.safety_stops, second.safety_stops);
    }

    #[test]
    fn should_stop_expired_manual_timer() {
        let devices = vec![code("mm000001")];
        let timers = vec![Timer::manual(code("mm000001"), at(0), 600)];

        let plan = CyclePlan::build(at(600), &devices, &timers);
        assert_eq!(plan.expiry_stops, vec![code("mm000001")]);
        assert!(plan.safety_stops.is_empty());
    }

    #[test]
    fn should_leave_unexpired_timer_untouched() {
        let devices = vec![code("mm000001")];
        let timers = vec![Timer::manual(code("mm000001"), at(0), 600)];

        let plan = CyclePlan::build(at(599), &devices, &timers);
        assert!(plan.is_noop());
    }

    #[test]
    fn should_restart_expired_cooldown_timer() {
        let devices = vec![code("mm000001")];
        let timers = vec![Timer::pending_auto_restart(code("mm000001"), at(0), 120)];

        let plan = CyclePlan::build(at(120), &devices, &timers);
        assert_eq!(plan.auto_restarts, vec![code("mm000001")]);
        assert!(plan.safety_stops.is_empty());
        assert!(plan.expiry_stops.is_empty());
    }

    #[test]
    fn should_never_stop_and_restart_the_same_device() {
        // A restarting device must receive only the start-auto command,
        // even when classification would also put it in the stop set.
        let devices = vec![code("mm000001")];
        let timers = vec![Timer::pending_auto_restart(code("mm000001"), at(0), 120)];

        let plan = CyclePlan::build(at(500), &devices, &timers);
        let stops: Vec<_> = plan.stop_targets().collect();
        assert!(stops.is_empty());
        assert_eq!(plan.auto_restarts, vec![code("mm000001")]);
    }

    #[test]
    fn should_classify_expired_timer_for_unregistered_device() {
        // Expiry handling follows the timer table, not the registry.
        let timers = vec![Timer::manual(code("mm000099"), at(0), 60)];

        let plan = CyclePlan::build(at(60), &[], &timers);
        assert_eq!(plan.expiry_stops, vec![code("mm000099")]);
    }

    #[test]
    fn should_produce_identical_plans_for_identical_snapshots() {
        let devices = vec![code("mm000001"), code("mm000002")];
        let timers = vec![
            Timer::manual(code("mm000002"), at(0), 600),
            Timer::pending_auto_restart(code("mm000003"), at(0), 60),
        ];

        let first = CyclePlan::build(at(700), &devices, &timers);
        let second = CyclePlan::build(at(700), &devices, &timers);
        assert_eq!(first, second);
    }

    #[test]
    fn should_report_noop_when_everything_is_compliant() {
        let devices = vec![code("mm000001")];
        let timers = vec![Timer::auto(code("mm000001"), at(0))];

        let plan = CyclePlan::build(at(1_000), &devices, &timers);
        assert!(plan.is_noop());
    }
}
