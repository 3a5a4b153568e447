//! The per-robot poll loop.
//!
//! After a session connects, the loop queries state and mission on a fixed
//! cadence, publishes the normalized projections, and logs command
//! transitions edge-triggered. Cycles are strictly sequential: a cycle's
//! publishes complete before the cadence sleep begins.
//!
//! Query and publish failures are not recovered here. They end this robot's
//! loop; the supervisor keeps every other robot running.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use vacfleet_core::state::{LastCommand, RobotStateSnapshot};
use vacfleet_core::{PublishError, StatePublisher};

use super::client::ClientError;
use super::session::Session;

/// Fields a state query waits for before the cycle proceeds.
const REQUIRED_FIELDS: &[&str] = &["batPct", "bbchg3"];

/// Poll loop tunables.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between the end of one cycle and the start of the next
    pub cadence: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(10),
        }
    }
}

/// Errors that end a robot's poll loop.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// A state or mission query failed
    #[error("Query failed: {0}")]
    Query(#[source] ClientError),

    /// A snapshot could not be handed to the bus
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    /// A snapshot could not be serialized
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Detects command transitions across poll cycles.
///
/// The marker updates if and only if the command name or its timestamp
/// changed, so identical consecutive reports never re-trigger.
#[derive(Debug, Default)]
pub struct CommandTracker {
    last: LastCommand,
}

impl CommandTracker {
    /// Record the current marker. Returns `true` on a transition.
    pub fn observe(&mut self, current: &LastCommand) -> bool {
        if current.command != self.last.command || current.time != self.last.time {
            self.last = current.clone();
            true
        } else {
            false
        }
    }

    /// The most recently recorded marker.
    pub fn last(&self) -> &LastCommand {
        &self.last
    }
}

/// Run one poll cycle: query, detect transitions, publish state then mission.
pub async fn run_cycle(
    session: &Session,
    publisher: &dyn StatePublisher,
    topic: &str,
    tracker: &mut CommandTracker,
) -> Result<(), PollError> {
    let raw = session
        .robot_state(REQUIRED_FIELDS)
        .await
        .map_err(PollError::Query)?;

    if tracker.observe(&raw.last_command) {
        info!(
            robot = %session.identifier(),
            command = %raw.last_command.command,
            time = raw.last_command.time,
            "robot accepted command"
        );
    }

    let snapshot = RobotStateSnapshot::from_raw(&session.config().kind, &raw);
    publisher
        .publish(topic, &serde_json::to_value(&snapshot)?)
        .await?;

    let mission = session.mission().await.map_err(PollError::Query)?;
    publisher
        .publish(topic, &serde_json::to_value(&mission)?)
        .await?;

    Ok(())
}

/// Drive a session's poll loop until a query or publish fails.
pub async fn run(
    session: Arc<Session>,
    publisher: Arc<dyn StatePublisher>,
    topic: String,
    settings: PollSettings,
) -> Result<(), PollError> {
    let mut tracker = CommandTracker::default();
    loop {
        run_cycle(&session, publisher.as_ref(), &topic, &mut tracker).await?;
        tokio::time::sleep(settings.cadence).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(command: &str, time: i64) -> LastCommand {
        LastCommand {
            command: command.to_string(),
            time,
        }
    }

    #[test]
    fn test_tracker_triggers_once_per_transition() {
        let mut tracker = CommandTracker::default();

        // First real marker is a transition from the empty default
        assert!(tracker.observe(&marker("clean", 100)));

        // Identical markers across any number of cycles stay quiet
        for _ in 0..5 {
            assert!(!tracker.observe(&marker("clean", 100)));
        }
        assert_eq!(tracker.last(), &marker("clean", 100));
    }

    #[test]
    fn test_tracker_triggers_on_command_change() {
        let mut tracker = CommandTracker::default();
        tracker.observe(&marker("clean", 100));
        assert!(tracker.observe(&marker("dock", 100)));
    }

    #[test]
    fn test_tracker_triggers_on_time_change() {
        let mut tracker = CommandTracker::default();
        tracker.observe(&marker("clean", 100));
        assert!(tracker.observe(&marker("clean", 101)));
    }

    #[test]
    fn test_default_cadence() {
        assert_eq!(PollSettings::default().cadence, Duration::from_secs(10));
    }
}
