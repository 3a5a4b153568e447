//! Fleet supervision: one independent run-loop per configured robot.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vacfleet_core::config::ProvisionedRobot;
use vacfleet_core::{device_topic, CommandEnvelope, StatePublisher};

use super::client::RobotConnector;
use super::poll::{self, PollSettings};
use super::session::{Session, SessionSettings};

/// Builds one [`Session`] per configured robot and runs them concurrently.
///
/// Run-loops are fire-and-forget: there is no retry or backoff between
/// robots, and a failure in one robot's loop never stops another's.
pub struct FleetSupervisor {
    sessions: Vec<Arc<Session>>,
    publisher: Arc<dyn StatePublisher>,
    topic_root: String,
    poll: PollSettings,
}

impl FleetSupervisor {
    /// Construct sessions in configuration order.
    pub fn new(
        robots: Vec<ProvisionedRobot>,
        connector: Arc<dyn RobotConnector>,
        publisher: Arc<dyn StatePublisher>,
        topic_root: impl Into<String>,
        session_settings: SessionSettings,
        poll: PollSettings,
    ) -> Self {
        let sessions = robots
            .into_iter()
            .map(|robot| {
                info!(
                    robot = %robot.config.identifier,
                    address = %robot.config.address,
                    "supervising robot"
                );
                Arc::new(Session::new(
                    robot.config,
                    robot.credentials,
                    connector.clone(),
                    session_settings.clone(),
                ))
            })
            .collect();
        Self {
            sessions,
            publisher,
            topic_root: topic_root.into(),
            poll,
        }
    }

    /// The supervised sessions, in configuration order.
    pub fn sessions(&self) -> &[Arc<Session>] {
        &self.sessions
    }

    /// Look a session up by robot network address.
    pub fn session_for(&self, address: &str) -> Option<&Arc<Session>> {
        self.sessions
            .iter()
            .find(|session| session.address() == address)
    }

    /// Spawn every robot's run-loop as its own task.
    pub fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        self.sessions
            .iter()
            .map(|session| {
                let session = session.clone();
                let publisher = self.publisher.clone();
                let topic = device_topic(&self.topic_root, session.address());
                let settings = self.poll.clone();
                tokio::spawn(run_robot(session, publisher, topic, settings))
            })
            .collect()
    }

    /// Dispatch bus command envelopes to the owning sessions.
    ///
    /// Runs until the envelope stream closes. Unknown addresses are logged
    /// and dropped; dispatch outcomes surface through the session's own
    /// logging.
    pub async fn route_commands(&self, mut commands: mpsc::Receiver<CommandEnvelope>) {
        while let Some(envelope) = commands.recv().await {
            let Some(session) = self.session_for(&envelope.address) else {
                warn!(
                    address = %envelope.address,
                    command = %envelope.command,
                    "command for unknown robot dropped"
                );
                continue;
            };
            let outcome = session.execute(&envelope.command).await;
            debug!(
                robot = %session.identifier(),
                command = %envelope.command,
                failed = outcome.is_failed(),
                "bus command dispatched"
            );
        }
    }
}

impl std::fmt::Debug for FleetSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetSupervisor")
            .field("robots", &self.sessions.len())
            .field("topic_root", &self.topic_root)
            .finish()
    }
}

/// One robot's run-loop: connect, then poll until the loop fails.
async fn run_robot(
    session: Arc<Session>,
    publisher: Arc<dyn StatePublisher>,
    topic: String,
    settings: PollSettings,
) {
    info!(robot = %session.identifier(), "waiting for connection");
    if let Err(e) = session.connect().await {
        error!(robot = %session.identifier(), "connect failed: {e}");
        return;
    }
    match poll::run(session.clone(), publisher, topic, settings).await {
        Ok(()) => {}
        Err(e) => {
            error!(robot = %session.identifier(), "poll loop ended: {e}");
        }
    }
}
