//! One robot's session: connection lifecycle and guarded command dispatch.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use vacfleet_core::config::{Credentials, RobotConfig};
use vacfleet_core::state::{MissionSnapshot, RawState};
use vacfleet_core::RobotCommand;

use super::client::{ClientError, ClientResult, CommandRequest, RobotClient, RobotConnector};

/// Session connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Per-session tunables.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Bound on the connect wait; `None` waits indefinitely
    pub connect_timeout: Option<Duration>,
}

/// Result of one guarded command dispatch.
///
/// Dispatch never raises to its caller: a client failure is logged at the
/// session boundary and collapsed into [`CommandOutcome::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The robot accepted the command; carries its response verbatim
    Completed(Value),
    /// The dispatch failed; details are in the log
    Failed,
}

impl CommandOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The robot's response, if the dispatch completed.
    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed => None,
        }
    }
}

/// Owns one robot's connection and dispatches commands and queries to it.
///
/// Created once per robot at startup and kept for the process lifetime. The
/// connection handle is replaced wholesale on each reconnect; at most one
/// live handle exists at any time.
pub struct Session {
    config: RobotConfig,
    credentials: Credentials,
    connector: Arc<dyn RobotConnector>,
    client: RwLock<Option<Arc<dyn RobotClient>>>,
    state: RwLock<SessionState>,
    settings: SessionSettings,
}

impl Session {
    pub fn new(
        config: RobotConfig,
        credentials: Credentials,
        connector: Arc<dyn RobotConnector>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            config,
            credentials,
            connector,
            client: RwLock::new(None),
            state: RwLock::new(SessionState::Disconnected),
            settings,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Establish the connection, superseding any previous handle.
    ///
    /// Waits for the transport's connected signal before returning. With no
    /// configured timeout the wait is unbounded. Reconnection is this same
    /// call again: the prior handle is released best-effort and replaced.
    pub async fn connect(&self) -> ClientResult<()> {
        if let Some(previous) = self.client.write().await.take() {
            if let Err(e) = previous.end().await {
                warn!(robot = %self.config.identifier, "releasing superseded connection failed: {e}");
            }
        }
        *self.state.write().await = SessionState::Connecting;

        let result = async {
            let client = self
                .connector
                .connect(&self.credentials, &self.config.address)
                .await?;
            client.wait_connected(self.settings.connect_timeout).await?;
            Ok(client)
        }
        .await;

        match result {
            Ok(client) => {
                *self.client.write().await = Some(client);
                *self.state.write().await = SessionState::Connected;
                info!(robot = %self.config.identifier, address = %self.config.address, "session connected");
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Release the connection. Best-effort: failures are logged, never
    /// propagated, and the session always ends up disconnected.
    pub async fn disconnect(&self) {
        if let Some(client) = self.client.write().await.take() {
            if let Err(e) = client.end().await {
                warn!(robot = %self.config.identifier, "disconnect failed: {e}");
            }
        }
        *self.state.write().await = SessionState::Disconnected;
    }

    async fn client(&self) -> ClientResult<Arc<dyn RobotClient>> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    /// Query robot state. Callers must have connected first; errors propagate.
    pub async fn robot_state(&self, required_fields: &[&str]) -> ClientResult<RawState> {
        self.client().await?.robot_state(required_fields).await
    }

    /// Query mission status. Callers must have connected first; errors propagate.
    pub async fn mission(&self) -> ClientResult<MissionSnapshot> {
        self.client().await?.mission().await
    }

    /// Advisory stream of raw state deltas pushed by the robot.
    ///
    /// Polling does not depend on this; it exists for callers that want to
    /// watch deltas between cycles.
    pub async fn updates(&self) -> ClientResult<tokio::sync::broadcast::Receiver<Value>> {
        Ok(self.client().await?.updates())
    }

    /// Dispatch one command to the robot.
    ///
    /// Docking pauses the robot first; that pause is best-effort and its
    /// failure never blocks the dock itself. The dispatch proper is guarded:
    /// the outcome is a sentinel, never an error.
    pub async fn execute(&self, command: &RobotCommand) -> CommandOutcome {
        if matches!(command, RobotCommand::Dock) {
            // The robot refuses to dock mid-run; pause it first.
            if let Ok(client) = self.client().await {
                let _ = client
                    .send(&CommandRequest::from(&RobotCommand::Pause))
                    .await;
            }
        }
        self.guarded(command).await
    }

    /// Send a command, converting any failure into the sentinel outcome and
    /// logging it with the robot and command context.
    async fn guarded(&self, command: &RobotCommand) -> CommandOutcome {
        let request = CommandRequest::from(command);
        let result = match self.client().await {
            Ok(client) => client.send(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(response) => CommandOutcome::Completed(response),
            Err(e) => {
                warn!(robot = %self.config.identifier, command = %command, "command failed: {e}");
                CommandOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Connected.to_string(), "connected");
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn test_outcome_accessors() {
        let done = CommandOutcome::Completed(serde_json::json!({"ok": null}));
        assert!(!done.is_failed());
        assert!(done.response().is_some());

        assert!(CommandOutcome::Failed.is_failed());
        assert!(CommandOutcome::Failed.response().is_none());
    }
}
