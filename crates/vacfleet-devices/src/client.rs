//! Robot client contract.
//!
//! A [`RobotConnector`] dials one robot and hands back a [`RobotClient`]
//! handle. The session layer depends only on these traits; the production
//! implementation lives in [`crate::local`], tests use [`crate::mock`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use vacfleet_core::config::Credentials;
use vacfleet_core::state::{MissionSnapshot, RawState};
use vacfleet_core::RobotCommand;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by a robot client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The connected signal did not arrive in time
    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Operation attempted without a live connection
    #[error("Not connected")]
    NotConnected,

    /// The robot sent something the client could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Payload encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection was closed underneath the caller
    #[error("Connection closed")]
    Closed,
}

/// A command as it goes onto the robot's wire.
///
/// Room cleans ride the `start` verb with the region passed as an extra
/// argument; every other command maps one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    /// Wire verb
    pub command: String,
    /// Seconds since the epoch at dispatch
    pub time: i64,
    /// Origin tag the robot expects from local controllers
    pub initiator: String,
    /// Verb-specific arguments
    #[serde(flatten)]
    pub args: serde_json::Map<String, Value>,
}

impl CommandRequest {
    /// Build a request for a bare verb.
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            command: verb.into(),
            time: chrono::Utc::now().timestamp(),
            initiator: "localApp".to_string(),
            args: serde_json::Map::new(),
        }
    }

    /// Attach a verb-specific argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

impl From<&RobotCommand> for CommandRequest {
    fn from(command: &RobotCommand) -> Self {
        match command {
            RobotCommand::CleanRoom { favorite_id } => {
                CommandRequest::new("start").with_arg("favorite_id", favorite_id.clone())
            }
            other => CommandRequest::new(other.verb()),
        }
    }
}

/// A live handle to one robot.
///
/// Handles are cheap to share and internally synchronized. A handle stays
/// usable until [`RobotClient::end`] is called or the transport dies.
#[async_trait]
pub trait RobotClient: Send + Sync {
    /// Resolve once the transport has reported the connection up.
    ///
    /// With `timeout: None` this waits indefinitely, which is the supervisor
    /// default; a bounded wait surfaces [`ClientError::ConnectTimeout`].
    async fn wait_connected(&self, timeout: Option<Duration>) -> ClientResult<()>;

    /// Query robot state, returning once every named field is present.
    ///
    /// The reply may carry more fields than requested.
    async fn robot_state(&self, required_fields: &[&str]) -> ClientResult<RawState>;

    /// Query the current mission status.
    async fn mission(&self) -> ClientResult<MissionSnapshot>;

    /// Send one command and return the robot's acknowledgement verbatim.
    async fn send(&self, request: &CommandRequest) -> ClientResult<Value>;

    /// Advisory stream of raw state deltas as the robot pushes them.
    ///
    /// Purely informational; polling does not depend on it.
    fn updates(&self) -> broadcast::Receiver<Value>;

    /// Release the connection.
    async fn end(&self) -> ClientResult<()>;
}

/// Dials robots on behalf of sessions.
#[async_trait]
pub trait RobotConnector: Send + Sync {
    /// Open a fresh connection to the robot at `address`.
    async fn connect(
        &self,
        credentials: &Credentials,
        address: &str,
    ) -> ClientResult<Arc<dyn RobotClient>>;
}
