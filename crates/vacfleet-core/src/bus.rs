//! The bus contract: state publication and inbound command envelopes.
//!
//! The supervisor treats the bus as a fire-and-forget transport. Publishes
//! carry a JSON document to a per-robot topic; no delivery acknowledgement is
//! tracked. The transport must tolerate concurrent publishes from every
//! robot's poll loop.

use async_trait::async_trait;
use serde_json::Value;

use crate::command::RobotCommand;

/// Failure to hand a payload to the bus transport.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The transport rejected or could not accept the payload
    #[error("Bus transport unavailable: {0}")]
    Transport(String),

    /// The payload could not be serialized
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sink for per-robot state documents.
///
/// Implemented by the MQTT transport in `vacfleet-bus`; tests substitute
/// recording implementations.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// Deliver one state document to the given topic, best effort.
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), PublishError>;
}

/// A command received from the bus, addressed by robot network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnvelope {
    /// Address segment of the topic the command arrived on
    pub address: String,
    /// The decoded command
    pub command: RobotCommand,
}

/// Topic a robot's state is published on: `<root>/<address>`.
pub fn device_topic(root: &str, address: &str) -> String {
    format!("{root}/{address}")
}

/// Topic a robot's commands arrive on: `<root>/<address>/cmd`.
pub fn command_topic(root: &str, address: &str) -> String {
    format!("{root}/{address}/cmd")
}
