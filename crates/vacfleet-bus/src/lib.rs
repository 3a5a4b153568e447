//! MQTT bus transport for the vacfleet supervisor.
//!
//! Implements the [`vacfleet_core::StatePublisher`] contract over a broker
//! connection and turns inbound `<root>/<address>/cmd` messages into
//! [`vacfleet_core::CommandEnvelope`]s for the supervisor to route.

pub mod endpoint;
pub mod mqtt;

pub use endpoint::Endpoint;
pub use mqtt::{BusSettings, MqttBus};

/// Errors raised by the bus transport.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The broker endpoint string could not be understood
    #[error("Invalid broker endpoint: {0}")]
    InvalidEndpoint(String),

    /// The broker connection failed
    #[error("Transport error: {0}")]
    Transport(String),
}
