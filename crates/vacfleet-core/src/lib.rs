//! Shared data model for the vacfleet supervisor.
//!
//! This crate holds the types every other vacfleet crate agrees on:
//!
//! - **Fleet configuration**: the list of robots to supervise and the
//!   per-robot credentials resolved from the environment at startup.
//! - **Command vocabulary**: the small set of verbs a robot accepts.
//! - **Telemetry model**: the wire-shaped raw state reported by a robot and
//!   the normalized snapshots published on the bus.
//! - **Bus contract**: the publisher trait and topic scheme the transport
//!   layer implements.
//!
//! None of the types here talk to the network. Connection handling lives in
//! `vacfleet-devices`, transport plumbing in `vacfleet-bus`.

pub mod bus;
pub mod command;
pub mod config;
pub mod state;

pub use bus::{command_topic, device_topic, CommandEnvelope, PublishError, StatePublisher};
pub use command::RobotCommand;
pub use config::{ConfigError, Credentials, Favorite, FleetConfig, ProvisionedRobot, RobotConfig};
pub use state::{DockState, LastCommand, MissionSnapshot, RawState, RobotStateSnapshot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
