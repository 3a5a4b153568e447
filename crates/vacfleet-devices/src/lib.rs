//! Per-robot session supervision.
//!
//! This crate is the core of vacfleet. It owns:
//!
//! - **Client contract** ([`client`]): the [`RobotClient`]/[`RobotConnector`]
//!   traits every transport to a robot implements, plus the wire command
//!   request shape.
//! - **Vendor client** ([`local`]): the production implementation speaking a
//!   robot's local MQTT control endpoint.
//! - **Session** ([`session`]): one robot's connection lifecycle and guarded
//!   command dispatch.
//! - **Poll loop** ([`poll`]): the cadenced state/mission query-and-publish
//!   cycle with edge-triggered command-transition logging.
//! - **Fleet supervisor** ([`supervisor`]): one independent task per robot,
//!   with per-robot failure isolation and bus command routing.
//!
//! Failure policy: command dispatch never raises; any client error is
//! logged and collapsed to a sentinel outcome. Query failures inside the
//! poll loop are NOT recovered; they end that robot's loop while every other
//! robot keeps polling.

pub mod client;
pub mod local;
pub mod mock;
pub mod poll;
pub mod session;
pub mod supervisor;

pub use client::{ClientError, ClientResult, CommandRequest, RobotClient, RobotConnector};
pub use local::{LocalConnector, LocalRobotClient, LocalSettings};
pub use poll::{CommandTracker, PollError, PollSettings};
pub use session::{CommandOutcome, Session, SessionSettings, SessionState};
pub use supervisor::FleetSupervisor;
