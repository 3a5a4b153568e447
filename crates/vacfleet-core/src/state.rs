//! Robot telemetry: raw wire state and the normalized published snapshots.
//!
//! [`RawState`] mirrors the shape a robot reports on its local protocol.
//! Robots routinely report more fields than a query asked for, so anything
//! not modeled explicitly lands in `extra`. The published projections
//! ([`RobotStateSnapshot`], [`MissionSnapshot`]) are derived fresh each poll
//! cycle and never mutated in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The robot's record of the most recent command it accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCommand {
    /// Command verb, empty until the robot has accepted one
    #[serde(default)]
    pub command: String,
    /// Robot-side timestamp of acceptance
    #[serde(default)]
    pub time: i64,
}

/// Dock information as reported by the robot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockState {
    /// Whether the robot knows where its dock is
    #[serde(default)]
    pub known: bool,
}

/// Raw telemetry as reported by a robot.
///
/// A state query names required fields; the reply may carry arbitrarily more.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawState {
    /// Robot-assigned name
    pub name: String,
    /// Battery charge percentage
    pub bat_pct: Option<u8>,
    /// Whether the robot considers itself online
    pub connected: Option<bool>,
    /// Detected mop pad type, if any
    pub detected_pad: Option<String>,
    /// Dock information
    pub dock: DockState,
    /// Mop tank fill level
    pub tank_lvl: Option<u8>,
    /// Half-charge cycle counters
    pub bbchg3: Option<Value>,
    /// Run statistics
    pub bbrun: Option<Value>,
    /// Bin presence/fullness
    pub bin: Option<Value>,
    /// Most recent accepted command
    pub last_command: LastCommand,
    /// Mission status block
    pub clean_mission_status: Option<Value>,
    /// Mop readiness flags
    pub mop_ready: Option<Value>,
    /// Pad wetness configuration
    pub pad_wetness: Option<Value>,
    /// Everything else the robot reported
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Normalized state published on the bus, one per poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotStateSnapshot {
    /// Robot model family from the fleet configuration
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub battery: Option<u8>,
    pub connected: Option<bool>,
    pub detected_pad: Option<String>,
    pub dock_known: bool,
    pub tank_level: Option<u8>,
    pub bbchg3: Option<Value>,
    pub bbrun: Option<Value>,
    pub bin: Option<Value>,
    pub last_command: LastCommand,
    pub clean_mission_status: Option<Value>,
    pub mop_ready: Option<Value>,
    pub pad_wetness: Option<Value>,
}

impl RobotStateSnapshot {
    /// Project raw telemetry into the published shape.
    pub fn from_raw(kind: &str, raw: &RawState) -> Self {
        Self {
            kind: kind.to_string(),
            name: raw.name.clone(),
            battery: raw.bat_pct,
            connected: raw.connected,
            detected_pad: raw.detected_pad.clone(),
            dock_known: raw.dock.known,
            tank_level: raw.tank_lvl,
            bbchg3: raw.bbchg3.clone(),
            bbrun: raw.bbrun.clone(),
            bin: raw.bin.clone(),
            last_command: raw.last_command.clone(),
            clean_mission_status: raw.clean_mission_status.clone(),
            mop_ready: raw.mop_ready.clone(),
            pad_wetness: raw.pad_wetness.clone(),
        }
    }
}

/// Mission status published as a second update each poll cycle.
///
/// Consumers receive this immediately after the state snapshot; the two are
/// deliberately separate partial updates, not one atomic document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionSnapshot {
    /// Mission cycle (e.g. "clean", "spot", "none")
    pub cycle: Option<String>,
    /// Mission phase (e.g. "run", "charge", "stuck")
    pub phase: Option<String>,
    /// Robot error code, zero when healthy
    pub error: Option<i64>,
    /// Not-ready code, zero when the robot can start
    pub not_ready: Option<i64>,
    /// Remaining mission fields, passed through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
