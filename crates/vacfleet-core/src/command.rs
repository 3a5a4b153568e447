//! The command vocabulary a robot accepts.

use serde::{Deserialize, Serialize};

/// A command intent addressed to one robot.
///
/// Serialized form matches the bus command envelope, e.g.
/// `{"command": "cleanRoom", "favorite_id": "F1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum RobotCommand {
    /// Start the current mission
    Start,
    /// Run a mapping/training pass
    Train,
    /// Start a full clean
    Clean,
    /// Clean a single pre-configured region
    CleanRoom { favorite_id: String },
    /// Pause the current mission
    Pause,
    /// Stop the current mission
    Stop,
    /// Resume a paused mission
    Resume,
    /// Empty the bin into the dock
    #[serde(rename = "evac")]
    Evacuate,
    /// Return to the dock
    Dock,
}

impl RobotCommand {
    /// The verb as it appears on the wire and in logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Train => "train",
            Self::Clean => "clean",
            Self::CleanRoom { .. } => "cleanRoom",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Resume => "resume",
            Self::Evacuate => "evac",
            Self::Dock => "dock",
        }
    }

    /// All argument-free commands, useful for exercising dispatch paths.
    pub fn simple_commands() -> [RobotCommand; 8] {
        [
            Self::Start,
            Self::Train,
            Self::Clean,
            Self::Pause,
            Self::Stop,
            Self::Resume,
            Self::Evacuate,
            Self::Dock,
        ]
    }
}

impl std::fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs() {
        assert_eq!(RobotCommand::Start.verb(), "start");
        assert_eq!(RobotCommand::Evacuate.verb(), "evac");
        assert_eq!(
            RobotCommand::CleanRoom {
                favorite_id: "F1".to_string()
            }
            .verb(),
            "cleanRoom"
        );
    }

    #[test]
    fn test_envelope_deserialization() {
        let cmd: RobotCommand = serde_json::from_str(r#"{"command": "dock"}"#).unwrap();
        assert_eq!(cmd, RobotCommand::Dock);

        let cmd: RobotCommand =
            serde_json::from_str(r#"{"command": "cleanRoom", "favorite_id": "F1"}"#).unwrap();
        assert_eq!(
            cmd,
            RobotCommand::CleanRoom {
                favorite_id: "F1".to_string()
            }
        );

        let cmd: RobotCommand = serde_json::from_str(r#"{"command": "evac"}"#).unwrap();
        assert_eq!(cmd, RobotCommand::Evacuate);
    }

    #[test]
    fn test_unknown_command_rejected() {
        let result = serde_json::from_str::<RobotCommand>(r#"{"command": "fly"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_matches_verb() {
        for cmd in RobotCommand::simple_commands() {
            assert_eq!(cmd.to_string(), cmd.verb());
        }
    }
}
