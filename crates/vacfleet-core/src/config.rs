//! Fleet configuration and credential resolution.
//!
//! The fleet is described by a JSON file listing one entry per robot. The
//! file carries no secrets: each robot names an environment prefix, and the
//! matching `<prefix>BLID` / `<prefix>PASSWD` variables are read exactly once
//! at startup into [`Credentials`]. Business logic never touches the process
//! environment itself.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or resolving the fleet configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read fleet configuration {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON or has the wrong shape
    #[error("Invalid fleet configuration {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A credential environment variable is unset
    #[error("Missing credential variable: {0}")]
    MissingCredential(String),
}

/// A named, pre-configured cleaning region usable with the room-clean command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Region identifier understood by the robot
    pub id: String,
    /// Human-readable label
    pub name: String,
}

/// Static configuration for one robot in the fleet.
///
/// Immutable once loaded; the supervisor owns it for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Unique robot identifier used in logs and command routing
    pub identifier: String,
    /// Network address of the robot's local control endpoint
    pub address: String,
    /// Robot model family (e.g. "roomba", "braava")
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Environment prefix for this robot's credential variables
    pub env_prefix: String,
    /// Pre-configured cleaning regions, in preference order
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

/// Login credentials for a robot's local control endpoint.
///
/// Treated as a secret: the `Debug` impl redacts both fields and nothing in
/// the workspace logs them.
#[derive(Clone)]
pub struct Credentials {
    /// Login identifier (the robot's provisioned blid)
    pub blid: String,
    /// Password paired with the blid
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("blid", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials for the given environment prefix.
    ///
    /// Reads `<prefix>BLID` and `<prefix>PASSWD`. Called once per robot at
    /// startup by [`FleetConfig::provision`].
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let blid_var = format!("{prefix}BLID");
        let passwd_var = format!("{prefix}PASSWD");
        let blid = std::env::var(&blid_var)
            .map_err(|_| ConfigError::MissingCredential(blid_var))?;
        let password = std::env::var(&passwd_var)
            .map_err(|_| ConfigError::MissingCredential(passwd_var))?;
        Ok(Self { blid, password })
    }
}

/// A robot configuration paired with its resolved credentials.
#[derive(Debug, Clone)]
pub struct ProvisionedRobot {
    pub config: RobotConfig,
    pub credentials: Credentials,
}

/// The whole fleet as read from the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Robots to supervise, in startup order
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
}

impl FleetConfig {
    /// Load the fleet configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a fleet configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolve credentials for every robot, preserving configuration order.
    ///
    /// This is the only place in the workspace that reads the process
    /// environment for robot secrets.
    pub fn provision(&self) -> Result<Vec<ProvisionedRobot>, ConfigError> {
        self.robots
            .iter()
            .map(|config| {
                let credentials = Credentials::from_env(&config.env_prefix)?;
                Ok(ProvisionedRobot {
                    config: config.clone(),
                    credentials,
                })
            })
            .collect()
    }
}
