//! Fleet Supervision Example
//!
//! Drives two scripted robots through the supervisor and prints what lands
//! on the bus. No hardware or broker needed.

use std::time::Duration;

use serde_json::json;

use vacfleet_core::config::{Credentials, ProvisionedRobot, RobotConfig};
use vacfleet_devices::mock::{MockConnector, MockRobotClient, RecordingPublisher};
use vacfleet_devices::{FleetSupervisor, PollSettings, SessionSettings};

#[tokio::main]
async fn main() {
    println!("=== vacfleet supervision demo ===\n");

    let connector = MockConnector::new();
    let mut robots = Vec::new();

    for (identifier, address, battery) in
        [("kitchen", "10.0.0.5", 80), ("hallway", "10.0.0.6", 55)]
    {
        let client = MockRobotClient::connected();
        client.set_state(json!({
            "name": identifier,
            "batPct": battery,
            "bbchg3": {},
            "lastCommand": {"command": "clean", "time": 100},
            "cleanMissionStatus": {"cycle": "clean", "phase": "run"}
        }));
        connector.push_for(address, client);

        robots.push(ProvisionedRobot {
            config: RobotConfig {
                identifier: identifier.to_string(),
                address: address.to_string(),
                kind: "roomba".to_string(),
                env_prefix: String::new(),
                favorites: Vec::new(),
            },
            credentials: Credentials {
                blid: "demo".to_string(),
                password: "demo".to_string(),
            },
        });
    }

    let publisher = RecordingPublisher::new();
    let supervisor = FleetSupervisor::new(
        robots,
        connector,
        publisher.clone(),
        "vacfleet",
        SessionSettings::default(),
        PollSettings {
            cadence: Duration::from_millis(200),
        },
    );

    let handles = supervisor.spawn_all();
    tokio::time::sleep(Duration::from_millis(500)).await;
    for handle in handles {
        handle.abort();
    }

    for (topic, payload) in publisher.published() {
        println!("{topic}  {payload}");
    }
}
