//! Poll cycle behavior: publishing, transition tracking, failure modes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use vacfleet_core::config::{Credentials, RobotConfig};
use vacfleet_core::LastCommand;
use vacfleet_devices::mock::{MockConnector, MockRobotClient, RecordingPublisher};
use vacfleet_devices::poll::{self, CommandTracker, PollError, PollSettings};
use vacfleet_devices::{Session, SessionSettings};

fn kitchen_config() -> RobotConfig {
    RobotConfig {
        identifier: "kitchen".to_string(),
        address: "10.0.0.5".to_string(),
        kind: "roomba".to_string(),
        env_prefix: "KITCHEN_".to_string(),
        favorites: Vec::new(),
    }
}

async fn connected_session(client: Arc<MockRobotClient>) -> Session {
    let connector = MockConnector::new();
    connector.push(client);
    let session = Session::new(
        kitchen_config(),
        Credentials {
            blid: "abc".to_string(),
            password: "xyz".to_string(),
        },
        connector,
        SessionSettings::default(),
    );
    session.connect().await.unwrap();
    session
}

fn kitchen_state() -> serde_json::Value {
    json!({
        "name": "Kitchen",
        "batPct": 80,
        "bbchg3": true,
        "lastCommand": {"command": "clean", "time": 100},
        "cleanMissionStatus": {"cycle": "clean", "phase": "run"}
    })
}

#[tokio::test]
async fn test_cycle_publishes_state_then_mission() {
    let client = MockRobotClient::connected();
    client.set_state(kitchen_state());
    let session = connected_session(client).await;
    let publisher = RecordingPublisher::new();
    let mut tracker = CommandTracker::default();

    poll::run_cycle(&session, publisher.as_ref(), "vacfleet/10.0.0.5", &mut tracker)
        .await
        .unwrap();

    let published = publisher.published();
    assert_eq!(published.len(), 2);

    let (topic, state) = &published[0];
    assert_eq!(topic, "vacfleet/10.0.0.5");
    assert_eq!(state["battery"], json!(80));
    assert_eq!(state["type"], json!("roomba"));
    assert_eq!(state["lastCommand"]["command"], json!("clean"));

    let (topic, mission) = &published[1];
    assert_eq!(topic, "vacfleet/10.0.0.5");
    assert_eq!(mission["phase"], json!("run"));
}

#[tokio::test]
async fn test_marker_updates_once_for_identical_cycles() {
    let client = MockRobotClient::connected();
    client.set_state(kitchen_state());
    let session = connected_session(client.clone()).await;
    let publisher = RecordingPublisher::new();
    let mut tracker = CommandTracker::default();

    // First cycle records the transition
    poll::run_cycle(&session, publisher.as_ref(), "t", &mut tracker)
        .await
        .unwrap();
    assert_eq!(
        tracker.last(),
        &LastCommand {
            command: "clean".to_string(),
            time: 100
        }
    );

    // Unchanged marker across further cycles stays put
    for _ in 0..3 {
        poll::run_cycle(&session, publisher.as_ref(), "t", &mut tracker)
            .await
            .unwrap();
    }
    assert_eq!(tracker.last().time, 100);

    // A new acceptance timestamp moves the marker
    let mut state = kitchen_state();
    state["lastCommand"] = json!({"command": "clean", "time": 160});
    client.set_state(state);
    poll::run_cycle(&session, publisher.as_ref(), "t", &mut tracker)
        .await
        .unwrap();
    assert_eq!(tracker.last().time, 160);

    // Every cycle published both updates regardless
    assert_eq!(publisher.published().len(), 10);
}

#[tokio::test]
async fn test_state_query_failure_ends_loop_before_publishing() {
    let client = MockRobotClient::connected();
    client.set_fail_queries(true);
    let session = Arc::new(connected_session(client).await);
    let publisher = RecordingPublisher::new();

    let result = poll::run(
        session,
        publisher.clone(),
        "t".to_string(),
        PollSettings {
            cadence: Duration::from_millis(10),
        },
    )
    .await;

    assert!(matches!(result, Err(PollError::Query(_))));
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_mission_query_failure_ends_loop_after_state_publish() {
    let client = MockRobotClient::connected();
    let mut state = kitchen_state();
    // A mission block that cannot be a document
    state["cleanMissionStatus"] = json!(5);
    client.set_state(state);
    let session = connected_session(client).await;
    let publisher = RecordingPublisher::new();
    let mut tracker = CommandTracker::default();

    let result = poll::run_cycle(&session, publisher.as_ref(), "t", &mut tracker).await;

    assert!(matches!(result, Err(PollError::Query(_))));
    // The state snapshot went out before the mission query failed
    assert_eq!(publisher.published().len(), 1);
}

#[tokio::test]
async fn test_publish_failure_ends_loop() {
    let client = MockRobotClient::connected();
    client.set_state(kitchen_state());
    let session = connected_session(client).await;
    let publisher = RecordingPublisher::new();
    publisher.set_fail(true);
    let mut tracker = CommandTracker::default();

    let result = poll::run_cycle(&session, publisher.as_ref(), "t", &mut tracker).await;
    assert!(matches!(result, Err(PollError::Publish(_))));
}
