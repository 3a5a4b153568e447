//! Session lifecycle and command dispatch behavior.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use vacfleet_core::config::{Credentials, RobotConfig};
use vacfleet_core::RobotCommand;
use vacfleet_devices::mock::{MockConnector, MockRobotClient, RecordingPublisher};
use vacfleet_devices::poll::CommandTracker;
use vacfleet_devices::{poll, ClientError, Session, SessionSettings, SessionState};

fn config(identifier: &str, address: &str) -> RobotConfig {
    RobotConfig {
        identifier: identifier.to_string(),
        address: address.to_string(),
        kind: "roomba".to_string(),
        env_prefix: String::new(),
        favorites: Vec::new(),
    }
}

fn credentials() -> Credentials {
    Credentials {
        blid: "blid".to_string(),
        password: "passwd".to_string(),
    }
}

/// A session wired to the given scripted client, not yet connected.
fn session_with(client: Arc<MockRobotClient>) -> Session {
    let connector = MockConnector::new();
    connector.push(client);
    Session::new(
        config("kitchen", "10.0.0.5"),
        credentials(),
        connector,
        SessionSettings::default(),
    )
}

fn all_commands() -> Vec<RobotCommand> {
    let mut commands = RobotCommand::simple_commands().to_vec();
    commands.push(RobotCommand::CleanRoom {
        favorite_id: "F1".to_string(),
    });
    commands
}

#[tokio::test]
async fn test_every_command_collapses_failure_to_sentinel() {
    let client = MockRobotClient::connected();
    client.set_fail_commands(true);
    let session = session_with(client);
    session.connect().await.unwrap();

    for command in all_commands() {
        let outcome = session.execute(&command).await;
        assert!(outcome.is_failed(), "{command} should fail to the sentinel");
    }
}

#[tokio::test]
async fn test_successful_command_returns_response_verbatim() {
    let client = MockRobotClient::connected();
    client.set_response(json!({"ok": null, "id": 7}));
    let session = session_with(client);
    session.connect().await.unwrap();

    let outcome = session.execute(&RobotCommand::Start).await;
    assert_eq!(outcome.response(), Some(&json!({"ok": null, "id": 7})));
}

#[tokio::test]
async fn test_dock_pauses_first() {
    let client = MockRobotClient::connected();
    let session = session_with(client.clone());
    session.connect().await.unwrap();

    let outcome = session.execute(&RobotCommand::Dock).await;
    assert!(!outcome.is_failed());

    let verbs: Vec<String> = client.sent().iter().map(|r| r.command.clone()).collect();
    assert_eq!(verbs, vec!["pause", "dock"]);
}

#[tokio::test]
async fn test_dock_proceeds_when_pause_fails() {
    let client = MockRobotClient::connected();
    client.fail_verb("pause");
    let session = session_with(client.clone());
    session.connect().await.unwrap();

    let outcome = session.execute(&RobotCommand::Dock).await;
    assert!(!outcome.is_failed());

    let verbs: Vec<String> = client.sent().iter().map(|r| r.command.clone()).collect();
    assert_eq!(verbs, vec!["pause", "dock"]);
}

#[tokio::test]
async fn test_command_before_connect_is_sentinel() {
    let session = session_with(MockRobotClient::connected());

    let outcome = session.execute(&RobotCommand::Start).await;
    assert!(outcome.is_failed());
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn test_connect_waits_for_connected_signal() {
    let client = MockRobotClient::disconnected();
    let session = Arc::new(session_with(client.clone()));

    let connecting = {
        let session = session.clone();
        tokio::spawn(async move { session.connect().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!connecting.is_finished());
    assert_eq!(session.state().await, SessionState::Connecting);

    client.mark_connected();
    connecting.await.unwrap().unwrap();
    assert_eq!(session.state().await, SessionState::Connected);
}

#[tokio::test]
async fn test_bounded_connect_times_out() {
    let connector = MockConnector::new();
    connector.push(MockRobotClient::disconnected());
    let session = Session::new(
        config("kitchen", "10.0.0.5"),
        credentials(),
        connector,
        SessionSettings {
            connect_timeout: Some(Duration::from_millis(50)),
        },
    );

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectTimeout(_)));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_supersedes_previous_handle() {
    let first = MockRobotClient::connected();
    let second = MockRobotClient::connected();
    let connector = MockConnector::new();
    connector.push(first.clone());
    connector.push(second.clone());

    let session = Session::new(
        config("kitchen", "10.0.0.5"),
        credentials(),
        connector.clone(),
        SessionSettings::default(),
    );

    session.connect().await.unwrap();
    assert!(!first.was_ended());

    session.connect().await.unwrap();
    assert!(first.was_ended());
    assert!(!second.was_ended());
    assert_eq!(connector.connect_count(), 2);

    // Commands now go to the fresh handle
    session.execute(&RobotCommand::Start).await;
    assert!(first.sent().is_empty());
    assert_eq!(second.sent().len(), 1);
}

#[tokio::test]
async fn test_disconnect_is_best_effort() {
    let client = MockRobotClient::connected();
    client.set_fail_end(true);
    let session = session_with(client.clone());
    session.connect().await.unwrap();

    // A failing release still completes the disconnect
    session.disconnect().await;
    assert!(client.was_ended());
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn test_command_failure_leaves_polling_intact() {
    let client = MockRobotClient::connected();
    client.set_fail_commands(true);
    client.set_state(json!({
        "batPct": 55,
        "bbchg3": {},
        "lastCommand": {"command": "none", "time": 1},
        "cleanMissionStatus": {"phase": "charge"}
    }));
    let session = session_with(client);
    session.connect().await.unwrap();

    let outcome = session
        .execute(&RobotCommand::CleanRoom {
            favorite_id: "F1".to_string(),
        })
        .await;
    assert!(outcome.is_failed());

    // The next scheduled cycle still runs and publishes
    let publisher = RecordingPublisher::new();
    let mut tracker = CommandTracker::default();
    poll::run_cycle(&session, publisher.as_ref(), "vacfleet/10.0.0.5", &mut tracker)
        .await
        .unwrap();
    assert_eq!(publisher.published().len(), 2);
}
