//! Scripted client doubles for exercising sessions without a robot.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use vacfleet_core::config::Credentials;
use vacfleet_core::state::{MissionSnapshot, RawState};

use super::client::{ClientError, ClientResult, CommandRequest, RobotClient, RobotConnector};

/// A scripted robot client.
///
/// Behavior is configured up front (state document, failure switches) and
/// every sent command is recorded for inspection.
pub struct MockRobotClient {
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
    state: Mutex<Value>,
    response: Mutex<Value>,
    fail_queries: AtomicBool,
    fail_commands: AtomicBool,
    fail_verbs: Mutex<HashSet<String>>,
    fail_end: AtomicBool,
    ended: AtomicBool,
    sent: Mutex<Vec<CommandRequest>>,
    updates_tx: broadcast::Sender<Value>,
}

impl MockRobotClient {
    /// A client whose connected signal has already fired.
    pub fn connected() -> Arc<Self> {
        let client = Self::disconnected();
        client.mark_connected();
        client
    }

    /// A client that stays unconnected until [`Self::mark_connected`].
    pub fn disconnected() -> Arc<Self> {
        let (connected_tx, connected_rx) = watch::channel(false);
        let (updates_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            connected_tx,
            connected_rx,
            state: Mutex::new(Value::Object(serde_json::Map::new())),
            response: Mutex::new(serde_json::json!({"ok": null})),
            fail_queries: AtomicBool::new(false),
            fail_commands: AtomicBool::new(false),
            fail_verbs: Mutex::new(HashSet::new()),
            fail_end: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            updates_tx,
        })
    }

    /// Fire the connected signal.
    pub fn mark_connected(&self) {
        let _ = self.connected_tx.send(true);
    }

    /// Replace the state document served to queries.
    pub fn set_state(&self, state: Value) {
        *self.state.lock().unwrap() = state;
    }

    /// Replace the response returned by successful sends.
    pub fn set_response(&self, response: Value) {
        *self.response.lock().unwrap() = response;
    }

    /// Make every state/mission query fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::Relaxed);
    }

    /// Make every send fail.
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::Relaxed);
    }

    /// Make sends of one specific verb fail.
    pub fn fail_verb(&self, verb: &str) {
        self.fail_verbs.lock().unwrap().insert(verb.to_string());
    }

    /// Make [`RobotClient::end`] fail.
    pub fn set_fail_end(&self, fail: bool) {
        self.fail_end.store(fail, Ordering::Relaxed);
    }

    /// Every command request sent so far, in order.
    pub fn sent(&self) -> Vec<CommandRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether the handle was released.
    pub fn was_ended(&self) -> bool {
        self.ended.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RobotClient for MockRobotClient {
    async fn wait_connected(&self, timeout: Option<Duration>) -> ClientResult<()> {
        let mut connected = self.connected_rx.clone();
        let wait = connected.wait_for(|up| *up);
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(_)) => Err(ClientError::Closed),
                Err(_) => Err(ClientError::ConnectTimeout(limit)),
            },
            None => wait.await.map(|_| ()).map_err(|_| ClientError::Closed),
        }
    }

    async fn robot_state(&self, _required_fields: &[&str]) -> ClientResult<RawState> {
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(ClientError::Protocol("scripted query failure".to_string()));
        }
        let doc = self.state.lock().unwrap().clone();
        serde_json::from_value(doc).map_err(ClientError::from)
    }

    async fn mission(&self) -> ClientResult<MissionSnapshot> {
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(ClientError::Protocol("scripted query failure".to_string()));
        }
        let doc = self.state.lock().unwrap().clone();
        match doc.get("cleanMissionStatus") {
            Some(status) => serde_json::from_value(status.clone()).map_err(ClientError::from),
            None => Ok(MissionSnapshot::default()),
        }
    }

    async fn send(&self, request: &CommandRequest) -> ClientResult<Value> {
        self.sent.lock().unwrap().push(request.clone());
        let verb_fails = self.fail_verbs.lock().unwrap().contains(&request.command);
        if self.fail_commands.load(Ordering::Relaxed) || verb_fails {
            return Err(ClientError::Protocol(format!(
                "scripted failure for {}",
                request.command
            )));
        }
        Ok(self.response.lock().unwrap().clone())
    }

    fn updates(&self) -> broadcast::Receiver<Value> {
        self.updates_tx.subscribe()
    }

    async fn end(&self) -> ClientResult<()> {
        self.ended.store(true, Ordering::Relaxed);
        let _ = self.connected_tx.send(false);
        if self.fail_end.load(Ordering::Relaxed) {
            return Err(ClientError::Connection("scripted end failure".to_string()));
        }
        Ok(())
    }
}

/// Hands out scripted clients, per address or from a shared queue.
#[derive(Default)]
pub struct MockConnector {
    by_address: Mutex<HashMap<String, VecDeque<Arc<MockRobotClient>>>>,
    queue: Mutex<VecDeque<Arc<MockRobotClient>>>,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a client for the next connect to any address.
    pub fn push(&self, client: Arc<MockRobotClient>) {
        self.queue.lock().unwrap().push_back(client);
    }

    /// Queue a client for the next connect to one address.
    pub fn push_for(&self, address: &str, client: Arc<MockRobotClient>) {
        self.by_address
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(client);
    }

    /// How many connects have been served.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RobotConnector for MockConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
        address: &str,
    ) -> ClientResult<Arc<dyn RobotClient>> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        let scripted = self
            .by_address
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.queue.lock().unwrap().pop_front());
        match scripted {
            Some(client) => Ok(client),
            None => Err(ClientError::Connection(format!(
                "no scripted client for {address}"
            ))),
        }
    }
}

/// Publisher double recording everything handed to it.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Value)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Everything published so far, as (topic, payload) pairs.
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl vacfleet_core::StatePublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: &Value,
    ) -> Result<(), vacfleet_core::PublishError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(vacfleet_core::PublishError::Transport(
                "scripted publish failure".to_string(),
            ));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.clone()));
        Ok(())
    }
}
