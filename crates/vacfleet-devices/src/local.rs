//! Client for a robot's local MQTT control endpoint.
//!
//! The robots in scope expose a broker on their own address: the controller
//! connects with the provisioned blid/password pair, the robot pushes state
//! deltas as retained-shadow documents, and commands are published to the
//! `cmd` topic as small JSON requests. The client keeps a merged state
//! document so a state query can wait until the fields it needs have been
//! reported.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use serde_json::Value;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, warn};

use vacfleet_core::config::Credentials;
use vacfleet_core::state::{MissionSnapshot, RawState};

use super::client::{ClientError, ClientResult, CommandRequest, RobotClient, RobotConnector};

/// Topic the robot accepts command requests on.
const COMMAND_TOPIC: &str = "cmd";

/// Transport settings shared by every robot in the fleet.
#[derive(Debug, Clone)]
pub struct LocalSettings {
    /// Control endpoint port
    pub port: u16,
    /// CA certificate for the robot's TLS listener; plain TCP when unset
    pub ca_cert: Option<PathBuf>,
    /// MQTT keep-alive
    pub keep_alive: Duration,
    /// How often a state query re-checks for its required fields
    pub probe: Duration,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            port: 8883,
            ca_cert: None,
            keep_alive: Duration::from_secs(60),
            probe: Duration::from_millis(100),
        }
    }
}

/// Connector producing [`LocalRobotClient`] handles.
#[derive(Debug, Clone, Default)]
pub struct LocalConnector {
    settings: LocalSettings,
}

impl LocalConnector {
    pub fn new(settings: LocalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl RobotConnector for LocalConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
        address: &str,
    ) -> ClientResult<Arc<dyn RobotClient>> {
        let client = LocalRobotClient::dial(credentials, address, &self.settings)?;
        Ok(Arc::new(client))
    }
}

/// Live connection to one robot's control endpoint.
pub struct LocalRobotClient {
    client: AsyncClient,
    connected: watch::Receiver<bool>,
    doc: Arc<RwLock<Value>>,
    updates: broadcast::Sender<Value>,
    running: Arc<AtomicBool>,
    probe: Duration,
}

impl LocalRobotClient {
    /// Open a connection and start the transport task.
    ///
    /// The returned handle is not yet connected; await
    /// [`RobotClient::wait_connected`] before querying.
    pub fn dial(
        credentials: &Credentials,
        address: &str,
        settings: &LocalSettings,
    ) -> ClientResult<Self> {
        let mut options = MqttOptions::new(&credentials.blid, address, settings.port);
        options.set_credentials(&credentials.blid, &credentials.password);
        options.set_keep_alive(settings.keep_alive);

        if let Some(ca_path) = &settings.ca_cert {
            let ca = std::fs::read(ca_path).map_err(|e| {
                ClientError::Connection(format!("reading CA certificate {}: {e}", ca_path.display()))
            })?;
            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }));
        }

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        let (connected_tx, connected_rx) = watch::channel(false);
        let (updates_tx, _) = broadcast::channel(64);
        let doc = Arc::new(RwLock::new(Value::Object(serde_json::Map::new())));
        let running = Arc::new(AtomicBool::new(true));

        let task_doc = doc.clone();
        let task_updates = updates_tx.clone();
        let task_running = running.clone();
        let robot = address.to_string();
        tokio::spawn(async move {
            while task_running.load(Ordering::Relaxed) {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!(robot = %robot, "control endpoint connected");
                        let _ = connected_tx.send(true);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        match serde_json::from_slice::<Value>(&publish.payload) {
                            Ok(delta) => {
                                {
                                    let mut doc = task_doc.write().await;
                                    merge_reported(&mut doc, &delta);
                                }
                                let _ = task_updates.send(delta);
                            }
                            Err(e) => {
                                debug!(robot = %robot, topic = %publish.topic, "unparseable state delta: {e}");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = connected_tx.send(false);
                        if !task_running.load(Ordering::Relaxed) {
                            break;
                        }
                        warn!(robot = %robot, "control endpoint transport error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
            debug!(robot = %robot, "control endpoint task ended");
        });

        Ok(Self {
            client,
            connected: connected_rx,
            doc,
            updates: updates_tx,
            running,
            probe: settings.probe,
        })
    }
}

#[async_trait]
impl RobotClient for LocalRobotClient {
    async fn wait_connected(&self, timeout: Option<Duration>) -> ClientResult<()> {
        let mut connected = self.connected.clone();
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

    async fn robot_state(&self, required_fields: &[&str]) -> ClientResult<RawState> {
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return Err(ClientError::Closed);
            }
            {
                let doc = self.doc.read().await;
                if has_fields(&doc, required_fields) {
                    return serde_json::from_value(doc.clone()).map_err(ClientError::from);
                }
            }
            tokio::time::sleep(self.probe).await;
        }
    }

    async fn mission(&self) -> ClientResult<MissionSnapshot> {
        let raw = self.robot_state(&["cleanMissionStatus"]).await?;
        mission_from_state(&raw)
    }

    async fn send(&self, request: &CommandRequest) -> ClientResult<Value> {
        let payload = serde_json::to_vec(request)?;
        self.client
            .publish(COMMAND_TOPIC, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        // The endpoint acknowledges at the transport level only
        Ok(Value::Null)
    }

    fn updates(&self) -> broadcast::Receiver<Value> {
        self.updates.subscribe()
    }

    async fn end(&self) -> ClientResult<()> {
        self.running.store(false, Ordering::Relaxed);
        self.client
            .disconnect()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }
}

/// Merge a state delta into the retained document.
///
/// Robots wrap deltas as `{"state": {"reported": {...}}}`; bare objects are
/// merged as-is. Merging is per top-level key, replacement not deep-merge,
/// matching how the robots re-report whole sub-documents.
fn merge_reported(doc: &mut Value, delta: &Value) {
    let reported = delta
        .get("state")
        .and_then(|s| s.get("reported"))
        .unwrap_or(delta);
    let (Some(target), Some(fields)) = (doc.as_object_mut(), reported.as_object()) else {
        return;
    };
    for (key, value) in fields {
        target.insert(key.clone(), value.clone());
    }
}

fn has_fields(doc: &Value, required: &[&str]) -> bool {
    required.iter().all(|field| doc.get(field).is_some())
}

fn mission_from_state(raw: &RawState) -> ClientResult<MissionSnapshot> {
    match &raw.clean_mission_status {
        Some(status) => serde_json::from_value(status.clone()).map_err(ClientError::from),
        None => Ok(MissionSnapshot::default()),
    }
}
