//! Broker connection: outbound state publishes, inbound command envelopes.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vacfleet_core::{CommandEnvelope, PublishError, RobotCommand, StatePublisher};

use crate::endpoint::Endpoint;

/// Capacity of the inbound command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Bus connection settings.
#[derive(Debug, Clone)]
pub struct BusSettings {
    /// Broker to connect to
    pub endpoint: Endpoint,
    /// Root segment for every topic
    pub topic_root: String,
    /// MQTT keep-alive
    pub keep_alive: Duration,
}

impl BusSettings {
    pub fn new(endpoint: Endpoint, topic_root: impl Into<String>) -> Self {
        Self {
            endpoint,
            topic_root: topic_root.into(),
            keep_alive: Duration::from_secs(60),
        }
    }
}

/// A live broker connection.
///
/// Cloning is cheap; publishes from any number of poll loops interleave
/// safely on the one connection.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    topic_root: String,
}

impl MqttBus {
    /// Connect to the broker and start the transport task.
    ///
    /// Returns the bus plus the stream of decoded command envelopes.
    /// Transport errors after connect are retried internally; the connection
    /// outlives individual broker hiccups.
    pub fn connect(settings: BusSettings) -> (Self, mpsc::Receiver<CommandEnvelope>) {
        let client_id = format!("vacfleet-{}", Uuid::new_v4());
        let mut options =
            MqttOptions::new(client_id, &settings.endpoint.host, settings.endpoint.port);
        options.set_keep_alive(settings.keep_alive);

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let root = settings.topic_root.clone();
        let endpoint = settings.endpoint.clone();
        let subscribe_client = client.clone();
        tokio::spawn(async move {
            let command_filter = format!("{root}/+/cmd");
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(endpoint = %endpoint, "bus connected");
                        if let Err(e) = subscribe_client
                            .subscribe(&command_filter, QoS::AtLeastOnce)
                            .await
                        {
                            warn!("command subscription failed: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        match parse_command(&root, &publish.topic, &publish.payload) {
                            Some(envelope) => {
                                if command_tx.send(envelope).await.is_err() {
                                    debug!("command receiver gone, dropping envelope");
                                }
                            }
                            None => {
                                warn!(topic = %publish.topic, "ignoring unparseable command message");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("bus transport error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        (
            Self {
                client,
                topic_root: settings.topic_root,
            },
            command_rx,
        )
    }

    /// Root segment used for every topic on this bus.
    pub fn topic_root(&self) -> &str {
        &self.topic_root
    }

    /// State topic for one robot.
    pub fn state_topic(&self, address: &str) -> String {
        vacfleet_core::device_topic(&self.topic_root, address)
    }
}

#[async_trait]
impl StatePublisher for MqttBus {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), PublishError> {
        let bytes = serde_json::to_vec(payload)?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

/// Decode a command message into an envelope.
///
/// Expects `<root>/<address>/cmd` with a JSON body naming the command, e.g.
/// `{"command": "dock"}`. Anything else yields `None`.
fn parse_command(root: &str, topic: &str, payload: &[u8]) -> Option<CommandEnvelope> {
    let rest = topic.strip_prefix(root)?.strip_prefix('/')?;
    let address = rest.strip_suffix("/cmd")?;
    if address.is_empty() || address.contains('/') {
        return None;
    }
    let command: RobotCommand = serde_json::from_slice(payload).ok()?;
    Some(CommandEnvelope {
        address: address.to_string(),
        command,
    })
}
