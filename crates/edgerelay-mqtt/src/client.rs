//! rumqttc-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use edgerelay_core::{InboundMessage, Transport, TransportError};

use crate::config::MqttConfig;

/// Consecutive poll errors tolerated before the event loop gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 5;
/// Delay between reconnect attempts after a poll error.
const RETRY_DELAY: Duration = Duration::from_secs(1);
/// Inbound channel depth; dispatch is synchronous so a short buffer is
/// enough to absorb bursts.
const INBOUND_CAPACITY: usize = 64;
/// Largest accepted packet, matching what operators may bundle.
const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// MQTT connection publishing results and feeding inbound messages to one
/// consumer.
pub struct MqttTransport {
    client: AsyncClient,
    event_task: JoinHandle<()>,
}

impl MqttTransport {
    /// Connect to the broker and subscribe to `topic`.
    ///
    /// Returns the transport plus the receiver the owning service drains.
    /// The background event loop renews the subscription every time the
    /// broker acknowledges a connection without session state, so the
    /// subscription survives reconnects.
    pub async fn connect(
        config: &MqttConfig,
        topic: &str,
    ) -> Result<(Self, mpsc::Receiver<InboundMessage>), TransportError> {
        let client_id = config.effective_client_id();
        let mut options = MqttOptions::new(client_id.clone(), config.broker.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(config.clean_session);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, 10);
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);

        let task_client = client.clone();
        let subscribe_topic = topic.to_string();
        let broker_addr = config.full_broker_addr();
        let event_task = tokio::spawn(async move {
            let mut eventloop = eventloop;
            let mut error_count = 0u32;

            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        error_count = 0;
                        let message = InboundMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        debug!(
                            topic = %message.topic,
                            bytes = message.payload.len(),
                            "inbound message"
                        );
                        if tx.send(message).await.is_err() {
                            info!("inbound consumer dropped, stopping event loop");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        error_count = 0;
                        info!(
                            broker = %broker_addr,
                            session_present = ack.session_present,
                            "broker connection acknowledged"
                        );
                        // A session-less acknowledgment means the broker holds
                        // no subscription state for us.
                        if !ack.session_present {
                            match task_client.try_subscribe(&subscribe_topic, QoS::AtLeastOnce) {
                                Ok(()) => info!(topic = %subscribe_topic, "subscribed"),
                                Err(err) => error!(
                                    topic = %subscribe_topic,
                                    error = %err,
                                    "failed to subscribe"
                                ),
                            }
                        }
                    }
                    Ok(_) => {
                        error_count = 0;
                    }
                    Err(err) => {
                        error_count += 1;
                        if error_count >= MAX_CONSECUTIVE_ERRORS {
                            error!(
                                broker = %broker_addr,
                                error = %err,
                                "mqtt error limit reached, stopping event loop"
                            );
                            break;
                        }
                        warn!(
                            broker = %broker_addr,
                            error = %err,
                            attempt = error_count,
                            "mqtt connection error, retrying"
                        );
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        });

        info!(
            broker = %config.full_broker_addr(),
            client_id = %client_id,
            "mqtt transport started"
        );
        Ok((
            Self { client, event_task },
            rx,
        ))
    }

    /// Ask the broker for an orderly disconnect.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.client
            .disconnect()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))
    }

    /// Stop the background event loop.
    pub fn shutdown(&self) {
        self.event_task.abort();
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|err| TransportError::Publish(err.to_string()))
    }
}
