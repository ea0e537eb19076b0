//! MQTT transport over `rumqttc`.
//!
//! `rumqttc` splits a connection into a cloneable [`AsyncClient`] that
//! queues requests and an [`EventLoop`] that does all network I/O. They map
//! directly onto [`Transport`] and [`TransportStream`]. Nothing reaches the
//! broker unless the event loop is polled, which the topic bus does.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::infrastructure::config::transport::MqttConfig;
use crate::port::outbound::transport::{
    PublishOptions, QoS, Transport, TransportEvent, TransportStream,
};

/// Request side of the broker connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

/// Event side of the broker connection.
pub struct MqttEventStream {
    eventloop: EventLoop,
}

/// Build the client/event-loop pair. No I/O happens until the stream is
/// polled.
#[must_use]
pub fn connect(config: &MqttConfig) -> (MqttTransport, MqttEventStream) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(config.clean_session);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    let (client, eventloop) = AsyncClient::new(options, config.request_capacity.max(1));
    info!(host = %config.host, port = config.port, client_id = %config.client_id, "MQTT client created");
    (MqttTransport { client }, MqttEventStream { eventloop })
}

fn to_mqtt(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn client_error(err: rumqttc::ClientError) -> TransportError {
    TransportError::Client(err.to_string())
}

#[async_trait]
impl Transport for MqttTransport {
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<()> {
        self.client
            .subscribe(filter, to_mqtt(qos))
            .await
            .map_err(client_error)?;
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.client.unsubscribe(filter).await.map_err(client_error)?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()> {
        self.client
            .publish(topic, to_mqtt(options.qos), options.retain, payload)
            .await
            .map_err(client_error)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

#[async_trait]
impl TransportStream for MqttEventStream {
    async fn connect(&mut self) -> Result<()> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        debug!(session_present = ack.session_present, "MQTT ConnAck");
                        return Ok(());
                    }
                    return Err(TransportError::Refused(format!("{:?}", ack.code)).into());
                }
                Ok(event) => trace!(?event, "MQTT event before ConnAck"),
                Err(err) => return Err(TransportError::Client(err.to_string()).into()),
            }
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Some(TransportEvent::Connected),
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    return Some(TransportEvent::Disconnected {
                        reason: "broker sent DISCONNECT".to_string(),
                    });
                }
                Ok(_) => {}
                Err(err) => {
                    return Some(TransportEvent::Disconnected {
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}
