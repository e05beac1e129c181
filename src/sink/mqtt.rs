//! # MQTT Sink
//!
//! Publishes through `rumqttc`. The event loop runs in its own tokio task and
//! reconnects on its own; [`Sink::publish`] only places the message in the
//! client's request queue with `try_publish`, so the control loop never waits on
//! the network.
//!
//! The broker holds a retained last-will of `offline` on `<app>/status`. After
//! every (re)connect the sink announces `online` again.

use crate::config::MqttConfig;
use crate::constants::{AVAILABILITY_OFFLINE, AVAILABILITY_ONLINE};
use crate::error::GatewayError;
use crate::logging::{log_debug, log_error, log_info};
use crate::sink::Sink;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use std::time::Duration;

/// Messages buffered between the control loop and the event loop.
const REQUEST_QUEUE_CAPACITY: usize = 256;

/// Pause before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    /// Create the client and spawn its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(config: &MqttConfig, availability_topic: &str) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }
        options.set_last_will(LastWill::new(
            availability_topic,
            AVAILABILITY_OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let announcer = client.clone();
        let topic = availability_topic.to_string();
        let broker = format!("{}:{}", config.host, config.port);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        log_info(&format!("Connected to MQTT broker {broker}"));
                        if let Err(e) =
                            announcer.try_publish(&topic, QoS::AtLeastOnce, true, AVAILABILITY_ONLINE)
                        {
                            log_error(&format!("Cannot announce availability: {e}"));
                        }
                    }
                    Ok(event) => log_debug(&format!("MQTT event: {event:?}")),
                    Err(e) => {
                        log_error(&format!("MQTT connection error: {e}"));
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        MqttSink { client }
    }
}

impl Sink for MqttSink {
    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), GatewayError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retained, payload.as_bytes().to_vec())
            .map_err(|e| GatewayError::Sink(e.to_string()))
    }
}
