use log::{trace, warn};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use solarman_rs::model::MqttConfig;
use solarman_rs::publish::{PublishError, Publisher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 512;

fn match_qos(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Publishes under `<topic><suffix>` through a long-lived broker connection.
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    retain: bool,
    closing: Arc<AtomicBool>,
    event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    pub fn connect(config: &MqttConfig, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(5));

        //parse the mqtt authentication options
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.clone().unwrap_or_default());
        }

        let (client, mut event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        let closing = Arc::new(AtomicBool::new(false));
        let flag = closing.clone();

        // keep polling the event loop so queued messages get sent; rumqttc reconnects on the
        // next poll after an error
        let event_loop = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(event) => trace!("mqtt event: {:?}", event),
                    Err(_) if flag.load(Ordering::Relaxed) => break,
                    Err(e) => {
                        warn!("mqtt connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        MqttPublisher {
            client,
            topic: config.topic.trim_end_matches('/').to_owned(),
            qos: match_qos(config.qos),
            retain: config.retain,
            closing,
            event_loop,
        }
    }

    /// Disconnect and give the event loop a moment to flush.
    pub async fn close(self) {
        let MqttPublisher {
            client,
            closing,
            event_loop,
            ..
        } = self;

        closing.store(true, Ordering::Relaxed);
        if let Err(e) = client.disconnect().await {
            warn!("mqtt disconnect failed: {}", e);
        }
        drop(client);
        if tokio::time::timeout(Duration::from_secs(5), event_loop)
            .await
            .is_err()
        {
            warn!("mqtt event loop did not stop in time");
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, suffix: &str, payload: &str) -> Result<(), PublishError> {
        let topic = format!("{}{}", self.topic, suffix);
        trace!("Publishing to {} with payload {}", topic, payload);
        self.client
            .try_publish(topic.as_str(), self.qos, self.retain, payload.as_bytes().to_vec())
            .map_err(|e| PublishError {
                topic,
                reason: e.to_string(),
            })
    }
}
