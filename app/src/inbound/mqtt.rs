use std::time::Duration;

use anyhow::{Context, Result};
use internal::{
    domain::{error::DispatchError, render::Outcome},
    port::message::MessageDriverPort,
};
use log::{Level, debug, error, info, log, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Outgoing, Packet, QoS, SubscribeReasonCode};
use tokio::time::{sleep, timeout};

use super::model::delivery::Delivery;
use crate::config::mqtt_config::MqttConfig;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Owns the broker connection and feeds every publish on the subscribed topic
/// to the dispatcher, one at a time and in delivery order.
pub struct MqttConsumer {
    client: AsyncClient,
    event_loop: EventLoop,
    topic: String,
    qos: QoS,
}

impl MqttConsumer {
    pub fn new(client: AsyncClient, event_loop: EventLoop, mqtt_config: &MqttConfig) -> Result<MqttConsumer> {
        Ok(MqttConsumer {
            client,
            event_loop,
            topic: mqtt_config.topic.clone(),
            qos: mqtt_config.qos()?,
        })
    }

    pub async fn subscribe(&self) -> Result<()> {
        self.client
            .subscribe(self.topic.as_str(), self.qos)
            .await
            .with_context(|| format!("Unable to subscribe to {}", self.topic))?;
        info!("Subscribed to {} with {:?}", self.topic, self.qos);
        Ok(())
    }

    /// Polls the connection forever. Connection errors are logged and the
    /// event loop reconnects on the next poll.
    pub async fn run(&mut self, dispatcher: &impl MessageDriverPort) {
        loop {
            match self.event_loop.poll().await {
                Ok(event) => match on_event(event, &self.topic) {
                    Action::Dispatch(delivery) => report(dispatcher.handle(delivery.to_domain()).await),
                    Action::Resubscribe => {
                        if let Err(e) = self.subscribe().await {
                            error!("{e:#}");
                        }
                    }
                    Action::Continue => {}
                },
                Err(e) => {
                    error!("Mqtt connection error: {e}");
                    sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    pub async fn disconnect(mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .context("Unable to request disconnect from mqtt broker")?;
        let drain = async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if timeout(DISCONNECT_GRACE, drain).await.is_err() {
            warn!("Broker did not confirm disconnect within {DISCONNECT_GRACE:?}");
        }
        info!("Disconnected from mqtt broker");
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum Action {
    Dispatch(Delivery),
    Resubscribe,
    Continue,
}

/// Decides what the consumer does with one event from the broker connection.
fn on_event(event: Event, topic: &str) -> Action {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            let delivery = Delivery::from(publish);
            debug!(
                "Delivery on {} ({:?}, retain {})",
                delivery.topic, delivery.qos, delivery.retain
            );
            Action::Dispatch(delivery)
        }
        Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
            info!("Reconnected to mqtt broker");
            Action::Resubscribe
        }
        Event::Incoming(Packet::ConnAck(ack)) => {
            error!("Broker refused connection: {:?}", ack.code);
            Action::Continue
        }
        Event::Incoming(Packet::SubAck(suback)) => {
            if suback
                .return_codes
                .iter()
                .any(|code| matches!(code, SubscribeReasonCode::Failure))
            {
                error!("Broker rejected subscription to {topic}");
            } else {
                debug!("Subscription to {topic} acknowledged");
            }
            Action::Continue
        }
        event => {
            debug!("Ignoring mqtt event {event:?}");
            Action::Continue
        }
    }
}

/// Per-message failures end here: logged, never propagated.
pub fn report(result: Result<Outcome, DispatchError>) {
    let level = severity(&result);
    match result {
        Ok(Outcome::Rendered(text)) => log!(level, "Rendered {:?}", text.as_str()),
        Ok(outcome) => log!(level, "Handled message: {outcome:?}"),
        Err(e) => log!(level, "{e}"),
    }
}

fn severity(result: &Result<Outcome, DispatchError>) -> Level {
    match result {
        Ok(_) => Level::Debug,
        Err(DispatchError::UnsupportedTask(_)) => Level::Warn,
        Err(_) => Level::Error,
    }
}
