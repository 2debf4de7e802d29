use anyhow::{Context, Result, bail};
use log::{debug, info};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet};

use crate::config::mqtt_config::MqttConfig;

const REQUEST_CHANNEL_CAPACITY: usize = 16;

pub struct MqttClient {
    pub client_config: MqttConfig,
}

impl MqttClient {
    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.client_config.client_id(),
            self.client_config.host.as_str(),
            self.client_config.port,
        );
        options
            .set_keep_alive(self.client_config.keep_alive())
            .set_clean_session(true);
        options
    }

    /// Opens the broker connection and waits for its ConnAck. Any failure here
    /// is fatal to the caller.
    pub async fn connect(&self) -> Result<(AsyncClient, EventLoop)> {
        let options = self.options();
        info!(
            "Connecting to mqtt broker {}:{} as {}",
            self.client_config.host,
            self.client_config.port,
            options.client_id()
        );
        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        loop {
            match event_loop.poll().await.context("Cannot connect to mqtt broker")? {
                Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                    info!("Connected to mqtt broker");
                    return Ok((client, event_loop));
                }
                Event::Incoming(Packet::ConnAck(ack)) => bail!("Broker refused connection: {:?}", ack.code),
                event => debug!("Ignoring event before ConnAck: {event:?}"),
            }
        }
    }
}
