use std::time::Duration;

use anyhow::{Result, bail};
use rumqttc::QoS;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub topic: String,
    pub qos: u8,
    pub client_id_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".into(),
            port: 1883,
            keep_alive_secs: 60,
            topic: "test/topic".into(),
            qos: 0,
            client_id_prefix: "oled-bridge".into(),
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn qos(&self) -> Result<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => bail!("Invalid MQTT QoS level: {other}"),
        }
    }

    /// A fresh client id per process, the broker never sees the same one twice.
    pub fn client_id(&self) -> String {
        format!("{}-{}", self.client_id_prefix, Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_qos_levels() {
        let mut conf = MqttConfig::default();
        assert_eq!(conf.qos().unwrap(), QoS::AtMostOnce);
        conf.qos = 2;
        assert_eq!(conf.qos().unwrap(), QoS::ExactlyOnce);
        conf.qos = 3;
        conf.qos().unwrap_err();
    }

    #[test]
    fn should_generate_distinct_client_ids() {
        let conf = MqttConfig::default();
        let first = conf.client_id();
        assert!(first.starts_with("oled-bridge-"));
        assert_ne!(first, conf.client_id());
    }
}
