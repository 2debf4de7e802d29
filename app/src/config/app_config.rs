use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::anyhow;
use serde::Deserialize;

use super::{hardware_config::HardwareConfig, mqtt_config::MqttConfig};

/// Overrides the location of the configuration file.
pub const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG";

#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub hardware: HardwareConfig,
    pub dispatcher: DispatcherConfig,
    pub startup: StartupConfig,
}

impl AppConfig {
    pub fn load(file_name: &str) -> anyhow::Result<AppConfig> {
        let file_path = Self::resolve(file_name);
        let content = fs::read_to_string(&file_path)
            .map_err(|err| anyhow!("Could not read config file {}: {:?}", file_path.display(), err))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<AppConfig> {
        toml::from_str(content).map_err(|err| anyhow!("Could not parse TOML config: {:?}", err))
    }

    fn resolve(file_name: &str) -> PathBuf {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Path::new(env!("CARGO_MANIFEST_DIR")).join(file_name),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DispatcherConfig {
    pub gateway_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            gateway_timeout_ms: 1000,
        }
    }
}

impl DispatcherConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StartupConfig {
    pub self_test: bool,
    pub self_test_pause_secs: u64,
    pub power_off_on_exit: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        StartupConfig {
            self_test: true,
            self_test_pause_secs: 3,
            power_off_on_exit: false,
        }
    }
}

impl StartupConfig {
    pub fn self_test_pause(&self) -> Duration {
        Duration::from_secs(self.self_test_pause_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_load_app_config() {
        let conf = AppConfig::load("config.toml").unwrap();
        assert_eq!(conf.mqtt.topic, "test/topic");
        assert_eq!(conf.hardware.sensor_address, 0x76);
    }

    #[test]
    fn should_fill_missing_sections_with_defaults() {
        let conf = AppConfig::parse("[mqtt]\nhost = \"broker.local\"\n").unwrap();
        assert_eq!(conf.mqtt.host, "broker.local");
        assert_eq!(conf.mqtt.port, 1883);
        assert_eq!(conf.dispatcher.gateway_timeout(), Duration::from_secs(1));
        assert!(conf.startup.self_test);
        assert_eq!(conf.startup.self_test_pause(), Duration::from_secs(3));
        assert_eq!(conf.hardware.display_address, 0x3C);
    }

    #[test]
    fn should_reject_invalid_toml() {
        AppConfig::parse("[mqtt\nport = ").unwrap_err();
    }
}
