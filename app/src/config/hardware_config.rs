use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HardwareConfig {
    pub i2c_bus: String,
    pub sensor_address: u8,
    pub display_address: u8,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            i2c_bus: "/dev/i2c-1".into(),
            sensor_address: 0x76,
            display_address: 0x3C,
        }
    }
}
