use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use internal::{
    port::{display::DisplayDrivenPort, sensor::SensorDrivenPort},
    service::dispatch_service::DispatchService,
};
use linux_embedded_hal::{Delay, I2cdev};
use log::info;

use crate::{
    config::hardware_config::HardwareConfig,
    outbound::{
        bmp280::{Bmp280, Bmp280Sensor},
        oled::OledDisplay,
    },
};

pub type Sensor = Bmp280Sensor<I2cdev, Delay>;
pub type Display = OledDisplay<I2cdev>;

pub struct Gateways {
    pub sensor: Arc<Sensor>,
    pub display: Arc<Display>,
}

/// Brings the hardware up in order: bus, sensor, display, blank screen.
/// Nothing is returned unless every step succeeded.
pub fn init_gateways(hardware_config: &HardwareConfig) -> Result<Gateways> {
    info!("Opening I2C bus {}", hardware_config.i2c_bus);
    let sensor_bus = open_bus(&hardware_config.i2c_bus)?;
    let display_bus = open_bus(&hardware_config.i2c_bus)?;

    let sensor = Bmp280::init(sensor_bus, Delay, hardware_config.sensor_address)
        .context("Unable to initialize the sensor")?;
    let display = OledDisplay::init(display_bus, hardware_config.display_address)
        .context("Unable to initialize the display")?;
    prepare_display(&display)?;

    Ok(Gateways {
        sensor: Arc::new(Bmp280Sensor::new(sensor)),
        display: Arc::new(display),
    })
}

pub fn prepare_display(display: &impl DisplayDrivenPort) -> Result<()> {
    display.power(true).context("Unable to power the display on")?;
    display.clear().context("Unable to clear the display")?;
    display.set_cursor(0, 0).context("Unable to home the display cursor")
}

/// Shows the banner with a live reading and leaves it up for `pause`.
pub async fn self_test<S, D>(service: &DispatchService<S, D>, pause: Duration) -> Result<()>
where
    S: SensorDrivenPort + Send + Sync + 'static,
    D: DisplayDrivenPort + Send + Sync + 'static,
{
    let banner = service.self_test().await.context("Startup self-test failed")?;
    info!("Self-test shows {:?}, holding it for {pause:?}", banner.as_str());
    tokio::time::sleep(pause).await;
    Ok(())
}

fn open_bus(path: &str) -> Result<I2cdev> {
    I2cdev::new(path).with_context(|| format!("Unable to open I2C bus {path}"))
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use anyhow::anyhow;
    use internal::{
        domain::reading::SensorReading,
        port::{display::DisplayDrivenPort, sensor::SensorDrivenPort},
        service::dispatch_service::DispatchService,
    };
    use mockall::{Sequence, mock, predicate::eq};

    use super::{prepare_display, self_test};
    use crate::config::hardware_config::HardwareConfig;

    mock! {
        pub Display {}
        impl DisplayDrivenPort for Display {
            fn clear(&self) -> anyhow::Result<()>;
            fn set_cursor(&self, x: u8, y: u8) -> anyhow::Result<()>;
            fn write(&self, row: u8, text: &str) -> anyhow::Result<()>;
            fn power(&self, on: bool) -> anyhow::Result<()>;
        }
    }

    mock! {
        pub Sensor {}
        impl SensorDrivenPort for Sensor {
            fn read(&self) -> anyhow::Result<SensorReading>;
        }
    }

    #[test]
    fn should_power_on_then_clear_display() {
        let mut seq = Sequence::new();
        let mut display = MockDisplay::new();
        display
            .expect_power()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        display.expect_clear().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        display
            .expect_set_cursor()
            .with(eq(0), eq(0))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        prepare_display(&display).unwrap();
    }

    #[test]
    fn should_stop_when_display_does_not_power_on() {
        let mut display = MockDisplay::new();
        display.expect_power().returning(|_| Err(anyhow!("nack")));
        display.expect_clear().never();
        let err = prepare_display(&display).unwrap_err();
        assert_eq!(err.to_string(), "Unable to power the display on");
    }

    #[test]
    fn should_fail_on_missing_bus() {
        let conf = HardwareConfig {
            i2c_bus: "/dev/does-not-exist-i2c".into(),
            ..HardwareConfig::default()
        };
        let err = super::init_gateways(&conf).err().unwrap();
        assert!(err.to_string().contains("/dev/does-not-exist-i2c"));
    }

    #[tokio::test]
    async fn should_render_banner_during_self_test() {
        let mut sensor = MockSensor::new();
        sensor
            .expect_read()
            .times(1)
            .returning(|| Ok(SensorReading::new(71.0, 14.2)));
        let mut display = MockDisplay::new();
        display.expect_clear().times(1).returning(|| Ok(()));
        display.expect_set_cursor().times(1).returning(|_, _| Ok(()));
        display
            .expect_write()
            .withf(|row, text| *row == 0 && text.starts_with("Bridge ready"))
            .times(1)
            .returning(|_, _| Ok(()));
        let service = DispatchService::new(Arc::new(sensor), Arc::new(display), Duration::from_secs(1));
        self_test(&service, Duration::ZERO).await.unwrap();
    }

    #[tokio::test]
    async fn should_fail_self_test_when_sensor_fails() {
        let mut sensor = MockSensor::new();
        sensor.expect_read().returning(|| Err(anyhow!("no ack")));
        let service = DispatchService::new(Arc::new(sensor), Arc::new(MockDisplay::new()), Duration::from_secs(1));
        let err = self_test(&service, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.to_string(), "Startup self-test failed");
    }
}
