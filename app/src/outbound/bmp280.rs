use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use internal::{domain::reading::SensorReading, port::sensor::SensorDrivenPort};
use log::{debug, info};

const REG_CALIBRATION: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const SOFT_RESET: u8 = 0xB6;
const STATUS_IM_UPDATE: u8 = 0x01;
// BMP280 engineering samples report 0x56/0x57, BME280 answers 0x60
const CHIP_IDS: [u8; 4] = [0x56, 0x57, 0x58, 0x60];
// temperature x2, pressure x16, normal mode
const CTRL_MEAS_NORMAL: u8 = 0b010_101_11;
// standby 62.5 ms, IIR filter x4
const CONFIG_DEFAULT: u8 = 0b001_010_00;
const NVM_POLL_ATTEMPTS: usize = 50;
// data registers hold this until the first conversion completes
const SKIPPED_SAMPLE: i32 = 0x80000;
const CONVERSION_WAIT_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
}

impl Calibration {
    fn from_registers(raw: &[u8; 24]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Calibration {
            dig_t1: unsigned(0),
            dig_t2: signed(2),
            dig_t3: signed(4),
            dig_p1: unsigned(6),
            dig_p2: signed(8),
            dig_p3: signed(10),
            dig_p4: signed(12),
            dig_p5: signed(14),
            dig_p6: signed(16),
            dig_p7: signed(18),
            dig_p8: signed(20),
            dig_p9: signed(22),
        }
    }

    /// Returns degrees Celsius and the fine temperature the pressure formula needs.
    fn compensate_temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.dig_t1);
        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(self.dig_t2);
        let delta = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = delta * delta * f64::from(self.dig_t3);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Returns Pascal, or `None` when the calibration would divide by zero.
    fn compensate_pressure(&self, adc_p: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.dig_p6) / 32768.0;
        var2 += var1 * f64::from(self.dig_p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.dig_p4) * 65536.0;
        var1 = (f64::from(self.dig_p3) * var1 * var1 / 524288.0 + f64::from(self.dig_p2) * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.dig_p1);
        if var1 == 0.0 {
            return None;
        }
        let mut pressure = 1048576.0 - f64::from(adc_p);
        pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        var1 = f64::from(self.dig_p9) * pressure * pressure / 2147483648.0;
        var2 = pressure * f64::from(self.dig_p8) / 32768.0;
        Some(pressure + (var1 + var2 + f64::from(self.dig_p7)) / 16.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f64,
    pub pressure_pa: f64,
}

/// Blocking BMP280 driver running in normal (free running) mode.
pub struct Bmp280<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    calibration: Calibration,
}

impl<I2C: I2c, D: DelayNs> Bmp280<I2C, D> {
    /// Resets the chip, verifies its id, loads the calibration registers and
    /// starts continuous measurement.
    pub fn init(mut i2c: I2C, mut delay: D, address: u8) -> Result<Self> {
        write_register(&mut i2c, address, REG_RESET, SOFT_RESET).context("Failed to reset sensor")?;
        delay.delay_ms(10);

        let mut ready = false;
        for _ in 0..NVM_POLL_ATTEMPTS {
            if read_register(&mut i2c, address, REG_STATUS)? & STATUS_IM_UPDATE == 0 {
                ready = true;
                break;
            }
            delay.delay_ms(2);
        }
        if !ready {
            bail!("Sensor at 0x{address:02X} never finished copying its calibration data");
        }

        let chip_id = read_register(&mut i2c, address, REG_CHIP_ID)?;
        if !CHIP_IDS.contains(&chip_id) {
            bail!("Unexpected chip id 0x{chip_id:02X} at 0x{address:02X}");
        }

        let mut raw = [0u8; 24];
        i2c.write_read(address, &[REG_CALIBRATION], &mut raw)
            .map_err(|e| anyhow!("Failed to read calibration data: {e:?}"))?;
        let calibration = Calibration::from_registers(&raw);
        debug!("BMP280 calibration: {calibration:?}");

        write_register(&mut i2c, address, REG_CONFIG, CONFIG_DEFAULT).context("Failed to write config register")?;
        write_register(&mut i2c, address, REG_CTRL_MEAS, CTRL_MEAS_NORMAL)
            .context("Failed to write control register")?;
        delay.delay_ms(50);

        info!("BMP280 (chip id 0x{chip_id:02X}) ready at 0x{address:02X}");
        Ok(Bmp280 {
            i2c,
            delay,
            address,
            calibration,
        })
    }

    pub fn measure(&mut self) -> Result<Measurement> {
        let (mut adc_p, mut adc_t) = self.read_raw()?;
        if adc_p == SKIPPED_SAMPLE || adc_t == SKIPPED_SAMPLE {
            debug!("BMP280 has no conversion yet, waiting {CONVERSION_WAIT_MS} ms");
            self.delay.delay_ms(CONVERSION_WAIT_MS);
            (adc_p, adc_t) = self.read_raw()?;
        }
        if adc_p == SKIPPED_SAMPLE || adc_t == SKIPPED_SAMPLE {
            bail!("BMP280 returned a skipped measurement");
        }

        let (temperature_c, t_fine) = self.calibration.compensate_temperature(adc_t);
        let pressure_pa = self
            .calibration
            .compensate_pressure(adc_p, t_fine)
            .ok_or_else(|| anyhow!("Invalid pressure calibration"))?;
        Ok(Measurement {
            temperature_c,
            pressure_pa,
        })
    }

    fn read_raw(&mut self) -> Result<(i32, i32)> {
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_DATA], &mut raw)
            .map_err(|e| anyhow!("Failed to read measurement: {e:?}"))?;
        let adc_p = (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_t = (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);
        Ok((adc_p, adc_t))
    }

    #[cfg(test)]
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

fn read_register<I2C: I2c>(i2c: &mut I2C, address: u8, register: u8) -> Result<u8> {
    let mut value = [0u8; 1];
    i2c.write_read(address, &[register], &mut value)
        .map_err(|e| anyhow!("I2C read of register 0x{register:02X} failed: {e:?}"))?;
    Ok(value[0])
}

fn write_register<I2C: I2c>(i2c: &mut I2C, address: u8, register: u8, value: u8) -> Result<()> {
    i2c.write(address, &[register, value])
        .map_err(|e| anyhow!("I2C write of register 0x{register:02X} failed: {e:?}"))
}

/// Sensor gateway backed by a BMP280.
pub struct Bmp280Sensor<I2C, D> {
    driver: Mutex<Bmp280<I2C, D>>,
}

impl<I2C, D> Bmp280Sensor<I2C, D> {
    pub fn new(driver: Bmp280<I2C, D>) -> Self {
        Bmp280Sensor {
            driver: Mutex::new(driver),
        }
    }
}

impl<I2C, D> SensorDrivenPort for Bmp280Sensor<I2C, D>
where
    I2C: I2c + Send,
    D: DelayNs + Send,
{
    fn read(&self) -> Result<SensorReading> {
        let mut driver = self.driver.lock().map_err(|_| anyhow!("BMP280 driver lock poisoned"))?;
        let measurement = driver.measure()?;
        debug!(
            "BMP280 raw measurement: {:.2} C, {:.1} Pa",
            measurement.temperature_c, measurement.pressure_pa
        );
        Ok(SensorReading::from_metric(
            measurement.temperature_c,
            measurement.pressure_pa,
        ))
    }
}
