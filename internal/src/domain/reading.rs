const PASCAL_PER_PSI: f64 = 6894.757293168;

/// One temperature/pressure sample, expressed in the units shown on the display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature_f: f64,
    pub pressure_psi: f64,
}

impl SensorReading {
    pub fn new(temperature_f: f64, pressure_psi: f64) -> Self {
        SensorReading {
            temperature_f,
            pressure_psi,
        }
    }

    /// Builds a reading from driver output in degrees Celsius and Pascal.
    pub fn from_metric(temperature_c: f64, pressure_pa: f64) -> Self {
        SensorReading {
            temperature_f: temperature_c * 9.0 / 5.0 + 32.0,
            pressure_psi: pressure_pa / PASCAL_PER_PSI,
        }
    }
}
