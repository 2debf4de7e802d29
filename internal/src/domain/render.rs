use std::fmt;

use crate::domain::{command::Task, reading::SensorReading};

/// Upper bound on the characters handed to the display for one render.
pub const MAX_TEXT_LEN: usize = 199;

pub const BANNER: &str = "Bridge ready";

/// Text that is safe to hand to the display: never longer than its bound,
/// and it remembers whether anything had to be cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText {
    text: String,
    truncated: bool,
}

impl DisplayText {
    pub fn bounded(raw: &str) -> Self {
        Self::bounded_to(raw, MAX_TEXT_LEN)
    }

    /// Keeps at most `max_chars` characters, cutting on a char boundary.
    pub fn bounded_to(raw: &str, max_chars: usize) -> Self {
        match raw.char_indices().nth(max_chars) {
            Some((cut, _)) => DisplayText {
                text: raw[..cut].to_string(),
                truncated: true,
            },
            None => DisplayText {
                text: raw.to_string(),
                truncated: false,
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for DisplayText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What a message asks the display to show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderAction {
    Text(String),
    Integer(i64),
    Task(Task),
}

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Empty payload, nothing was parsed.
    Ignored,
    /// Parsed and logged, the display was left untouched.
    Logged,
    Rendered(DisplayText),
}

pub fn temperature_text(reading: &SensorReading) -> String {
    format!("Temp. is {:.2} F", reading.temperature_f)
}

pub fn pressure_text(reading: &SensorReading) -> String {
    format!("Pres. is {:.3} psi", reading.pressure_psi)
}

pub fn temperature_pressure_text(reading: &SensorReading) -> String {
    format!(
        "Temp: {:.2}F \n Pres: {:.2} psi",
        reading.temperature_f, reading.pressure_psi
    )
}

pub fn banner_text(reading: &SensorReading) -> String {
    format!("{BANNER}\nTemp: {:.2}F", reading.temperature_f)
}
