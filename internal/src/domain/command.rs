use serde_json::{Map, Value};

use crate::domain::{
    error::DispatchError,
    reading::SensorReading,
    render::{pressure_text, temperature_pressure_text, temperature_text},
};

pub const NAME: &str = "name";
pub const NUMBER: &str = "number";
pub const STRING_MSG: &str = "string_msg";
pub const INT_MSG: &str = "int_msg";
pub const TASK: &str = "task";

/// Sensor queries a message can request through its `task` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Temperature,
    Pressure,
    TemperaturePressure,
}

impl Task {
    pub fn from_name(raw: &str) -> Option<Task> {
        match raw {
            "get_temperature" => Some(Task::Temperature),
            "get_pressure" => Some(Task::Pressure),
            "get_temperature_pressure" => Some(Task::TemperaturePressure),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Temperature => "get_temperature",
            Task::Pressure => "get_pressure",
            Task::TemperaturePressure => "get_temperature_pressure",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Task::Temperature => "temperature",
            Task::Pressure => "pressure",
            Task::TemperaturePressure => "temperature and pressure",
        }
    }

    /// Formats a single reading the way this task shows it on the display.
    pub fn format(&self, reading: &SensorReading) -> String {
        match self {
            Task::Temperature => temperature_text(reading),
            Task::Pressure => pressure_text(reading),
            Task::TemperaturePressure => temperature_pressure_text(reading),
        }
    }
}

/// A recognized field that was present with the wrong JSON type. Such a field
/// is treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: &'static str,
    pub found: &'static str,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedCommand {
    pub name: Option<String>,
    pub number: Option<i64>,
    pub string_msg: Option<String>,
    pub int_msg: Option<i64>,
    pub task: Option<String>,
    pub mismatches: Vec<FieldMismatch>,
}

impl ParsedCommand {
    /// Decodes a payload that must hold a JSON object. Unknown fields are
    /// ignored and every recognized field is type checked on its own.
    pub fn parse(payload: &[u8]) -> Result<ParsedCommand, DispatchError> {
        let root: Value = serde_json::from_slice(payload).map_err(|e| DispatchError::Parse(e.to_string()))?;
        let Value::Object(fields) = root else {
            return Err(DispatchError::Parse(format!(
                "expected a JSON object, found {}",
                json_type(&root)
            )));
        };

        let mut mismatches = Vec::new();
        Ok(ParsedCommand {
            name: string_field(&fields, NAME, &mut mismatches),
            number: integer_field(&fields, NUMBER, &mut mismatches),
            string_msg: string_field(&fields, STRING_MSG, &mut mismatches),
            int_msg: integer_field(&fields, INT_MSG, &mut mismatches),
            task: string_field(&fields, TASK, &mut mismatches),
            mismatches,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.number.is_none()
            && self.string_msg.is_none()
            && self.int_msg.is_none()
            && self.task.is_none()
    }
}

fn string_field(
    fields: &Map<String, Value>, key: &'static str, mismatches: &mut Vec<FieldMismatch>,
) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) => Some(value.clone()),
        other => {
            mismatches.push(FieldMismatch {
                field: key,
                expected: "string",
                found: json_type(other),
            });
            None
        }
    }
}

fn integer_field(fields: &Map<String, Value>, key: &'static str, mismatches: &mut Vec<FieldMismatch>) -> Option<i64> {
    let value = fields.get(key)?;
    let integer = match value {
        Value::Number(number) => number.as_i64(),
        _ => None,
    };
    if integer.is_none() {
        let found = match value {
            Value::Number(number) if number.is_u64() => "out of range integer",
            other => json_type(other),
        };
        mismatches.push(FieldMismatch {
            field: key,
            expected: "integer",
            found,
        });
    }
    integer
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "floating point number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
