use std::time::Duration;

use thiserror::Error;

/// Failures raised while handling a single message. None of them is fatal: the
/// caller logs the error, drops the message and waits for the next one.
#[derive(Error, Debug, PartialEq)]
pub enum DispatchError {
    #[error("Unable to parse payload: {0}")]
    Parse(String),
    #[error("Unsupported task: {0}")]
    UnsupportedTask(String),
    #[error("Sensor failure: {0}")]
    Sensor(String),
    #[error("Display failure: {0}")]
    Display(String),
    #[error("Gateway call did not complete within {0:?}")]
    Timeout(Duration),
}
