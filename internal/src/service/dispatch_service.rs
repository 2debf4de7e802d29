use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::ensure;
use log::{debug, info, warn};
use tokio::{sync::Mutex, task, time::timeout};

use crate::{
    domain::{
        command::ParsedCommand,
        error::DispatchError,
        message::IncomingMessage,
        reading::SensorReading,
        render::{DisplayText, MAX_TEXT_LEN, Outcome, RenderAction, banner_text},
        rule::{select_render, shadowed_by},
    },
    port::{display::DisplayDrivenPort, message::MessageDriverPort, sensor::SensorDrivenPort},
};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(1);

pub struct DispatchService<S: SensorDrivenPort, D: DisplayDrivenPort> {
    sensor: Arc<S>,
    display: Arc<D>,
    gateway_timeout: Duration,
    // held by the blocking clear + cursor + write until it returns, even past a timeout
    render_lock: Arc<Mutex<()>>,
}

impl<S, D> MessageDriverPort for DispatchService<S, D>
where
    S: SensorDrivenPort + Send + Sync + 'static,
    D: DisplayDrivenPort + Send + Sync + 'static,
{
    async fn handle(&self, message: IncomingMessage) -> Result<Outcome, DispatchError> {
        if message.is_empty() {
            info!("{} (null)", message.topic);
            return Ok(Outcome::Ignored);
        }
        info!("{} {}", message.topic, message.payload_lossy());

        let command = ParsedCommand::parse(&message.payload)?;
        Self::log_side_channel(&command);

        let Some((field, matched)) = select_render(&command) else {
            return Ok(Outcome::Logged);
        };
        let skipped = shadowed_by(&command, field);
        if !skipped.is_empty() {
            debug!("Rendering {field}, ignoring {}", skipped.join(", "));
        }

        let text = self.compose(matched?).await?;
        self.render(text).await.map(Outcome::Rendered)
    }
}

impl<S, D> DispatchService<S, D>
where
    S: SensorDrivenPort + Send + Sync + 'static,
    D: DisplayDrivenPort + Send + Sync + 'static,
{
    pub fn new(sensor: Arc<S>, display: Arc<D>, gateway_timeout: Duration) -> Self {
        DispatchService {
            sensor,
            display,
            gateway_timeout,
            render_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads the sensor once and shows the startup banner with that reading.
    pub async fn self_test(&self) -> Result<DisplayText, DispatchError> {
        let reading = self.read_sensor().await?;
        info!(
            "Self-test reading: {:.2} F, {:.3} psi",
            reading.temperature_f, reading.pressure_psi
        );
        self.render(DisplayText::bounded(&banner_text(&reading))).await
    }

    pub async fn read_sensor(&self) -> Result<SensorReading, DispatchError> {
        let sensor = Arc::clone(&self.sensor);
        self.bounded(move || sensor.read(), DispatchError::Sensor).await
    }

    /// Clears the display and writes `text` from the origin, as one unit.
    ///
    /// A render that times out is abandoned: the blocking task stops before
    /// its next bus call and the next render waits until it has returned.
    pub async fn render(&self, text: DisplayText) -> Result<DisplayText, DispatchError> {
        let guard = timeout(self.gateway_timeout, Arc::clone(&self.render_lock).lock_owned())
            .await
            .map_err(|_| DispatchError::Timeout(self.gateway_timeout))?;
        let display = Arc::clone(&self.display);
        let content = text.as_str().to_owned();
        let abandoned = Arc::new(AtomicBool::new(false));
        let stale = Arc::clone(&abandoned);
        let result = self
            .bounded(
                move || {
                    let _guard = guard;
                    display.clear()?;
                    ensure!(!stale.load(Ordering::SeqCst), "render abandoned after timeout");
                    display.set_cursor(0, 0)?;
                    ensure!(!stale.load(Ordering::SeqCst), "render abandoned after timeout");
                    display.write(0, &content)
                },
                DispatchError::Display,
            )
            .await;
        if matches!(result, Err(DispatchError::Timeout(_))) {
            abandoned.store(true, Ordering::SeqCst);
        }
        result.map(|()| text)
    }

    fn log_side_channel(command: &ParsedCommand) {
        for mismatch in &command.mismatches {
            warn!(
                "Ignoring field {}: expected {}, found {}",
                mismatch.field, mismatch.expected, mismatch.found
            );
        }
        if let Some(name) = &command.name {
            info!("Name: {name}");
        }
        if let Some(number) = command.number {
            info!("Number: {number}");
        }
    }

    async fn compose(&self, action: RenderAction) -> Result<DisplayText, DispatchError> {
        let raw = match action {
            RenderAction::Text(text) => {
                info!("Message: {text}");
                text
            }
            RenderAction::Integer(value) => {
                info!("Int Num: {value}");
                value.to_string()
            }
            RenderAction::Task(task) => {
                info!("Reading {}", task.description());
                let reading = self.read_sensor().await?;
                let formatted = task.format(&reading);
                info!("{}", formatted.replace('\n', " |"));
                formatted
            }
        };
        let text = DisplayText::bounded(&raw);
        if text.is_truncated() {
            warn!(
                "Display text truncated from {} to {MAX_TEXT_LEN} characters",
                raw.chars().count()
            );
        }
        Ok(text)
    }

    /// Runs a blocking gateway call off the async workers, bounded by the
    /// configured timeout.
    async fn bounded<T, F>(&self, call: F, to_error: fn(String) -> DispatchError) -> Result<T, DispatchError>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match timeout(self.gateway_timeout, task::spawn_blocking(call)).await {
            Err(_) => Err(DispatchError::Timeout(self.gateway_timeout)),
            Ok(Err(join_error)) => Err(to_error(format!("gateway task failed: {join_error}"))),
            Ok(Ok(result)) => result.map_err(|err| to_error(format!("{err:#}"))),
        }
    }
}
