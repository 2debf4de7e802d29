use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::bail;
use internal::{
    domain::{error::DispatchError, message::IncomingMessage, reading::SensorReading, render::Outcome},
    port::{display::DisplayDrivenPort, message::MessageDriverPort, sensor::SensorDrivenPort},
    service::dispatch_service::DispatchService,
};

struct CountingSensor {
    reading: SensorReading,
    reads: AtomicUsize,
}

impl SensorDrivenPort for CountingSensor {
    fn read(&self) -> anyhow::Result<SensorReading> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.reading)
    }
}

#[derive(Default)]
struct RecordingDisplay {
    calls: Mutex<Vec<String>>,
    broken: bool,
    first_clear_delay: Mutex<Option<Duration>>,
}

impl RecordingDisplay {
    fn record(&self, call: String) -> anyhow::Result<()> {
        if self.broken {
            bail!("i2c write failed");
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DisplayDrivenPort for RecordingDisplay {
    fn clear(&self) -> anyhow::Result<()> {
        if let Some(delay) = self.first_clear_delay.lock().unwrap().take() {
            std::thread::sleep(delay);
        }
        self.record("clear".into())
    }

    fn set_cursor(&self, x: u8, y: u8) -> anyhow::Result<()> {
        self.record(format!("cursor {x},{y}"))
    }

    fn write(&self, row: u8, text: &str) -> anyhow::Result<()> {
        self.record(format!("write {row} {text}"))
    }

    fn power(&self, on: bool) -> anyhow::Result<()> {
        self.record(format!("power {on}"))
    }
}

fn setup(display: RecordingDisplay) -> (Arc<CountingSensor>, Arc<RecordingDisplay>) {
    let sensor = Arc::new(CountingSensor {
        reading: SensorReading::new(72.5, 14.696),
        reads: AtomicUsize::new(0),
    });
    (sensor, Arc::new(display))
}

fn message(payload: &str) -> IncomingMessage {
    IncomingMessage::new("test/topic", payload)
}

#[tokio::test]
async fn should_handle_a_stream_of_messages_in_order() {
    let (sensor, display) = setup(RecordingDisplay::default());
    let service = DispatchService::new(sensor.clone(), display.clone(), Duration::from_secs(1));

    let payloads = [
        "",
        r#"{"name":"duo","number":1}"#,
        "{not json",
        r#"{"int_msg":42}"#,
        r#"{"task":"get_temperature_pressure"}"#,
        r#"{"task":"unknown"}"#,
        r#"{"string_msg":"bye"}"#,
    ];
    let mut outcomes = Vec::new();
    for payload in payloads {
        outcomes.push(service.handle(message(payload)).await);
    }

    assert_eq!(outcomes[0], Ok(Outcome::Ignored));
    assert_eq!(outcomes[1], Ok(Outcome::Logged));
    assert!(matches!(outcomes[2], Err(DispatchError::Parse(..))));
    assert!(matches!(outcomes[3], Ok(Outcome::Rendered(..))));
    assert!(matches!(outcomes[4], Ok(Outcome::Rendered(..))));
    assert_eq!(outcomes[5], Err(DispatchError::UnsupportedTask("unknown".into())));
    assert!(matches!(outcomes[6], Ok(Outcome::Rendered(..))));

    assert_eq!(sensor.reads.load(Ordering::SeqCst), 1);
    assert_eq!(
        display.calls(),
        vec![
            "clear",
            "cursor 0,0",
            "write 0 42",
            "clear",
            "cursor 0,0",
            "write 0 Temp: 72.50F \n Pres: 14.70 psi",
            "clear",
            "cursor 0,0",
            "write 0 bye",
        ]
    );
}

#[tokio::test]
async fn should_never_touch_display_for_side_channel_fields() {
    let (sensor, display) = setup(RecordingDisplay::default());
    let service = DispatchService::new(sensor.clone(), display.clone(), Duration::from_secs(1));

    for payload in [
        r#"{"name":"a"}"#,
        r#"{"number":9}"#,
        r#"{"name":"b","number":-4,"extra":[1,2]}"#,
        r#"{"int_msg":"not a number"}"#,
        "{}",
    ] {
        assert_eq!(service.handle(message(payload)).await, Ok(Outcome::Logged));
    }
    assert!(display.calls().is_empty());
    assert_eq!(sensor.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn should_keep_going_after_display_failure() {
    let (sensor, display) = setup(RecordingDisplay {
        broken: true,
        ..RecordingDisplay::default()
    });
    let service = DispatchService::new(sensor, display, Duration::from_secs(1));

    let err = service.handle(message(r#"{"string_msg":"x"}"#)).await.unwrap_err();
    assert_eq!(err, DispatchError::Display("i2c write failed".into()));
    assert_eq!(
        service.handle(message(r#"{"name":"still alive"}"#)).await,
        Ok(Outcome::Logged)
    );
}

#[tokio::test]
async fn should_not_let_timed_out_render_overwrite_next_one() {
    let (sensor, display) = setup(RecordingDisplay {
        first_clear_delay: Mutex::new(Some(Duration::from_millis(200))),
        ..RecordingDisplay::default()
    });
    let timeout = Duration::from_millis(150);
    let service = DispatchService::new(sensor, display.clone(), timeout);

    let first = service.handle(message(r#"{"int_msg":1}"#)).await;
    let second = service.handle(message(r#"{"int_msg":2}"#)).await;

    assert_eq!(first, Err(DispatchError::Timeout(timeout)));
    assert!(matches!(second, Ok(Outcome::Rendered(..))));
    assert_eq!(display.calls(), vec!["clear", "clear", "cursor 0,0", "write 0 2"]);
}
