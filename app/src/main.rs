mod config;
mod inbound;
mod mqtt_client;
mod outbound;
mod startup;

use std::{io, thread};

use anyhow::{Context, Result};
use config::app_config::AppConfig;
use env_logger::Env;
use inbound::mqtt::MqttConsumer;
use internal::{port::display::DisplayDrivenPort, service::dispatch_service::DispatchService};
use log::{error, info};
use mqtt_client::MqttClient;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let conf = AppConfig::load("config.toml")?;

    let gateways = startup::init_gateways(&conf.hardware)?;
    let service = DispatchService::new(
        gateways.sensor.clone(),
        gateways.display.clone(),
        conf.dispatcher.gateway_timeout(),
    );
    if conf.startup.self_test {
        startup::self_test(&service, conf.startup.self_test_pause()).await?;
    }

    let mqtt = MqttClient {
        client_config: conf.mqtt.clone(),
    };
    let (client, event_loop) = mqtt.connect().await?;
    let mut consumer = MqttConsumer::new(client, event_loop, &conf.mqtt)?;
    consumer.subscribe().await?;

    info!("Press Enter or Ctrl-C to quit...");
    tokio::select! {
        _ = consumer.run(&service) => {}
        _ = shutdown_requested() => info!("Shutting down"),
    }

    consumer.disconnect().await?;
    if conf.startup.power_off_on_exit {
        gateways.display.power(false).context("Unable to power the display off")?;
    }
    Ok(())
}

/// Resolves on Ctrl-C or when a line is entered on the console. A closed
/// stdin (running as a service) only leaves Ctrl-C.
async fn shutdown_requested() {
    // a plain thread so a pending console read never holds up runtime shutdown
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    let console = async {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = interrupt => {}
        _ = console => {}
    }
}
