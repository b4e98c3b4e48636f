//! TempLab headless CLI
//!
//! Runs a measurement from the terminal: connect to the logger, wait for
//! the hello, stream samples to stdout via the log output, stop on
//! duration or Ctrl-C.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use templab::{
    config::AppConfig,
    display::{sensor_label, SeriesBuffer},
    session::{connect_with_handshake, event_channel, MeasurementSession, SessionEvent},
    transport::{self, SerialManager, SerialTransport},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "templab")]
#[command(about = "Serial temperature measurement engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports that look like measurement devices
    ListPorts,

    /// Run a measurement and print samples as they arrive
    Run {
        /// Serial port to connect to (e.g. /dev/ttyUSB0 or COM3)
        #[arg(long)]
        port: String,

        /// Measurement duration in seconds (overrides config)
        #[arg(long)]
        duration: Option<f64>,

        /// Baud rate (overrides config)
        #[arg(long)]
        baud: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,templab=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ListPorts => {
            let ports = transport::list_ports();
            if ports.is_empty() {
                println!("No serial ports found");
            } else {
                for port in ports {
                    println!("{}", port);
                }
            }
            Ok(())
        }
        Commands::Run {
            port,
            duration,
            baud,
        } => {
            let mut config = AppConfig::load_or_default();
            if let Some(duration_s) = duration {
                config.measurement.duration_s = duration_s;
            }
            if let Some(baud_rate) = baud {
                config.serial.baud_rate = baud_rate;
            }
            run_measurement(&port, config)
        }
    }
}

fn run_measurement(port: &str, config: AppConfig) -> anyhow::Result<()> {
    let transport: Arc<dyn SerialTransport> =
        Arc::new(SerialManager::new(config.serial.baud_rate));

    tracing::info!("Connecting to {} at {} baud", port, config.serial.baud_rate);
    connect_with_handshake(
        &transport,
        port,
        Duration::from_millis(config.serial.handshake_timeout_ms),
    )?;
    tracing::info!("Device ready");

    let (tx, rx) = event_channel();
    let session = MeasurementSession::new(transport.clone(), config.measurement, tx);
    transport.set_line_callback(session.line_callback());

    let ctrlc_session = session.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Interrupted, stopping measurement");
        let _ = ctrlc_session.stop();
    })?;

    session.start()?;

    let mut buffer = SeriesBuffer::new(config.display.time_window_s);
    let mut sample_count: u64 = 0;

    for event in rx {
        match event {
            SessionEvent::Sample(sample) => {
                sample_count += 1;
                let readings: Vec<String> = sample
                    .values
                    .iter()
                    .map(|(key, value)| format!("{}={:.2}", sensor_label(key), value))
                    .collect();
                println!("t={:8.3}s  {}", sample.time_s, readings.join("  "));
                buffer.push_sample(&sample);
            }
            SessionEvent::Progress(fraction) => {
                tracing::debug!("Progress {:.0}%", fraction * 100.0);
            }
            SessionEvent::DeviceAck { cmd } => {
                tracing::debug!("Device ack: {:?}", cmd);
            }
            SessionEvent::DeviceError { message } => {
                tracing::error!("Device error: {}", message.unwrap_or_default());
            }
            SessionEvent::DataStall { silent_for_s } => {
                tracing::warn!("No data from device for {:.1}s", silent_for_s);
            }
            SessionEvent::Finished => break,
        }
    }

    transport.clear_line_callback();
    transport.close();

    if let Some((min, max)) = buffer.y_range() {
        tracing::info!(
            "Measurement complete: {} sample(s), {} series, y range {:.2}..{:.2}",
            sample_count,
            buffer.keys().count(),
            min,
            max
        );
    } else {
        tracing::info!("Measurement complete: no samples received");
    }

    Ok(())
}
