//! edgepulse - relay edge perception messages and buzz on detections
//!
//! Finds a Firmata board among the configured serial ports, configures the
//! actuator pin, then relays JSON-lines envelopes from stdin to stdout,
//! pulsing the pin for every message that carries a detection.
//!
//! Exit codes: 0 after a signal or end of input, 2 when no compatible board
//! answers, 1 for any other startup failure.

mod config;
mod serve;
mod stdio;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use edgepulse_core::endpoint;
use edgepulse_hardware::mock::MockPortOpener;
use edgepulse_hardware::{
    ActuatorController, AnyPortOpener, Buzzer, ConnectionError, DeviceConnector, SerialPortOpener,
};
use edgepulse_relay::RelayPipeline;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::stdio::{LineSink, LineSource};

#[derive(Parser, Debug)]
#[command(name = "edgepulse")]
#[command(about = "Relays perception messages and drives a Firmata buzzer on detections")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "edgepulse.toml")]
    config: PathBuf,

    /// Candidate serial ports, separated by commas or spaces
    #[arg(short, long)]
    ports: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Actuator pin
    #[arg(long)]
    pin: Option<u8>,

    /// Pulses per detection message
    #[arg(long)]
    pulses: Option<u32>,

    /// Messages handled at once
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Use a simulated board instead of real serial ports
    #[arg(long)]
    simulate: bool,

    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Startup failures, split by exit code.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    NoDevice(#[from] ConnectionError),

    #[error(transparent)]
    Startup(#[from] anyhow::Error),
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::NoDevice(_) => 2,
            Self::Startup(_) => 1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("edgepulse v{}", edgepulse_core::VERSION);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries forwarded messages
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut config = config::load_config(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    if let Some(ports) = args.ports {
        config.serial.ports = ports;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(pin) = args.pin {
        config.actuator.pin = pin;
    }
    if let Some(pulses) = args.pulses {
        config.actuator.pulses_per_event = pulses;
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config.relay.max_in_flight = max_in_flight;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        ports = %config.serial.ports,
        baud_rate = config.serial.baud_rate,
        pin = config.actuator.pin,
        pulses_per_event = config.actuator.pulses_per_event,
        max_in_flight = config.relay.max_in_flight,
        simulate = args.simulate,
        "Configuration loaded"
    );

    let candidates = endpoint::enumerate(&config.serial.ports, config.serial.baud_rate);
    if candidates.is_empty() {
        warn!("No candidate endpoints configured");
    }

    let opener = if args.simulate {
        AnyPortOpener::Mock(MockPortOpener::simulated(&candidates))
    } else {
        AnyPortOpener::Serial(SerialPortOpener::new())
    };
    let connector =
        DeviceConnector::new(opener).with_handshake_timeout(config.serial.handshake_timeout());
    let device = connector.connect(&candidates).await?;

    let controller = Arc::new(ActuatorController::new(device));
    let pin = match controller.configure(config.actuator.pin).await {
        Ok(pin) => pin,
        Err(e) => {
            controller.shutdown().await;
            return Err(anyhow::Error::new(e)
                .context("Failed to configure actuator pin")
                .into());
        }
    };

    let buzzer = Buzzer::new(Arc::clone(&controller), pin)
        .with_timing(config.actuator.timing())
        .with_pulses(config.actuator.pulses_per_event);
    let pipeline = Arc::new(RelayPipeline::new(buzzer, LineSink::stdout()));

    let source = match LineSource::stdin() {
        Ok(source) => source,
        Err(e) => {
            controller.shutdown().await;
            return Err(anyhow::Error::new(e)
                .context("Failed to start input reader")
                .into());
        }
    };

    info!(device = %controller.info(), pin = %pin, "Relaying messages");
    let stats = serve::serve(
        Arc::clone(&pipeline),
        source,
        config.relay.max_in_flight,
        shutdown_signal(),
    )
    .await;

    controller.shutdown().await;
    info!(
        received = pipeline.received(),
        completed = stats.completed,
        rejected = stats.rejected,
        unreadable = stats.unreadable,
        "Stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["edgepulse"]);
        assert_eq!(args.config, PathBuf::from("edgepulse.toml"));
        assert_eq!(args.log_level, "info");
        assert!(args.ports.is_none());
        assert!(!args.simulate);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "edgepulse",
            "--ports",
            "/dev/ttyACM0,/dev/ttyACM1",
            "--pin",
            "13",
            "--pulses",
            "2",
            "--max-in-flight",
            "8",
            "--simulate",
        ]);
        assert_eq!(args.ports.as_deref(), Some("/dev/ttyACM0,/dev/ttyACM1"));
        assert_eq!(args.pin, Some(13));
        assert_eq!(args.pulses, Some(2));
        assert_eq!(args.max_in_flight, Some(8));
        assert!(args.simulate);
    }

    #[test]
    fn test_exit_codes() {
        let no_device = AppError::from(ConnectionError::NoDeviceFound { tried: 4 });
        assert_eq!(no_device.exit_code(), 2);

        let startup = AppError::from(anyhow::anyhow!("bad config"));
        assert_eq!(startup.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_run_without_device_exits_with_two() {
        let args = Args::parse_from([
            "edgepulse",
            "--config",
            "/nonexistent/edgepulse.toml",
            "--ports",
            "/dev/edgepulse-missing-0 /dev/edgepulse-missing-1",
        ]);

        let error = run(args).await.unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_run_with_invalid_pin_exits_with_one() {
        let args = Args::parse_from([
            "edgepulse",
            "--config",
            "/nonexistent/edgepulse.toml",
            "--pin",
            "200",
            "--simulate",
        ]);

        let error = run(args).await.unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }
}
