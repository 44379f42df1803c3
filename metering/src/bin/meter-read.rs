//! meter-read - print every register of a meter attached to a serial port

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use metering::{MeterConnection, ProtocolKind, RegistrationSet, SerialConnection};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    /// Kamstrup Meter Protocol
    Kmp,
    /// IEC 62056-21 data readout
    Iec,
}

impl From<ProtocolArg> for ProtocolKind {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Kmp => ProtocolKind::Kmp,
            ProtocolArg::Iec => ProtocolKind::Iec,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One `NAME: value` per line
    Text,
    /// JSON object
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "meter-read", version, about = "Read all registers from an electricity meter")]
struct Cli {
    /// Wire protocol spoken by the meter
    #[arg(value_enum)]
    protocol: ProtocolArg,

    /// Serial port name (e.g., COM3, /dev/ttyUSB0)
    #[arg(short, long, env = "METER_PORT")]
    port: String,

    /// Discard the request when an optical head echoes it back
    #[arg(long)]
    echo_compensation: bool,

    /// Read timeout in milliseconds, overriding the protocol default
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn main() -> ExitCode {
    let default_filter = std::env::var("METER_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed communicating with meter: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let kind = ProtocolKind::from(cli.protocol);
    let mut settings = kind
        .settings(&cli.port)
        .with_echo_compensation(cli.echo_compensation);
    if let Some(timeout_ms) = cli.timeout_ms {
        settings = settings.with_timeout(Duration::from_millis(timeout_ms));
    }
    info!("Reading {kind} meter on {settings}");

    let mut connection = SerialConnection::new(settings);
    let registrations = kind.protocol(&mut connection).all_registrations();
    if let Err(e) = connection.close() {
        warn!("Failed to close {}: {e}", cli.port);
    }

    print_registrations(&registrations?, cli.format)
}

fn print_registrations(registrations: &RegistrationSet, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for register in registrations {
                println!("{register}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(registrations)?),
    }
    Ok(())
}
