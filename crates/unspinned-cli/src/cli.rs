//! Command-line surface of the `unspinned` binary.

use clap::{Parser, ValueEnum};
use unspinned::{DEFAULT_PORT, Degrees};

use crate::tracking::TrackingRate;

/// How log lines are written to stderr.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Turns the camera rotator through TheSkyX to cancel field rotation on an
/// alt-az mount.
#[derive(Parser, Debug)]
#[command(name = "unspinned", version)]
pub(crate) struct Cli {
    /// Host running TheSkyX.
    #[arg(long, default_value = "localhost")]
    pub(crate) host: String,
    /// TheSkyX scripting port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Tracking rate: 'sidereal', 'lunar', 'solar', or a custom rate in
    /// radians per second.
    #[arg(long, default_value = "sidereal")]
    pub(crate) rate: TrackingRate,
    /// Smallest rotator move to send, in degrees.
    #[arg(long = "step-size", default_value = "0.001", value_parser = parse_step)]
    pub(crate) step_size: Degrees,
    /// Pause between control iterations, in milliseconds.
    #[arg(long = "poll-interval-ms", default_value_t = 0)]
    pub(crate) poll_interval_ms: u64,
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub(crate) log_format: LogFormat,
}

fn parse_step(raw: &str) -> Result<Degrees, String> {
    match raw.parse::<f64>() {
        Ok(step) if step.is_finite() && step > 0.0 => Ok(Degrees(step)),
        _ => Err(format!("invalid step size '{raw}': expected a positive number of degrees")),
    }
}
