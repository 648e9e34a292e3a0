//! `unspinned`: field derotation through TheSkyX's scripting socket.

mod cli;
mod derotator;
mod telemetry;
mod tracking;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use unspinned::Client;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    let mut client = Client::connect((cli.host.as_str(), cli.port))
        .with_context(|| format!("error connecting to TheSkyX on '{}:{}'", cli.host, cli.port))?;
    info!(host = %cli.host, port = cli.port, rate = ?cli.rate, step = %cli.step_size, "connected");

    derotator::run(
        &mut client,
        cli.rate,
        cli.step_size,
        Duration::from_millis(cli.poll_interval_ms),
    )
    .context("error communicating with TheSkyX")
}
