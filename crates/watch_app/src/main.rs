mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use watch_engine::{handle_invocation, InvocationResponse};
use watch_logging::{watch_error, watch_info};

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    watch_logging::initialize(cli.log_destination(), cli.log_level);

    match run(&cli) {
        Ok(response) => {
            match serde_json::to_string(&response) {
                Ok(json) => println!("{json}"),
                Err(err) => watch_error!("Failed to encode response: {}", err),
            }
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            watch_error!("{:#}", err);
            eprintln!("page_watch: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<InvocationResponse> {
    let event: serde_json::Value =
        serde_json::from_str(&cli.event).context("trigger event is not valid JSON")?;
    let config = cli.to_config();
    let detector = config
        .build_detector()
        .context("invalid configuration")?;

    watch_info!(
        "Checking {} (state {} in {}, channel {})",
        config.monitored_url,
        config.state_key,
        config.store_location,
        config.channel
    );
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    Ok(runtime.block_on(handle_invocation(&detector, &event)))
}
