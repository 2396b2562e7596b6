use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use httpstress::cli::Args;
use httpstress::RunController;
use log::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    //init logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(args).await {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("error: {:#}", e);
            eprintln!("{}", Args::command().render_usage());
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u8> {
    let config = args
        .into_run_config()
        .context("failed to load configuration")?;
    info!(
        "{} requests, {} workers, {} request templates",
        config.total_requests,
        config.concurrency,
        config.templates.len()
    );
    let mut controller = RunController::new(config);
    let outcome = controller.run().await?;
    let mut stdout = io::stdout();
    Ok(controller.finish(&outcome, &mut stdout))
}
