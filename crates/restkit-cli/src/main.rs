//! Restkit CLI main entry point

use clap::Parser;
use reqwest::Method;
use restkit_cli::{
    cli::{Cli, Commands},
    commands::{load_settings, CallCommand, ShowConfigCommand},
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use tracing::debug;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    debug!("Restkit CLI v{}", env!("CARGO_PKG_VERSION"));
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Get { args } => CallCommand::run(settings, Method::GET, args, None).await,
        Commands::Delete { args } => CallCommand::run(settings, Method::DELETE, args, None).await,
        Commands::Post { args, data } => {
            CallCommand::run(settings, Method::POST, args, Some(data)).await
        }
        Commands::Put { args, data } => {
            CallCommand::run(settings, Method::PUT, args, Some(data)).await
        }
        Commands::ShowConfig { json } => ShowConfigCommand::run(&settings, json),
    }
}
