use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod builtin;
mod commands;

use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "hookline")]
#[command(about = "Signed interaction webhook for chat platform applications", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ~/.hookline/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        format!(
            "info,{}=debug,hookline_interactions=debug",
            env!("CARGO_CRATE_NAME")
        )
    } else {
        "info".to_string()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = cli.command.run(cli.config).await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
