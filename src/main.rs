use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod core;
mod daemon;
#[cfg(test)]
mod testing;
mod upstream;

use crate::core::models::Channel;
use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "order-sheet")]
#[command(author, version, about = "Keeps marketplace order sheets in sync with the order API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the polling daemon
    Daemon,

    /// Fetch ready-to-ship orders once and print a sheet page
    Orders {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Sales channel (shopee, lazada, tiktok); defaults to the configured one
        #[arg(long)]
        channel: Option<Channel>,

        /// Sheet page to print
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Show the stored access token
    Token {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Exchange the refresh token before printing
        #[arg(long)]
        refresh: bool,
    },

    /// Trigger daemon refresh via D-Bus
    Refresh {
        /// Switch the daemon to this channel instead
        #[arg(long)]
        channel: Option<Channel>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Reads `debug` from the config without failing startup; errors surface
/// again from the command's own `Settings::load`.
fn debug_enabled() -> bool {
    Settings::config_path()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Settings>(&content).ok())
        .is_some_and(|settings| settings.debug)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            init_logging(debug_enabled());
            let settings = Settings::load()?;
            daemon::run(settings).await
        }
        Commands::Orders {
            json,
            channel,
            page,
        } => {
            init_logging(debug_enabled());
            cli::orders::run(json, channel, page).await
        }
        Commands::Token { json, refresh } => {
            init_logging(debug_enabled());
            cli::token::run(json, refresh).await
        }
        Commands::Refresh { channel } => {
            init_logging(debug_enabled());
            cli::refresh::run(channel).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
