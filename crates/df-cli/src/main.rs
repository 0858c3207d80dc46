//! dont-forget: per-user reminder lists
//!
//! Usage:
//!   dont-forget                   - Start as the default user
//!   dont-forget --user <id>       - Start as the given user
//!   dont-forget --config <path>   - Use a specific config file
//!   dont-forget --help            - Show help

mod cli;
mod commands;
mod error;
mod session;

use df_core::{ClientSettings, Config};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::session::Session;

/// Parsed command line
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    user: Option<String>,
    config_path: Option<String>,
    help: bool,
    version: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        println!("dont-forget {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Before the subscriber, so RUST_LOG can come from .env
    dotenvy::dotenv().ok();

    // Log lines would interleave with the REPL, so only warnings by default
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config_path {
        Some(path) => Config::from_toml_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting dont-forget...");

    let (change_tx, changes) = broadcast::channel(64);
    let store = session::build_store(&config, change_tx).await?;
    let settings = ClientSettings::new(&config.client);

    let user = args.user.as_deref().or(config.default_user.as_deref());
    let session = Session::open(store, settings, user).await?;

    cli::run_cli(session, changes).await
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" | "-u" => {
                parsed.user = Some(args.next().ok_or_else(|| anyhow::anyhow!("--user needs a value"))?);
            }
            "--config" | "-c" => {
                parsed.config_path = Some(args.next().ok_or_else(|| anyhow::anyhow!("--config needs a value"))?);
            }
            "--help" | "-h" => parsed.help = true,
            "--version" | "-v" => parsed.version = true,
            other => return Err(anyhow::anyhow!("Unknown argument: {}", other)),
        }
    }

    Ok(parsed)
}

/// Print help message
fn print_help() {
    println!("dont-forget - per-user reminder lists");
    println!();
    println!("Usage:");
    println!("  dont-forget [--user <id>] [--config <path>]");
    println!("  dont-forget --help       Show this help message");
    println!("  dont-forget --version    Show version");
    println!();
    println!("Environment Variables:");
    println!("  DF_STORAGE_BACKEND   sqlite or memory (default: sqlite)");
    println!("  DF_DB_PATH           SQLite database path (default: data/dont-forget.db)");
    println!("  DF_INJECT_BUTTON     Show the reminders entry in the player list (default: true)");
    println!("  DF_GM_USER_IDS       Comma-separated user ids with game master rights");
    println!("  DF_USER              User to act as");
    println!("  RUST_LOG             Log filter (default: warn)");
}
