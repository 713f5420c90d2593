mod cache;
mod commands;
mod config;
mod db;
mod error;
mod pokeapi;
mod type_chart;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use pokeapi::CachedPokeClient;

#[derive(Parser, Debug)]
#[command(name = "dexcache")]
#[command(about = "Offline-friendly PokeAPI lookups backed by a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/dexcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

/// Log to `<data_dir>/dexcache/dexcache.log` so stdout carries only command
/// output. Use RUST_LOG to change the level (e.g. RUST_LOG=dexcache=debug).
///
/// The returned guard flushes the writer on drop and must outlive `main`'s work.
fn init_tracing() -> Result<WorkerGuard> {
  let log_dir = db::data_dir()?;
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(&log_dir, "dexcache.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dexcache=info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing()?;

  let config = config::Config::load(args.config.as_deref())?;
  info!(command = ?args.command, "dexcache starting");

  let client = CachedPokeClient::new(&config)?;
  commands::run(args.command, &client, &config).await
}
