mod api;
mod app;
mod bus;
mod config;
mod event;
mod store;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::client::HttpTransport;
use crate::store::storage::{SqliteStore, Storage};

#[derive(Parser, Debug)]
#[command(name = "paged-table")]
#[command(about = "A terminal table over a paginated JSON API, cached locally")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/paged-table/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Collection endpoint to page through
  #[arg(short, long)]
  url: Option<String>,

  /// Maximum number of table columns
  #[arg(short, long)]
  max_columns: Option<usize>,

  /// Keep the cache in memory for this run only
  #[arg(long)]
  ephemeral: bool,
}

/// Log to a daily file under the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let dir = dirs::data_dir()
    .map(|dir| dir.join("paged-table").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    dir,
    "paged-table.log",
  ));
  let filter = EnvFilter::try_from_env("PAGED_TABLE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn open_storage(config: &config::StorageConfig) -> Result<Storage> {
  if config.ephemeral {
    return Ok(Storage::in_memory());
  }

  let path = config.db_path()?;
  Ok(Storage::new(Box::new(SqliteStore::open(&path)?)))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  if let Some(url) = args.url {
    config.api_url = url;
  }
  if let Some(max_columns) = args.max_columns {
    if max_columns == 0 {
      return Err(eyre!("--max-columns must be at least 1"));
    }
    config.max_columns = max_columns;
  }
  config.storage.ephemeral |= args.ephemeral;

  let storage = open_storage(&config.storage)?;
  let transport = Arc::new(HttpTransport::new()?);

  // Initialize and run the app
  let mut app = app::App::new(config, storage, transport);
  app.run().await?;

  Ok(())
}
