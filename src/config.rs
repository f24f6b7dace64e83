use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://swapi.dev/api/people";
pub const DEFAULT_MAX_COLUMNS: usize = 5;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  /// Collection endpoint; pages are requested as `<api_url>/?page=<n>`
  pub api_url: String,
  /// Upper bound on the number of table columns
  pub max_columns: usize,
  /// Custom title for header (defaults to "paged-table" if not set)
  pub title: Option<String>,
  pub storage: StorageConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      max_columns: DEFAULT_MAX_COLUMNS,
      title: None,
      storage: StorageConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
  /// SQLite file (defaults to <data_dir>/paged-table/store.db)
  pub path: Option<PathBuf>,
  /// Keep everything in memory for this run only
  pub ephemeral: bool,
}

impl StorageConfig {
  /// Resolved database path
  pub fn db_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => dirs::data_dir()
        .map(|dir| dir.join("paged-table").join("store.db"))
        .ok_or_else(|| eyre!("Could not determine data directory")),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./paged-table.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/paged-table/config.yaml
  ///
  /// Without a file the built-in defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("paged-table.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("paged-table").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.max_columns == 0 {
      return Err(eyre!("max_columns must be at least 1"));
    }
    Ok(config)
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("paged-table")
  }
}
