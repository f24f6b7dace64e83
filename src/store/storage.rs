//! Key-value storage backends and the typed facade the store reads through.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Persistent string-keyed store holding JSON text.
pub trait KeyValueStore {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  fn remove(&self, key: &str) -> Result<()>;

  /// When the value under `key` was last written, if the backend tracks it.
  fn stored_at(&self, _key: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(None)
  }
}

/// Outcome of reading and decoding a stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageRead<T> {
  /// Value present and decoded
  Present(T),
  /// Nothing stored under the key
  Missing,
  /// Stored text could not be decoded
  Malformed(String),
}

#[cfg(test)]
impl<T> StorageRead<T> {
  pub fn is_missing(&self) -> bool {
    matches!(self, StorageRead::Missing)
  }
}

/// Typed access to a [`KeyValueStore`].
pub struct Storage {
  backend: Box<dyn KeyValueStore>,
}

impl Storage {
  pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
    Self { backend }
  }

  pub fn in_memory() -> Self {
    Self::new(Box::new(MemoryStore::new()))
  }

  pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<StorageRead<T>> {
    let read = match self.backend.get(key)? {
      None => StorageRead::Missing,
      Some(text) => match serde_json::from_str(&text) {
        Ok(value) => StorageRead::Present(value),
        Err(e) => StorageRead::Malformed(e.to_string()),
      },
    };
    Ok(read)
  }

  pub fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let text =
      serde_json::to_string(value).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
    self.backend.set(key, &text)
  }

  pub fn read_text(&self, key: &str) -> Result<Option<String>> {
    self.backend.get(key)
  }

  pub fn write_text(&self, key: &str, value: &str) -> Result<()> {
    self.backend.set(key, value)
  }

  pub fn remove(&self, key: &str) -> Result<()> {
    self.backend.remove(key)
  }

  pub fn stored_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    self.backend.stored_at(key)
  }
}

/// Volatile storage, used for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RefCell<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.borrow().get(key).map(|(v, _)| v.clone()))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self
      .entries
      .borrow_mut()
      .insert(key.to_string(), (value.to_string(), Utc::now()));
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.entries.borrow_mut().remove(key);
    Ok(())
  }

  fn stored_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(self.entries.borrow().get(key).map(|(_, at)| *at))
  }
}

/// SQLite-backed persistent storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for the key-value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStore {
  /// Open or create the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open storage at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Database that lives only as long as the process.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory storage: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, stored_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;

    Ok(())
  }

  fn stored_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let stored: Option<String> = conn
      .query_row(
        "SELECT stored_at FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read timestamp of {}: {}", key, e))?;

    stored.as_deref().map(parse_datetime).transpose()
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::{json, Value};

  fn exercise(backend: Box<dyn KeyValueStore>) {
    let storage = Storage::new(backend);

    assert!(storage
      .read_json::<Value>("sort")
      .unwrap()
      .is_missing());

    storage
      .write_json("sort", &json!({"by": 1, "direction": "desc"}))
      .unwrap();
    assert_eq!(
      storage.read_json::<Value>("sort").unwrap(),
      StorageRead::Present(json!({"by": 1, "direction": "desc"}))
    );
    assert!(storage.stored_at("sort").unwrap().is_some());

    storage.write_text("next", "https://example.test/?page=2").unwrap();
    assert_eq!(
      storage.read_text("next").unwrap().as_deref(),
      Some("https://example.test/?page=2")
    );

    storage.remove("sort").unwrap();
    assert!(storage
      .read_json::<Value>("sort")
      .unwrap()
      .is_missing());
    assert!(storage.stored_at("sort").unwrap().is_none());
  }

  #[test]
  fn test_memory_store() {
    exercise(Box::new(MemoryStore::new()));
  }

  #[test]
  fn test_sqlite_store() {
    exercise(Box::new(SqliteStore::open_in_memory().unwrap()));
  }

  #[test]
  fn test_malformed_json_is_reported() {
    let storage = Storage::in_memory();
    storage.write_text("customSort", "[1, 2").unwrap();

    let read = storage.read_json::<Vec<u64>>("customSort").unwrap();
    assert!(matches!(read, StorageRead::Malformed(_)));
  }

  #[test]
  fn test_overwrite_replaces_value() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.set("currentPage", "2").unwrap();
    store.set("currentPage", "3").unwrap();
    assert_eq!(store.get("currentPage").unwrap().as_deref(), Some("3"));
  }

  #[test]
  fn test_open_creates_parent_directories() {
    let root = std::env::temp_dir().join(format!("paged-table-{}", std::process::id()));
    let path = root.join("nested").join("store.db");

    let store = SqliteStore::open(&path).unwrap();
    store.set("currentPage", "2").unwrap();
    assert!(path.exists());

    drop(store);
    std::fs::remove_dir_all(&root).unwrap();
  }

  #[test]
  fn test_parse_datetime() {
    let dt = parse_datetime("2024-03-05 10:11:12").unwrap();
    assert_eq!(dt.to_rfc3339(), "2024-03-05T10:11:12+00:00");
    assert!(parse_datetime("yesterday").is_err());
  }
}
