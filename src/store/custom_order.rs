//! User-defined row order produced by drag-and-drop.
//!
//! The order is a list of record ids kept under a single key. It is applied
//! when the store starts up and dropped by any sort or clear.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::record::{coerce_number, Record, RowId};
use super::storage::{Storage, StorageRead};
use super::RecordStore;

/// Storage key of the custom row order
pub const CUSTOM_SORT_KEY: &str = "customSort";

/// Re-sequence `records` to follow `order`.
///
/// Scans the order once and looks each id up; ids without a record are
/// dropped, records missing from the order are left out.
pub fn resequence(records: &[Record], order: &[RowId]) -> Vec<Record> {
  order
    .iter()
    .filter_map(|id| records.iter().find(|r| r.id() == Some(*id)).cloned())
    .collect()
}

/// Persisted custom order, if one is stored and readable
pub fn load(storage: &Storage) -> Option<Vec<RowId>> {
  match storage.read_json::<Vec<Value>>(CUSTOM_SORT_KEY) {
    Ok(StorageRead::Present(ids)) => Some(
      ids
        .iter()
        .filter_map(coerce_number)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as RowId)
        .collect(),
    ),
    Ok(StorageRead::Missing) => None,
    Ok(StorageRead::Malformed(e)) => {
      warn!("Ignoring malformed custom order: {}", e);
      None
    }
    Err(e) => {
      error!("Failed to read custom order: {:#}", e);
      None
    }
  }
}

pub fn clear(storage: &Storage) {
  if let Err(e) = storage.remove(CUSTOM_SORT_KEY) {
    error!("Failed to remove custom order: {:#}", e);
  }
}

impl RecordStore {
  /// Persist a row order, applied the next time the store starts.
  pub fn set_custom_sort(&self, ids: &[RowId]) {
    debug!(?ids, "Saving custom order");
    if let Err(e) = self.storage.write_json(CUSTOM_SORT_KEY, ids) {
      error!("Failed to persist custom order: {:#}", e);
    }
  }

  pub fn custom_sort(&self) -> Option<Vec<RowId>> {
    load(&self.storage)
  }

  /// Re-sequence the cached collection by the persisted custom order.
  pub(super) fn apply_custom_sort(&self) {
    let Some(order) = self.custom_sort() else {
      return;
    };

    let mut records = resequence(&self.collection(), &order);
    debug!(count = records.len(), "Applied custom order");
    if let Err(e) = self.save_data(&mut records) {
      error!("Failed to persist custom order: {:#}", e);
    }
  }
}
