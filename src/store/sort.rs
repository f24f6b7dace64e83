//! Column sorting over the cached collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, error, warn};

use super::record::{coerce_number, display_value, Record};
use super::storage::{Storage, StorageRead};
use super::{custom_order, RecordStore};
use crate::bus::{Channel, Payload};

/// Storage key of the active sort descriptor
pub const SORT_KEY: &str = "sort";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  #[default]
  Asc,
  Desc,
}

impl Direction {
  pub fn toggled(self) -> Self {
    match self {
      Direction::Asc => Direction::Desc,
      Direction::Desc => Direction::Asc,
    }
  }
}

/// Active sort: which column, which way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
  pub by: usize,
  pub direction: Direction,
}

/// Direction for a sort request on `field_index`.
///
/// With no active sort the result is ascending. Otherwise an explicit
/// direction wins, a different column restarts ascending, and the same
/// column toggles.
pub fn next_direction(
  current: Option<&SortDescriptor>,
  field_index: usize,
  explicit: Option<Direction>,
) -> Direction {
  let Some(current) = current else {
    return Direction::Asc;
  };

  match explicit {
    Some(direction) => direction,
    None if current.by != field_index => Direction::Asc,
    None => current.direction.toggled(),
  }
}

/// Ascending comparator.
///
/// Values that both coerce to numbers compare numerically. Anything else
/// compares by display text, and equal text orders `prev` after `next`.
pub fn compare_asc(prev: &Value, next: &Value) -> Ordering {
  if let (Some(a), Some(b)) = (coerce_number(prev), coerce_number(next)) {
    return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
  }

  if display_value(prev) < display_value(next) {
    Ordering::Less
  } else {
    Ordering::Greater
  }
}

/// Descending comparator, same tie policy as [`compare_asc`].
pub fn compare_desc(prev: &Value, next: &Value) -> Ordering {
  if let (Some(a), Some(b)) = (coerce_number(prev), coerce_number(next)) {
    return b.partial_cmp(&a).unwrap_or(Ordering::Equal);
  }

  if display_value(next) < display_value(prev) {
    Ordering::Less
  } else {
    Ordering::Greater
  }
}

/// Compare the `field` of two records.
///
/// A record without the field is neither numeric nor ordered as text, so any
/// comparison involving it reports `prev` after `next`.
fn compare_field(prev: &Record, next: &Record, field: &str, direction: Direction) -> Ordering {
  match (prev.get(field), next.get(field), direction) {
    (Some(a), Some(b), Direction::Asc) => compare_asc(a, b),
    (Some(a), Some(b), Direction::Desc) => compare_desc(a, b),
    _ => Ordering::Greater,
  }
}

/// Sort records in place by `field`.
///
/// The comparators never report textual ties as equal, so this runs an
/// insertion sort that tolerates a non-total order instead of `sort_by`.
pub fn sort_records(records: &mut [Record], field: &str, direction: Direction) {
  for i in 1..records.len() {
    let mut j = i;
    while j > 0 && compare_field(&records[j - 1], &records[j], field, direction) == Ordering::Greater {
      records.swap(j - 1, j);
      j -= 1;
    }
  }
}

/// Persisted sort descriptor, if one is stored and readable
pub fn load(storage: &Storage) -> Option<SortDescriptor> {
  match storage.read_json(SORT_KEY) {
    Ok(StorageRead::Present(sort)) => Some(sort),
    Ok(StorageRead::Missing) => None,
    Ok(StorageRead::Malformed(e)) => {
      warn!("Ignoring malformed sort descriptor: {}", e);
      None
    }
    Err(e) => {
      error!("Failed to read sort descriptor: {:#}", e);
      None
    }
  }
}

impl RecordStore {
  /// Active sort descriptor
  pub fn sort_info(&self) -> Option<SortDescriptor> {
    load(&self.storage)
  }

  /// Re-announce the persisted sort so header markers match it.
  pub fn check_sort_data(&self) {
    if let Some(sort) = self.sort_info() {
      self
        .bus
        .publish(Channel::LocalStoreUpdateSort, Payload::Sort(sort));
    }
  }

  /// Sort the cached collection by its `field_index`-th field.
  ///
  /// Clears any custom order, persists and announces the new descriptor,
  /// then persists and announces the resorted collection.
  pub fn sort_data(&self, field_index: usize, explicit: Option<Direction>) {
    let mut records = self.collection();
    let Some(field) = records
      .first()
      .and_then(|r| r.field_name(field_index))
      .map(str::to_string)
    else {
      debug!(field_index, "Nothing to sort");
      return;
    };

    custom_order::clear(&self.storage);

    let direction = next_direction(self.sort_info().as_ref(), field_index, explicit);
    sort_records(&mut records, &field, direction);
    debug!(field = %field, ?direction, "Sorted collection");

    let sort = SortDescriptor {
      by: field_index,
      direction,
    };
    if let Err(e) = self.storage.write_json(SORT_KEY, &sort) {
      error!("Failed to persist sort descriptor: {:#}", e);
    }
    self
      .bus
      .publish(Channel::LocalStoreUpdateSort, Payload::Sort(sort));

    if let Err(e) = self.save_data(&mut records) {
      error!("Failed to persist sorted collection: {:#}", e);
    }
    self
      .bus
      .publish(Channel::LocalStoreSuccess, Payload::Records(records));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bus::testing::Recorder;
  use crate::store::testing::*;
  use serde_json::json;

  fn records(value: Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
  }

  fn column(records: &[Record], field: &str) -> Vec<String> {
    records.iter().map(|r| r.display(field)).collect()
  }

  fn load_page(h: &Harness, results: Value) {
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({ "results": results }))),
    );
  }

  #[test]
  fn test_next_direction() {
    let current = SortDescriptor {
      by: 1,
      direction: Direction::Asc,
    };
    assert_eq!(next_direction(None, 1, Some(Direction::Desc)), Direction::Asc);
    assert_eq!(next_direction(Some(&current), 1, None), Direction::Desc);
    assert_eq!(next_direction(Some(&current), 2, None), Direction::Asc);
    assert_eq!(
      next_direction(Some(&current), 2, Some(Direction::Desc)),
      Direction::Desc
    );
  }

  #[test]
  fn test_numeric_strings_sort_numerically() {
    let mut data = records(json!([{"v": "9"}, {"v": "10"}, {"v": "2"}]));
    sort_records(&mut data, "v", Direction::Asc);
    assert_eq!(column(&data, "v"), vec!["2", "9", "10"]);

    sort_records(&mut data, "v", Direction::Desc);
    assert_eq!(column(&data, "v"), vec!["10", "9", "2"]);
  }

  #[test]
  fn test_text_sorts_lexicographically() {
    let mut data = records(json!([{"v": "Leia"}, {"v": "C-3PO"}, {"v": "unknown"}, {"v": "172"}]));
    sort_records(&mut data, "v", Direction::Asc);
    assert_eq!(column(&data, "v"), vec!["172", "C-3PO", "Leia", "unknown"]);
  }

  #[test]
  fn test_text_ties_break_toward_second_operand() {
    assert_eq!(compare_asc(&json!("a"), &json!("a")), Ordering::Greater);
    assert_eq!(compare_desc(&json!("a"), &json!("a")), Ordering::Greater);
    assert_eq!(compare_asc(&json!("2"), &json!(2)), Ordering::Equal);

    let mut data = records(json!([{"v": "x", "id": 1}, {"v": "x", "id": 2}]));
    sort_records(&mut data, "v", Direction::Asc);
    let ids: Vec<_> = data.iter().map(Record::id).collect();
    assert_eq!(ids, vec![Some(2), Some(1)]);
  }

  #[test]
  fn test_missing_field_is_not_numeric() {
    let data = records(json!([{"w": 1}, {"v": "5"}, {"v": "-3"}]));
    let (missing, five, minus_three) = (&data[0], &data[1], &data[2]);
    assert_eq!(compare_field(missing, five, "v", Direction::Asc), Ordering::Greater);
    assert_eq!(compare_field(five, missing, "v", Direction::Asc), Ordering::Greater);
    assert_eq!(compare_field(minus_three, missing, "v", Direction::Desc), Ordering::Greater);

    // Counted as zero, the missing value would stay in front of "5"
    let mut data = records(json!([{"w": 1}, {"v": "5"}]));
    sort_records(&mut data, "v", Direction::Asc);
    assert_eq!(column(&data, "v"), vec!["5", ""]);
  }

  #[test]
  fn test_sort_toggles_direction() {
    let h = harness();
    load_page(&h, json!([{"name": "B"}, {"name": "A"}, {"name": "C"}]));

    h.store.sort_data(0, None);
    assert_eq!(h.store.sort_info().unwrap().direction, Direction::Asc);
    assert_eq!(column(&h.store.collection(), "name"), vec!["A", "B", "C"]);

    h.store.sort_data(0, None);
    assert_eq!(h.store.sort_info().unwrap().direction, Direction::Desc);
    assert_eq!(column(&h.store.collection(), "name"), vec!["C", "B", "A"]);

    h.store.sort_data(0, None);
    assert_eq!(h.store.sort_info().unwrap().direction, Direction::Asc);
  }

  #[test]
  fn test_switching_column_restarts_ascending() {
    let h = harness();
    load_page(&h, json!([{"name": "B", "mass": "80"}, {"name": "A", "mass": "136"}]));

    h.store.sort_data(0, None);
    h.store.sort_data(0, None);
    h.store.sort_data(1, None);

    assert_eq!(
      h.store.sort_info(),
      Some(SortDescriptor {
        by: 1,
        direction: Direction::Asc
      })
    );
    assert_eq!(column(&h.store.collection(), "mass"), vec!["80", "136"]);
  }

  #[test]
  fn test_sort_scenario_keeps_ids() {
    let h = harness();
    load_page(&h, json!([{"name": "B"}, {"name": "A"}]));

    h.store.sort_data(0, None);

    assert_eq!(
      serde_json::to_value(h.store.collection()).unwrap(),
      json!([{"name": "A", "id": 2}, {"name": "B", "id": 1}])
    );
  }

  #[test]
  fn test_sort_announces_descriptor_then_collection() {
    let h = harness();
    load_page(&h, json!([{"name": "B"}, {"name": "A"}]));
    let events = Recorder::watch_all(&h.bus);

    h.store.sort_data(0, None);

    assert_eq!(
      events.channels(),
      vec![Channel::LocalStoreUpdateSort, Channel::LocalStoreSuccess]
    );
    assert_eq!(
      events.last(Channel::LocalStoreUpdateSort),
      Some(Payload::Sort(SortDescriptor {
        by: 0,
        direction: Direction::Asc
      }))
    );
  }

  #[test]
  fn test_sort_is_reapplied_on_fetch() {
    let h = harness();
    load_page(&h, json!([{"name": "A"}, {"name": "B"}]));
    h.store.sort_data(0, None);
    h.store.sort_data(0, None);

    h.bus.emit(Channel::LocalStoreClear);
    h.storage_write_sort(SortDescriptor {
      by: 0,
      direction: Direction::Desc,
    });
    load_page(&h, json!([{"name": "A"}, {"name": "C"}, {"name": "B"}]));

    assert_eq!(column(&h.store.collection(), "name"), vec!["C", "B", "A"]);
    assert_eq!(h.store.sort_info().unwrap().direction, Direction::Desc);
  }

  #[test]
  fn test_sorting_empty_collection_is_noop() {
    let h = harness();
    let events = Recorder::watch_all(&h.bus);
    h.store.sort_data(0, None);
    assert!(events.channels().is_empty());
    assert_eq!(h.store.sort_info(), None);
  }

  #[test]
  fn test_out_of_range_field_is_noop() {
    let h = harness();
    load_page(&h, json!([{"name": "B"}, {"name": "A"}]));
    let before = h.store.collection();
    let events = Recorder::watch_all(&h.bus);

    h.store.sort_data(9, None);

    assert!(events.channels().is_empty());
    assert_eq!(h.store.sort_info(), None);
    assert_eq!(h.store.collection(), before);
  }

  #[test]
  fn test_check_sort_data() {
    let h = harness();
    let events = Recorder::watch_all(&h.bus);
    h.store.check_sort_data();
    assert!(events.channels().is_empty());

    h.storage_write_sort(SortDescriptor {
      by: 2,
      direction: Direction::Desc,
    });
    h.store.check_sort_data();
    assert_eq!(events.channels(), vec![Channel::LocalStoreUpdateSort]);
  }

  #[test]
  fn test_descriptor_wire_format() {
    let sort = SortDescriptor {
      by: 3,
      direction: Direction::Desc,
    };
    assert_eq!(
      serde_json::to_value(sort).unwrap(),
      json!({"by": 3, "direction": "desc"})
    );
  }

  impl Harness {
    fn storage_write_sort(&self, sort: SortDescriptor) {
      self.store.storage.write_json(SORT_KEY, &sort).unwrap();
    }
  }
}
