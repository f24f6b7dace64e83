//! Records as returned by the API, plus identity assignment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that carries the stable record identity
pub const ID_FIELD: &str = "id";

/// Stable handle of a record, assigned once per cached collection
pub type RowId = u64;

/// An open, insertion-ordered mapping of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
  /// Record id, coerced to an integer. Non-integral ids have no handle.
  pub fn id(&self) -> Option<RowId> {
    let n = coerce_number(self.0.get(ID_FIELD)?)?;
    if n >= 0.0 && n.fract() == 0.0 {
      Some(n as RowId)
    } else {
      None
    }
  }

  pub fn has_id(&self) -> bool {
    self.0.contains_key(ID_FIELD)
  }

  pub fn set_id(&mut self, id: RowId) {
    self.0.insert(ID_FIELD.to_string(), Value::from(id));
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  /// Name of the `index`-th field, in insertion order
  pub fn field_name(&self, index: usize) -> Option<&str> {
    self.field_names().nth(index)
  }

  /// Text shown for a field; missing fields render empty
  pub fn display(&self, field: &str) -> String {
    self.get(field).map(display_value).unwrap_or_default()
  }
}

/// Loose numeric conversion of a JSON value.
///
/// Strings are trimmed and an empty string counts as zero; null and booleans
/// convert to 0/1. Arrays and objects never count as numbers.
pub fn coerce_number(value: &Value) -> Option<f64> {
  match value {
    Value::Null => Some(0.0),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    Value::Number(n) => n.as_f64(),
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() {
        return Some(0.0);
      }
      trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
    }
    Value::Array(_) | Value::Object(_) => None,
  }
}

/// Render a value the way it appears in a table cell
pub fn display_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Array(items) => items
      .iter()
      .map(display_value)
      .collect::<Vec<_>>()
      .join(","),
    other => other.to_string(),
  }
}

/// Hands out sequential ids to collections that arrive without them.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
  last: RowId,
}

impl IdAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Assign ids in order if no record carries one yet.
  ///
  /// Returns true if ids were assigned.
  pub fn assign(&mut self, records: &mut [Record]) -> bool {
    if records.iter().any(Record::has_id) {
      return false;
    }

    for record in records.iter_mut() {
      self.last += 1;
      record.set_id(self.last);
    }
    !records.is_empty()
  }

  pub fn reset(&mut self) {
    self.last = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn records(value: Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_assign_ids_in_order() {
    let mut data = records(json!([{"name": "B"}, {"name": "A"}, {"name": "C"}]));
    let mut ids = IdAllocator::new();

    assert!(ids.assign(&mut data));
    let assigned: Vec<_> = data.iter().map(Record::id).collect();
    assert_eq!(assigned, vec![Some(1), Some(2), Some(3)]);
  }

  #[test]
  fn test_second_save_keeps_ids() {
    let mut data = records(json!([{"name": "B"}, {"name": "A"}]));
    let mut ids = IdAllocator::new();
    ids.assign(&mut data);
    let before = data.clone();

    assert!(!ids.assign(&mut data));
    assert_eq!(data, before);
  }

  #[test]
  fn test_counter_continues_until_reset() {
    let mut ids = IdAllocator::new();
    let mut first = records(json!([{"a": 1}, {"a": 2}]));
    let mut second = records(json!([{"a": 3}]));
    ids.assign(&mut first);
    ids.assign(&mut second);
    assert_eq!(second[0].id(), Some(3));

    ids.reset();
    let mut third = records(json!([{"a": 4}]));
    ids.assign(&mut third);
    assert_eq!(third[0].id(), Some(1));
  }

  #[test]
  fn test_id_is_appended_as_last_field() {
    let mut data = records(json!([{"name": "Luke", "height": "172"}]));
    IdAllocator::new().assign(&mut data);
    let fields: Vec<_> = data[0].field_names().collect();
    assert_eq!(fields, vec!["name", "height", "id"]);
  }

  #[test]
  fn test_id_coerces_strings() {
    let record = records(json!([{"id": "7"}])).remove(0);
    assert_eq!(record.id(), Some(7));
    let record = records(json!([{"id": "x"}])).remove(0);
    assert_eq!(record.id(), None);
  }

  #[test]
  fn test_coerce_number() {
    assert_eq!(coerce_number(&json!("10")), Some(10.0));
    assert_eq!(coerce_number(&json!(" 2.5 ")), Some(2.5));
    assert_eq!(coerce_number(&json!("")), Some(0.0));
    assert_eq!(coerce_number(&json!(null)), Some(0.0));
    assert_eq!(coerce_number(&json!(true)), Some(1.0));
    assert_eq!(coerce_number(&json!("unknown")), None);
    assert_eq!(coerce_number(&json!("NaN")), None);
    assert_eq!(coerce_number(&json!(["1"])), None);
  }

  #[test]
  fn test_display_value() {
    assert_eq!(display_value(&json!("Luke")), "Luke");
    assert_eq!(display_value(&json!(42)), "42");
    assert_eq!(display_value(&json!(["a", "b"])), "a,b");
    assert_eq!(display_value(&json!(null)), "null");
  }
}
