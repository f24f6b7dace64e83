use serde::{Deserialize, Serialize};

use crate::store::record::Record;

/// One page of the paginated API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
  pub results: Vec<Record>,
  #[serde(default)]
  pub previous: Option<String>,
  #[serde(default)]
  pub next: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_swapi_page() {
    let body = r#"{
      "count": 82,
      "next": "https://swapi.dev/api/people/?page=2",
      "previous": null,
      "results": [
        {"name": "Luke Skywalker", "height": "172", "films": ["https://swapi.dev/api/films/1/"]}
      ]
    }"#;

    let page: PageResponse = serde_json::from_str(body).unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.previous, None);
    assert_eq!(page.next.as_deref(), Some("https://swapi.dev/api/people/?page=2"));
    assert_eq!(page.results[0].field_name(1), Some("height"));
  }

  #[test]
  fn test_page_requires_results() {
    assert!(serde_json::from_str::<PageResponse>(r#"{"detail": "Not found"}"#).is_err());
  }
}
