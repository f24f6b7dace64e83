//! Pagination cursors and the current page token.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use super::RecordStore;
use crate::api::types::PageResponse;
use crate::bus::{Channel, Payload};

pub const PREVIOUS_KEY: &str = "previous";
pub const NEXT_KEY: &str = "next";
pub const CURRENT_PAGE_KEY: &str = "currentPage";

/// Links to the neighbouring pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
  pub previous: Option<String>,
  pub next: Option<String>,
}

/// The `page` query parameter of `url`, defaulting to "1".
pub fn page_token(url: &str) -> String {
  match Url::parse(url) {
    Ok(parsed) => parsed
      .query_pairs()
      .find(|(key, _)| key == "page")
      .map(|(_, value)| value.into_owned())
      .filter(|value| !value.is_empty())
      .unwrap_or_else(|| "1".to_string()),
    Err(e) => {
      warn!(url = %url, "Cannot read page of cursor: {}", e);
      "1".to_string()
    }
  }
}

fn non_empty(link: &Option<String>) -> Option<String> {
  link.as_deref().filter(|l| !l.is_empty()).map(String::from)
}

impl RecordStore {
  fn read_cursor(&self, key: &str) -> Option<String> {
    match self.storage.read_text(key) {
      Ok(link) => link.filter(|l| !l.is_empty()),
      Err(e) => {
        error!("Failed to read {} cursor: {:#}", key, e);
        None
      }
    }
  }

  /// Persisted cursors
  pub fn pagination_info(&self) -> PaginationInfo {
    PaginationInfo {
      previous: self.read_cursor(PREVIOUS_KEY),
      next: self.read_cursor(NEXT_KEY),
    }
  }

  /// Publish the persisted cursors.
  pub fn announce_pagination(&self) {
    self.bus.publish(
      Channel::LocalStoreUpdatePagination,
      Payload::Pagination(self.pagination_info()),
    );
  }

  /// Page token persisted by the last navigation
  pub fn current_page(&self) -> Option<String> {
    self
      .storage
      .read_text(CURRENT_PAGE_KEY)
      .unwrap_or_else(|e| {
        error!("Failed to read current page: {:#}", e);
        None
      })
  }

  /// Persist the cursors of a fresh page and announce them.
  pub(super) fn update_pagination_info(&self, page: &PageResponse) {
    let info = PaginationInfo {
      previous: non_empty(&page.previous),
      next: non_empty(&page.next),
    };

    for (key, link) in [(PREVIOUS_KEY, &info.previous), (NEXT_KEY, &info.next)] {
      let result = match link {
        Some(link) => self.storage.write_text(key, link),
        None => self.storage.remove(key),
      };
      if let Err(e) = result {
        error!("Failed to persist {} cursor: {:#}", key, e);
      }
    }

    self
      .bus
      .publish(Channel::LocalStoreUpdatePagination, Payload::Pagination(info));
  }

  /// Move to the page behind the cursor stored under `key` and request it.
  /// No cursor, no navigation.
  pub(super) fn follow_cursor(&self, key: &str) {
    let Some(link) = self.read_cursor(key) else {
      debug!(cursor = key, "No page to navigate to");
      return;
    };

    let page = page_token(&link);
    self.set_url(link);
    if let Err(e) = self.storage.write_text(CURRENT_PAGE_KEY, &page) {
      error!("Failed to persist current page: {:#}", e);
    }

    self.bus.emit(Channel::StoreRequest);
  }
}
