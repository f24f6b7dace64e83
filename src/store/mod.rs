//! Record store: the cached collection and everything persisted beside it.
//!
//! The store owns:
//! - the collection cached under the current request URL
//! - id assignment for records that arrive without one
//! - the sort descriptor ([`sort`]) and custom row order ([`custom_order`])
//! - the pagination cursors and current page token ([`pagination`])
//!
//! It reacts to bus events and answers with bus events; UI components never
//! touch storage directly.

pub mod custom_order;
pub mod pagination;
pub mod record;
pub mod sort;
pub mod storage;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

use crate::api::client::RemoteSource;
use crate::api::types::PageResponse;
use crate::bus::{Channel, EventBus, Payload};

use self::record::{IdAllocator, Record, RowId};
use self::storage::{Storage, StorageRead};

/// Central coordinator between the remote source, storage and the bus.
pub struct RecordStore {
  bus: EventBus,
  storage: Storage,
  remote: RemoteSource,
  /// API URL the store was configured with
  base_url: String,
  /// Current request URL, also the storage key of the cached collection
  url: RefCell<String>,
  ids: RefCell<IdAllocator>,
}

impl RecordStore {
  pub fn new(bus: EventBus, storage: Storage, remote: RemoteSource, api_url: &str) -> Rc<Self> {
    let base_url = api_url.trim_end_matches('/').to_string();
    Rc::new(Self {
      bus,
      storage,
      remote,
      url: RefCell::new(base_url.clone()),
      base_url,
      ids: RefCell::new(IdAllocator::new()),
    })
  }

  /// Restore the request URL and custom order from storage, then start
  /// listening on the bus.
  pub fn init(self: &Rc<Self>) {
    if let Some(page) = self.current_page() {
      self.set_url(format!("{}/?page={}", self.base_url, page));
    }
    self.apply_custom_sort();
    self.subscribe();
  }

  fn subscribe(self: &Rc<Self>) {
    self.on(Channel::StoreRequest, |store, _| store.request());
    self.on(Channel::StoreSuccess, |store, payload| match payload.page() {
      Some(page) => store.handle_page(page),
      None => warn!("store:success published without a page"),
    });
    self.on(Channel::LocalStoreClear, |store, _| store.clear_store());
    self.on(Channel::PaginationNext, |store, _| {
      store.follow_cursor(pagination::NEXT_KEY)
    });
    self.on(Channel::PaginationPrev, |store, _| {
      store.follow_cursor(pagination::PREVIOUS_KEY)
    });
  }

  /// Subscribe a handler that only runs while the store is alive.
  fn on<F>(self: &Rc<Self>, channel: Channel, handler: F)
  where
    F: Fn(&Self, &Payload) + 'static,
  {
    let store = Rc::downgrade(self);
    self.bus.subscribe(channel, move |payload| {
      if let Some(store) = store.upgrade() {
        handler(&store, payload);
      }
    });
  }

  /// Current request URL
  pub fn url(&self) -> String {
    self.url.borrow().clone()
  }

  fn set_url(&self, url: String) {
    debug!(url = %url, "Request URL changed");
    *self.url.borrow_mut() = url;
  }

  /// Fetch the current page
  pub fn request(&self) {
    let url = self.url();
    info!(url = %url, "Requesting page");
    self.remote.fetch(&url);
  }

  fn handle_page(&self, page: &PageResponse) {
    let mut records = page.results.clone();
    if let Err(e) = self.save_data(&mut records) {
      error!("Failed to cache page: {:#}", e);
    }
    self.check_data();
    self.update_pagination_info(page);

    if let Some(sort) = self.sort_info() {
      self.sort_data(sort.by, Some(sort.direction));
    }
  }

  /// Read the cached collection for the current URL.
  pub fn read_collection(&self) -> Result<StorageRead<Vec<Record>>> {
    self.storage.read_json(&self.url())
  }

  /// Cached collection, or empty when nothing usable is stored.
  pub fn collection(&self) -> Vec<Record> {
    match self.read_collection() {
      Ok(StorageRead::Present(records)) => records,
      Ok(StorageRead::Missing) => Vec::new(),
      Ok(StorageRead::Malformed(e)) => {
        warn!(url = %self.url(), "Cached collection is malformed: {}", e);
        Vec::new()
      }
      Err(e) => {
        error!("Failed to read cached collection: {:#}", e);
        Vec::new()
      }
    }
  }

  /// Assign ids if the records carry none, then persist them as the
  /// collection of the current URL.
  pub fn save_data(&self, records: &mut [Record]) -> Result<()> {
    if self.ids.borrow_mut().assign(records) {
      debug!(count = records.len(), "Assigned record ids");
    }
    self.storage.write_json(&self.url(), records)
  }

  /// Announce the cached collection, or its absence.
  pub fn check_data(&self) {
    match self.read_collection() {
      Ok(StorageRead::Present(records)) if !records.is_empty() => {
        self
          .bus
          .publish(Channel::LocalStoreSuccess, Payload::Records(records));
      }
      Ok(StorageRead::Present(records)) => {
        self
          .bus
          .publish(Channel::LocalStoreEmpty, Payload::Records(records));
      }
      Ok(StorageRead::Missing) => {
        self
          .bus
          .publish(Channel::LocalStoreEmpty, Payload::Records(Vec::new()));
      }
      Ok(StorageRead::Malformed(e)) => {
        error!(url = %self.url(), "Failed to read cached data: {}", e);
      }
      Err(e) => {
        error!("Failed to read cached data: {:#}", e);
      }
    }
  }

  /// Drop the cached collection, sort state, custom order and cursors.
  pub fn clear_store(&self) {
    let url = self.url();
    let keys = [
      url.as_str(),
      pagination::PREVIOUS_KEY,
      pagination::NEXT_KEY,
      sort::SORT_KEY,
      custom_order::CUSTOM_SORT_KEY,
    ];
    for key in keys {
      if let Err(e) = self.storage.remove(key) {
        error!("Failed to remove {}: {:#}", key, e);
      }
    }
    self.ids.borrow_mut().reset();
    info!(url = %url, "Cleared local store");
  }

  /// Remove the record with the given id.
  ///
  /// Publishes the remaining collection, or a clear when none is left.
  /// An unknown id changes nothing and publishes nothing.
  pub fn remove_row(&self, id: RowId) {
    let mut records = self.collection();
    let Some(index) = records.iter().position(|r| r.id() == Some(id)) else {
      debug!(id, "No record to remove");
      return;
    };

    records.remove(index);
    if let Err(e) = self.save_data(&mut records) {
      error!("Failed to persist removal of {}: {:#}", id, e);
    }

    if records.is_empty() {
      self.bus.emit(Channel::LocalStoreClear);
    } else {
      self
        .bus
        .publish(Channel::LocalStoreSuccess, Payload::Records(records));
    }
  }

  /// When the current collection was written to storage
  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    self.storage.stored_at(&self.url()).unwrap_or_else(|e| {
      warn!("Failed to read cache timestamp: {:#}", e);
      None
    })
  }
}


#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::api::testing::FixedTransport;
  use crate::bus::testing::Recorder;
  use serde_json::json;
  use std::sync::Arc;

  fn ids(records: &[Record]) -> Vec<Option<RowId>> {
    records.iter().map(Record::id).collect()
  }

  #[test]
  fn test_success_assigns_ids_and_announces() {
    let h = harness();
    let events = Recorder::watch(
      &h.bus,
      &[
        Channel::LocalStoreSuccess,
        Channel::LocalStoreEmpty,
        Channel::LocalStoreUpdatePagination,
        Channel::LocalStoreUpdateSort,
      ],
    );

    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"name": "B"}, {"name": "A"}], "next": "p2"}))),
    );

    assert_eq!(ids(&h.store.collection()), vec![Some(1), Some(2)]);
    assert_eq!(
      events.channels(),
      vec![
        Channel::LocalStoreSuccess,
        Channel::LocalStoreUpdatePagination,
      ]
    );
    assert_eq!(
      events.last(Channel::LocalStoreUpdatePagination),
      Some(Payload::Pagination(pagination::PaginationInfo {
        previous: None,
        next: Some("p2".to_string()),
      }))
    );
  }

  #[test]
  fn test_refetch_does_not_reassign_ids() {
    let h = harness();
    let first = page(json!({"results": [{"name": "B"}, {"name": "A"}]}));
    h.bus.publish(Channel::StoreSuccess, Payload::Page(first));
    let cached = h.store.collection();

    let again = PageResponse {
      results: cached.clone(),
      ..Default::default()
    };
    h.bus.publish(Channel::StoreSuccess, Payload::Page(again));

    assert_eq!(h.store.collection(), cached);
  }

  #[test]
  fn test_empty_results_announce_empty() {
    let h = harness();
    let events = Recorder::watch(&h.bus, &[Channel::LocalStoreEmpty, Channel::LocalStoreSuccess]);

    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": []}))),
    );

    assert_eq!(events.channels(), vec![Channel::LocalStoreEmpty]);
  }

  #[test]
  fn test_check_data_without_cache_is_empty() {
    let h = harness();
    let events = Recorder::watch_all(&h.bus);
    h.store.check_data();
    assert_eq!(events.channels(), vec![Channel::LocalStoreEmpty]);
  }

  #[test]
  fn test_malformed_cache_publishes_nothing() {
    let storage = Storage::in_memory();
    storage.write_text(API_URL, "{not json").unwrap();
    let h = harness_with(
      storage,
      std::sync::Arc::new(crate::api::testing::FixedTransport::failing()),
    );
    let events = Recorder::watch_all(&h.bus);

    h.store.check_data();
    assert!(events.channels().is_empty());
    assert!(h.store.collection().is_empty());
  }

  #[test]
  fn test_remove_row() {
    let h = harness();
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "a"}, {"n": "b"}, {"n": "c"}]}))),
    );
    let events = Recorder::watch_all(&h.bus);

    h.store.remove_row(2);

    assert_eq!(ids(&h.store.collection()), vec![Some(1), Some(3)]);
    assert_eq!(events.channels(), vec![Channel::LocalStoreSuccess]);
    let remaining = events.last(Channel::LocalStoreSuccess).unwrap();
    assert_eq!(ids(remaining.records().unwrap()), vec![Some(1), Some(3)]);
  }

  #[test]
  fn test_remove_unknown_row_is_silent() {
    let h = harness();
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "a"}]}))),
    );
    let before = h.store.collection();
    let events = Recorder::watch_all(&h.bus);

    h.store.remove_row(42);

    assert_eq!(h.store.collection(), before);
    assert!(events.channels().is_empty());
  }

  #[test]
  fn test_removing_last_row_clears() {
    let h = harness();
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "a"}], "next": "p2"}))),
    );
    h.store.sort_data(0, None);
    let events = Recorder::watch_all(&h.bus);

    h.store.remove_row(1);

    assert_eq!(events.channels(), vec![Channel::LocalStoreClear]);
    assert_eq!(events.count(Channel::LocalStoreSuccess), 0);
    assert!(h.store.read_collection().unwrap().is_missing());
    assert_eq!(h.store.sort_info(), None);
    assert_eq!(h.store.pagination_info(), Default::default());
  }

  #[test]
  fn test_clear_resets_id_counter_but_keeps_page() {
    let h = harness();
    h.storage_write_page("3");
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "a"}, {"n": "b"}]}))),
    );
    h.bus.emit(Channel::LocalStoreClear);

    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "c"}]}))),
    );
    assert_eq!(ids(&h.store.collection()), vec![Some(1)]);
    assert_eq!(h.store.current_page().as_deref(), Some("3"));
  }

  #[test]
  fn test_ids_continue_across_pages() {
    let h = harness();
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({
        "results": [{"n": "a"}, {"n": "b"}],
        "next": "https://api.test/people/?page=2"
      }))),
    );
    h.store.follow_cursor(pagination::NEXT_KEY);
    h.bus.publish(
      Channel::StoreSuccess,
      Payload::Page(page(json!({"results": [{"n": "c"}]}))),
    );

    assert_eq!(ids(&h.store.collection()), vec![Some(3)]);
  }

  #[tokio::test]
  async fn test_request_fetches_and_caches_page() {
    let transport = Arc::new(FixedTransport::body(r#"{"results": [{"n": "a"}]}"#));
    let mut h = harness_with(Storage::in_memory(), transport.clone());
    let events = Recorder::watch(
      &h.bus,
      &[Channel::LocalStoreSuccess, Channel::StoreFinallyRequest],
    );

    h.bus.emit(Channel::StoreRequest);
    assert!(h.fetches.next().await);

    assert_eq!(transport.requested.lock().unwrap().as_slice(), [API_URL]);
    assert_eq!(ids(&h.store.collection()), vec![Some(1)]);
    assert_eq!(events.count(Channel::LocalStoreSuccess), 1);
    assert_eq!(events.count(Channel::StoreFinallyRequest), 1);
  }

  impl Harness {
    fn storage_write_page(&self, page: &str) {
      self
        .store
        .storage
        .write_text(pagination::CURRENT_PAGE_KEY, page)
        .unwrap();
    }
  }
}
