//! Named-channel publish/subscribe bus.
//!
//! Every component talks to the others through an [`EventBus`] handle. The bus
//! is synchronous: `publish` runs each handler of the channel, in registration
//! order, before it returns. Handlers may publish or subscribe re-entrantly;
//! a publish works on a snapshot of the handler list taken before dispatch.
//!
//! The handle is cheap to clone and every clone addresses the same channel
//! table. There is no process-wide instance: the bus is created once by the
//! app and passed to the components that need it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::api::types::PageResponse;
use crate::store::pagination::PaginationInfo;
use crate::store::record::Record;
use crate::store::sort::SortDescriptor;

/// Bus channels shared between the store and the UI controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
  /// Ask the store to fetch the current page
  StoreRequest,
  /// A page arrived from the remote source
  StoreSuccess,
  /// The remote fetch failed
  StoreError,
  /// A fetch finished, whatever the outcome
  StoreFinallyRequest,
  /// Wipe the cached collection and sort state
  LocalStoreClear,
  /// The cache holds no records
  LocalStoreEmpty,
  /// The cached collection changed
  LocalStoreSuccess,
  /// The active sort descriptor changed
  LocalStoreUpdateSort,
  /// The pagination cursors changed
  LocalStoreUpdatePagination,
  /// Follow the `next` cursor
  PaginationNext,
  /// Follow the `previous` cursor
  PaginationPrev,
}

impl Channel {
  #[cfg(test)]
  pub const ALL: [Channel; 11] = [
    Channel::StoreRequest,
    Channel::StoreSuccess,
    Channel::StoreError,
    Channel::StoreFinallyRequest,
    Channel::LocalStoreClear,
    Channel::LocalStoreEmpty,
    Channel::LocalStoreSuccess,
    Channel::LocalStoreUpdateSort,
    Channel::LocalStoreUpdatePagination,
    Channel::PaginationNext,
    Channel::PaginationPrev,
  ];

  /// Wire name of the channel
  pub fn name(&self) -> &'static str {
    match self {
      Channel::StoreRequest => "store:request",
      Channel::StoreSuccess => "store:success",
      Channel::StoreError => "store:error",
      Channel::StoreFinallyRequest => "store:finallyRequest",
      Channel::LocalStoreClear => "localStore:clear",
      Channel::LocalStoreEmpty => "localStore:empty",
      Channel::LocalStoreSuccess => "localStore:success",
      Channel::LocalStoreUpdateSort => "localStore:updateSort",
      Channel::LocalStoreUpdatePagination => "localStore:updatePagination",
      Channel::PaginationNext => "pagination:next",
      Channel::PaginationPrev => "pagination:prev",
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Data carried by a published event
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  None,
  Page(PageResponse),
  Records(Vec<Record>),
  Sort(SortDescriptor),
  Pagination(PaginationInfo),
}

impl Payload {
  pub fn page(&self) -> Option<&PageResponse> {
    match self {
      Payload::Page(page) => Some(page),
      _ => None,
    }
  }

  pub fn records(&self) -> Option<&[Record]> {
    match self {
      Payload::Records(records) => Some(records),
      _ => None,
    }
  }

  pub fn sort(&self) -> Option<&SortDescriptor> {
    match self {
      Payload::Sort(sort) => Some(sort),
      _ => None,
    }
  }

  pub fn pagination(&self) -> Option<&PaginationInfo> {
    match self {
      Payload::Pagination(info) => Some(info),
      _ => None,
    }
  }
}

type Handler = Rc<dyn Fn(&Payload)>;

/// Shared handle to the channel table
#[derive(Clone, Default)]
pub struct EventBus {
  channels: Rc<RefCell<HashMap<Channel, Vec<Handler>>>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a handler on a channel. Handlers run in registration order.
  pub fn subscribe<F>(&self, channel: Channel, handler: F)
  where
    F: Fn(&Payload) + 'static,
  {
    self
      .channels
      .borrow_mut()
      .entry(channel)
      .or_default()
      .push(Rc::new(handler));
  }

  /// Drop every handler of a channel. Returns false if there were none.
  #[cfg(test)]
  pub fn unsubscribe(&self, channel: Channel) -> bool {
    self.channels.borrow_mut().remove(&channel).is_some()
  }

  /// Run every handler of `channel` with `payload`.
  ///
  /// Returns false, without side effects, when nobody listens on the channel.
  pub fn publish(&self, channel: Channel, payload: Payload) -> bool {
    let handlers: Vec<Handler> = match self.channels.borrow().get(&channel) {
      Some(handlers) => handlers.clone(),
      None => return false,
    };

    trace!(channel = %channel, handlers = handlers.len(), "publish");

    for handler in &handlers {
      handler(&payload);
    }
    true
  }

  /// Publish without a payload
  pub fn emit(&self, channel: Channel) -> bool {
    self.publish(channel, Payload::None)
  }
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let channels = self.channels.borrow();
    let mut names: Vec<&str> = channels.keys().map(Channel::name).collect();
    names.sort_unstable();
    f.debug_struct("EventBus").field("channels", &names).finish()
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;

  /// Records every event published on the watched channels, in order.
  #[derive(Clone, Default)]
  pub struct Recorder {
    events: Rc<RefCell<Vec<(Channel, Payload)>>>,
  }

  impl Recorder {
    pub fn watch(bus: &EventBus, channels: &[Channel]) -> Self {
      let recorder = Self::default();
      for &channel in channels {
        let events = recorder.events.clone();
        bus.subscribe(channel, move |payload| {
          events.borrow_mut().push((channel, payload.clone()));
        });
      }
      recorder
    }

    pub fn watch_all(bus: &EventBus) -> Self {
      Self::watch(bus, &Channel::ALL)
    }

    pub fn channels(&self) -> Vec<Channel> {
      self.events.borrow().iter().map(|(c, _)| *c).collect()
    }

    pub fn last(&self, channel: Channel) -> Option<Payload> {
      self
        .events
        .borrow()
        .iter()
        .rev()
        .find(|(c, _)| *c == channel)
        .map(|(_, p)| p.clone())
    }

    pub fn count(&self, channel: Channel) -> usize {
      self
        .events
        .borrow()
        .iter()
        .filter(|(c, _)| *c == channel)
        .count()
    }
  }
}
