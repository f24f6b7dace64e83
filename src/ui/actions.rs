//! User triggers that publish straight onto the bus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::pagination::PaginationView;
use super::visibility::{Region, VisibilityController};
use crate::bus::{Channel, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
  Fetch,
  Clear,
  PreviousPage,
  NextPage,
}

impl Trigger {
  pub const ALL: [Trigger; 4] = [
    Trigger::Fetch,
    Trigger::Clear,
    Trigger::PreviousPage,
    Trigger::NextPage,
  ];

  pub fn channel(self) -> Channel {
    match self {
      Trigger::Fetch => Channel::StoreRequest,
      Trigger::Clear => Channel::LocalStoreClear,
      Trigger::PreviousPage => Channel::PaginationPrev,
      Trigger::NextPage => Channel::PaginationNext,
    }
  }

  pub fn key(self) -> char {
    match self {
      Trigger::Fetch => 'f',
      Trigger::Clear => 'c',
      Trigger::PreviousPage => 'p',
      Trigger::NextPage => 'n',
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Trigger::Fetch => "fetch",
      Trigger::Clear => "clear",
      Trigger::PreviousPage => "prev",
      Trigger::NextPage => "next",
    }
  }

  pub fn from_key(key: KeyEvent) -> Option<Self> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
      return None;
    }
    match key.code {
      KeyCode::Char(c) => Self::ALL.into_iter().find(|t| t.key() == c),
      _ => None,
    }
  }

  /// Whether the control behind the trigger is currently usable
  pub fn enabled(self, visibility: &VisibilityController, pagination: &PaginationView) -> bool {
    match self {
      Trigger::Fetch => visibility.is_shown(Region::FetchControl),
      Trigger::Clear => visibility.is_shown(Region::ClearControl),
      Trigger::PreviousPage => pagination.has_previous(),
      Trigger::NextPage => pagination.has_next(),
    }
  }

  pub fn fire(self, bus: &EventBus) {
    debug!(trigger = self.label(), channel = %self.channel(), "Trigger fired");
    bus.emit(self.channel());
  }
}
