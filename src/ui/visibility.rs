use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use super::bind;
use crate::bus::{Channel, EventBus};

/// Screen regions whose visibility follows the store state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
  ErrorBanner,
  FetchControl,
  Placeholder,
  Table,
  ClearControl,
}

/// Which regions each channel brings up
const GROUPS: [(Channel, &[Region]); 4] = [
  (Channel::StoreError, &[Region::ErrorBanner, Region::FetchControl]),
  (Channel::LocalStoreClear, &[Region::Placeholder, Region::FetchControl]),
  (Channel::LocalStoreSuccess, &[Region::Table, Region::ClearControl]),
  (Channel::LocalStoreEmpty, &[Region::Placeholder, Region::FetchControl]),
];

#[derive(Debug)]
pub struct VisibilityController {
  shown: BTreeSet<Region>,
}

impl Default for VisibilityController {
  fn default() -> Self {
    Self {
      shown: BTreeSet::from([Region::Placeholder, Region::FetchControl]),
    }
  }
}

impl VisibilityController {
  pub fn attach(bus: &EventBus) -> Rc<RefCell<Self>> {
    let controller = Rc::new(RefCell::new(Self::default()));
    for (index, (channel, _)) in GROUPS.iter().enumerate() {
      bind(bus, *channel, &controller, move |visibility, _| {
        visibility.activate(index)
      });
    }
    controller
  }

  /// Hide every region of the other groups, then show the group's own.
  fn activate(&mut self, index: usize) {
    for (other, (_, regions)) in GROUPS.iter().enumerate() {
      if other != index {
        for region in regions.iter() {
          self.shown.remove(region);
        }
      }
    }
    self.shown.extend(GROUPS[index].1.iter().copied());
  }

  pub fn is_shown(&self, region: Region) -> bool {
    self.shown.contains(&region)
  }
}
