use std::cell::RefCell;
use std::rc::Rc;

use super::bind;
use crate::bus::{Channel, EventBus};
use crate::store::pagination::PaginationInfo;

/// Previous/next controls, enabled by the presence of a cursor
#[derive(Debug, Default)]
pub struct PaginationView {
  info: PaginationInfo,
}

impl PaginationView {
  pub fn attach(bus: &EventBus) -> Rc<RefCell<Self>> {
    let view = Rc::new(RefCell::new(Self::default()));
    bind(bus, Channel::LocalStoreUpdatePagination, &view, |view, payload| {
      if let Some(info) = payload.pagination() {
        view.info = info.clone();
      }
    });
    view
  }

  pub fn has_previous(&self) -> bool {
    self.info.previous.is_some()
  }

  pub fn has_next(&self) -> bool {
    self.info.next.is_some()
  }
}
