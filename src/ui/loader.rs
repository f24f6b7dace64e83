use std::cell::RefCell;
use std::rc::Rc;

use super::bind;
use crate::bus::{Channel, EventBus};

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠸", "⠴"];

/// Loading indicator shown while a fetch is in flight
#[derive(Debug, Default)]
pub struct Loader {
  loading: bool,
  frame: usize,
}

impl Loader {
  pub fn attach(bus: &EventBus) -> Rc<RefCell<Self>> {
    let loader = Rc::new(RefCell::new(Self::default()));
    bind(bus, Channel::StoreRequest, &loader, |loader, _| {
      loader.loading = true
    });
    bind(bus, Channel::StoreFinallyRequest, &loader, |loader, _| {
      loader.loading = false
    });
    loader
  }

  #[cfg(test)]
  pub fn is_loading(&self) -> bool {
    self.loading
  }

  /// Advance the spinner
  pub fn tick(&mut self) {
    if self.loading {
      self.frame = (self.frame + 1) % SPINNER.len();
    }
  }

  pub fn spinner(&self) -> Option<&'static str> {
    self.loading.then_some(SPINNER[self.frame])
  }
}
