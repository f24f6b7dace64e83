//! Test transports.

use color_eyre::{eyre::eyre, Result};
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Mutex;

use super::client::Transport;

/// Answers every GET with a canned body, per URL or for all URLs.
#[derive(Default)]
pub struct FixedTransport {
  default: Option<String>,
  routes: HashMap<String, String>,
  pub requested: Mutex<Vec<String>>,
}

impl FixedTransport {
  /// Every request fails like a dropped connection
  pub fn failing() -> Self {
    Self::default()
  }

  pub fn body(body: &str) -> Self {
    Self {
      default: Some(body.to_string()),
      ..Self::default()
    }
  }

  pub fn route(mut self, url: &str, body: &str) -> Self {
    self.routes.insert(url.to_string(), body.to_string());
    self
  }
}

impl Transport for FixedTransport {
  fn get(&self, url: &str) -> BoxFuture<'static, Result<String>> {
    if let Ok(mut requested) = self.requested.lock() {
      requested.push(url.to_string());
    }

    let body = self
      .routes
      .get(url)
      .or(self.default.as_ref())
      .cloned()
      .ok_or_else(|| eyre!("connection refused: {}", url));
    future::ready(body).boxed()
  }
}
