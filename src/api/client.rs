use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::types::PageResponse;
use crate::bus::{Channel, EventBus, Payload};

/// HTTP GET primitive: returns the response body of `url`.
pub trait Transport: Send + Sync + 'static {
  fn get(&self, url: &str) -> BoxFuture<'static, Result<String>>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .user_agent(concat!("paged-table/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  fn get(&self, url: &str) -> BoxFuture<'static, Result<String>> {
    let request = self.client.get(url);
    let url = url.to_string();

    async move {
      let response = request
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?
        .error_for_status()
        .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?;

      response
        .text()
        .await
        .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))
    }
    .boxed()
  }
}

/// Decode a response body into a page
pub fn decode_page(body: &str) -> Result<PageResponse> {
  serde_json::from_str(body).map_err(|e| eyre!("Failed to decode page: {}", e))
}

/// Result of one fetch, waiting to be published on the UI thread
#[derive(Debug)]
pub enum FetchOutcome {
  Loaded { url: String, page: PageResponse },
  Failed { url: String, error: String },
}

/// Starts fetches in the background.
///
/// Each call to [`RemoteSource::fetch`] yields exactly one [`FetchOutcome`]
/// on the paired [`FetchQueue`].
#[derive(Clone)]
pub struct RemoteSource {
  transport: Arc<dyn Transport>,
  tx: mpsc::UnboundedSender<FetchOutcome>,
}

/// Receives fetch outcomes and publishes them on the bus.
pub struct FetchQueue {
  rx: mpsc::UnboundedReceiver<FetchOutcome>,
  bus: EventBus,
}

/// Create a connected source/queue pair
pub fn remote_source(transport: Arc<dyn Transport>, bus: EventBus) -> (RemoteSource, FetchQueue) {
  let (tx, rx) = mpsc::unbounded_channel();
  (RemoteSource { transport, tx }, FetchQueue { rx, bus })
}

impl RemoteSource {
  /// Issue one GET for `url`. Concurrent fetches are independent.
  pub fn fetch(&self, url: &str) {
    let url = url.to_string();
    let tx = self.tx.clone();

    let handle = match tokio::runtime::Handle::try_current() {
      Ok(handle) => handle,
      Err(e) => {
        // Still report completion so loading state is released
        let _ = tx.send(FetchOutcome::Failed {
          url,
          error: format!("No async runtime: {}", e),
        });
        return;
      }
    };

    let request = self.transport.get(&url);
    handle.spawn(async move {
      let outcome = match request.await.and_then(|body| decode_page(&body)) {
        Ok(page) => FetchOutcome::Loaded { url, page },
        Err(e) => FetchOutcome::Failed {
          url,
          error: format!("{:#}", e),
        },
      };
      // Ignore send errors - the queue may have been dropped on shutdown
      let _ = tx.send(outcome);
    });
  }
}

impl FetchQueue {
  /// Publish every outcome that has arrived. Returns how many there were.
  pub fn poll(&mut self) -> usize {
    let mut delivered = 0;
    while let Ok(outcome) = self.rx.try_recv() {
      self.deliver(outcome);
      delivered += 1;
    }
    delivered
  }

  /// Wait for the next outcome and publish it.
  #[cfg(test)]
  pub async fn next(&mut self) -> bool {
    match self.rx.recv().await {
      Some(outcome) => {
        self.deliver(outcome);
        true
      }
      None => false,
    }
  }

  fn deliver(&self, outcome: FetchOutcome) {
    match outcome {
      FetchOutcome::Loaded { url, page } => {
        info!(url = %url, records = page.results.len(), "Fetched page");
        self.bus.publish(Channel::StoreSuccess, Payload::Page(page));
      }
      FetchOutcome::Failed { url, error } => {
        error!(url = %url, "Failed to fetch data: {}", error);
        self.bus.emit(Channel::StoreError);
      }
    }
    debug!("Request finished");
    self.bus.emit(Channel::StoreFinallyRequest);
  }
}
