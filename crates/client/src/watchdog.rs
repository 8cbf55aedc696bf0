//! Request deadlines
//!
//! Each request runs on its own task and reports back over a oneshot channel.
//! When the deadline passes first, the request's [`PendingRequest`] is
//! cancelled and the caller gets [`ClientError::Timeout`]. The transport is
//! left to finish; whatever it eventually returns is dropped rather than
//! delivered, so a late response can never complete an operation twice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ClientError, Result, RetryTarget};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Cancellation token for one in-flight request.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    id: u64,
    accepted: Arc<AtomicBool>,
}

impl PendingRequest {
    fn new(id: u64) -> Self {
        Self {
            id,
            accepted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn accepts_response(&self) -> bool {
        self.accepted.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.accepted.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    next_id: AtomicU64,
    discarded: Arc<AtomicU64>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            next_id: AtomicU64::new(1),
            discarded: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of responses that arrived after their deadline and were dropped.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Sends `request` and waits at most [`Self::timeout`] for the response.
    pub async fn send(
        &self,
        transport: Arc<dyn HttpTransport>,
        request: HttpRequest,
        retry: RetryTarget,
    ) -> Result<HttpResponse> {
        let pending = PendingRequest::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();

        let task_pending = pending.clone();
        let discarded = Arc::clone(&self.discarded);
        let label = format!("{} {}", request.method, request.url);
        tokio::spawn(async move {
            let outcome = transport.send(request).await;

            if !task_pending.accepts_response() || tx.send(outcome).is_err() {
                discarded.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "Discarded late response for request #{} ({})",
                    task_pending.id(),
                    label
                );
            }
        });

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::Transport(
                "Request was dropped before a response arrived".to_string(),
            )),
            Err(_) => {
                pending.cancel();
                warn!(
                    "Request #{} timed out after {:?}",
                    pending.id(),
                    self.timeout
                );
                Err(ClientError::Timeout {
                    after: self.timeout,
                    retry,
                })
            }
        }
    }
}
