//! Interactive OAuth consent
//!
//! The session asks a [`ConsentFlow`] for an authorization code and never deals
//! with windows or redirects itself. [`PopupConsent`] is the flow used by hosts
//! that open the provider's consent page in a popup and receive the code through
//! a callback: every popup gets its own single-shot continuation, so a callback
//! can only ever complete the authorization that opened its popup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};

/// Handle to an open consent window, closed once the code has been exchanged.
pub trait ConsentWindow: Send {
    fn close(&mut self);
}

pub struct AuthorizationGrant {
    pub code: String,
    /// Persist the resulting token beyond this session.
    pub remember: bool,
    pub window: Option<Box<dyn ConsentWindow>>,
}

impl AuthorizationGrant {
    pub fn new(code: impl Into<String>, remember: bool) -> Self {
        Self {
            code: code.into(),
            remember,
            window: None,
        }
    }

    pub fn with_window(mut self, window: Box<dyn ConsentWindow>) -> Self {
        self.window = Some(window);
        self
    }
}

impl std::fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGrant")
            .field("remember", &self.remember)
            .field("window", &self.window.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Shows the consent page at `authorize_url` and waits for the provider to
    /// hand back an authorization code.
    async fn request_grant(&self, authorize_url: &Url, popup_name: &str)
    -> Result<AuthorizationGrant>;
}

pub type PopupId = u64;

/// Opens the consent page. The host delivers the resulting code back through
/// [`PopupConsent::deliver`] with the same popup id.
pub trait PopupOpener: Send + Sync {
    fn open(&self, popup: PopupId, url: &Url, name: &str) -> Result<Box<dyn ConsentWindow>>;
}

pub struct PopupConsent {
    opener: Arc<dyn PopupOpener>,
    remember: bool,
    next_id: AtomicU64,
    pending: Mutex<HashMap<PopupId, oneshot::Sender<String>>>,
}

impl PopupConsent {
    pub fn new(opener: Arc<dyn PopupOpener>, remember: bool) -> Self {
        Self {
            opener,
            remember,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Completes the authorization waiting on `popup`.
    ///
    /// Returns false if no authorization is waiting on that popup, either
    /// because it never existed or because it was already completed.
    pub fn deliver(&self, popup: PopupId, code: impl Into<String>) -> bool {
        let sender = self.lock_pending().remove(&popup);
        match sender {
            Some(sender) => sender.send(code.into()).is_ok(),
            None => {
                warn!("Ignoring consent callback for unknown popup #{}", popup);
                false
            }
        }
    }

    /// Abandons the authorization waiting on `popup`, e.g. when the user
    /// closed the window without granting access.
    pub fn abandon(&self, popup: PopupId) -> bool {
        self.lock_pending().remove(&popup).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<PopupId, oneshot::Sender<String>>> {
        // A poisoned map is still structurally valid.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ConsentFlow for PopupConsent {
    async fn request_grant(
        &self,
        authorize_url: &Url,
        popup_name: &str,
    ) -> Result<AuthorizationGrant> {
        let popup = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(popup, tx);

        let window = match self.opener.open(popup, authorize_url, popup_name) {
            Ok(window) => window,
            Err(e) => {
                self.lock_pending().remove(&popup);
                return Err(e);
            }
        };
        debug!("Opened consent popup #{}", popup);

        let code = rx.await.map_err(|_| {
            ClientError::LoginFailed("consent window was closed".to_string())
        })?;

        Ok(AuthorizationGrant::new(code, self.remember).with_window(window))
    }
}
