//! Access token and user identity
//!
//! [`AuthSession`] owns the session state: the bearer token and, once resolved,
//! the authenticated user. It drives the authorization-code exchange through
//! the configured relay and re-authorizes on demand when the provider rejects
//! the token.

pub mod consent;
pub mod token_store;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, RetryTarget};
use crate::http::{HttpRequest, HttpTransport};
use crate::models::{UserIdentity, UserResponse};
use crate::watchdog::Watchdog;

pub use consent::{AuthorizationGrant, ConsentFlow, ConsentWindow, PopupConsent, PopupOpener};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// The session object populated by authorization and user lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserIdentity>,
}

pub struct AuthSession {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    consent: Arc<dyn ConsentFlow>,
    tokens: Arc<dyn TokenStore>,
    watchdog: Arc<Watchdog>,
    state: RwLock<SessionState>,
}

impl AuthSession {
    pub fn new(
        config: Arc<ClientConfig>,
        transport: Arc<dyn HttpTransport>,
        consent: Arc<dyn ConsentFlow>,
        tokens: Arc<dyn TokenStore>,
        watchdog: Arc<Watchdog>,
    ) -> Self {
        Self {
            config,
            transport,
            consent,
            tokens,
            watchdog,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Loads a remembered token into the session. Returns true if one was found.
    pub async fn restore(&self) -> Result<bool> {
        match self.tokens.load().await? {
            Some(token) => {
                debug!("Restored persisted access token");
                self.state.write().await.token = Some(token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn user(&self) -> Option<UserIdentity> {
        self.state.read().await.user.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Runs the interactive consent flow and exchanges the resulting code for
    /// an access token.
    pub async fn authorize(&self) -> Result<()> {
        let url = self.config.authorize_url()?;
        info!("Requesting authorization from {}", self.config.auth_base);

        let mut grant = self
            .consent
            .request_grant(&url, &self.config.popup_name)
            .await?;

        let result = self.exchange_code(&grant.code, grant.remember).await;

        if let Some(mut window) = grant.window.take() {
            window.close();
        }

        result
    }

    /// Trades an authorization code for a token via the relay and installs it.
    pub async fn exchange_code(&self, code: &str, remember: bool) -> Result<()> {
        let url = self.config.exchange_url(code)?;
        let retry = RetryTarget::TokenExchange {
            code: code.to_string(),
            remember,
        };

        let response = self
            .watchdog
            .send(Arc::clone(&self.transport), HttpRequest::get(url), retry)
            .await?;

        if !response.is_success() {
            return Err(ClientError::LoginFailed(format!(
                "token exchange returned status {}",
                response.status
            )));
        }

        let token = parse_token_response(response.text()?)?;
        self.state.write().await.token = Some(token.clone());

        if remember {
            self.tokens.save(&token).await?;
        }

        info!("Authorization complete");
        Ok(())
    }

    /// Resolves the authenticated user, authorizing first if there is no token.
    pub async fn ensure_user(&self) -> Result<UserIdentity> {
        if self.token().await.is_none() {
            self.authorize()
                .await
                .map_err(|e| e.then_retry(RetryTarget::CurrentUser))?;
        }

        let mut reauthorized = false;
        loop {
            let token = self.token().await.ok_or(ClientError::NotAuthorized)?;
            let request = HttpRequest::get(self.config.api_url(["user"])?)
                .with_header("Authorization", format!("token {}", token));

            let response = self
                .watchdog
                .send(
                    Arc::clone(&self.transport),
                    request,
                    RetryTarget::CurrentUser,
                )
                .await?;

            match response.status {
                401 if !reauthorized => {
                    debug!("Token rejected while resolving user, re-authorizing");
                    self.authorize()
                        .await
                        .map_err(|e| e.then_retry(RetryTarget::CurrentUser))?;
                    reauthorized = true;
                }
                200..=299 => {
                    let user = UserIdentity::from(response.json::<UserResponse>()?);
                    info!("Signed in as user {}", user.id);
                    self.state.write().await.user = Some(user.clone());
                    return Ok(user);
                }
                _ => return Err(ClientError::AccessDenied),
            }
        }
    }

    /// Returns a token for an authenticated call, authorizing and resolving
    /// the user first when the session has neither.
    pub(crate) async fn ready_token(&self) -> Result<String> {
        if self.token().await.is_none() {
            self.authorize().await?;
        }

        if self.user().await.is_none() {
            self.ensure_user().await?;
        }

        self.token().await.ok_or(ClientError::NotAuthorized)
    }

    /// Forgets the token (in memory and persisted) and the user.
    pub async fn logout(&self) -> Result<()> {
        *self.state.write().await = SessionState::default();
        self.tokens.clear().await?;
        info!("Logged out");
        Ok(())
    }
}

/// Extracts `access_token` from the relay's form-encoded response.
fn parse_token_response(body: &str) -> Result<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.trim().as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if let Some((_, token)) = pairs.iter().find(|(k, _)| k == "access_token") {
        if !token.is_empty() {
            return Ok(token.clone());
        }
    }

    let field = |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    let reason = field("error_description")
        .or_else(|| field("error"))
        .unwrap_or_else(|| "no access token in response".to_string());

    Err(ClientError::LoginFailed(reason))
}
