use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::auth::{AuthSession, ConsentFlow, FileTokenStore, SessionState, TokenStore};
use crate::config::ClientConfig;
use crate::converter::FileConverter;
use crate::error::{ClientError, Result, RetryTarget};
use crate::executor::RequestExecutor;
use crate::gateway::RepoFileGateway;
use crate::http::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::interaction::Interaction;
use crate::locator::Locator;
use crate::models::{
    Branch, ContentItem, FileFlavor, RemoteFile, Repository, SaveOutcome, UserIdentity,
};
use crate::watchdog::Watchdog;

/// Common surface of storage providers that sign in through an
/// authorization flow.
#[async_trait]
pub trait AuthorizableClient: Send + Sync {
    /// Short provider identifier, e.g. `"github"`.
    fn provider(&self) -> &'static str;

    async fn authorize(&self) -> Result<()>;

    async fn ensure_user(&self) -> Result<UserIdentity>;

    async fn logout(&self) -> Result<()>;

    async fn session_state(&self) -> SessionState;
}

/// What a replayed step produced.
#[derive(Debug)]
pub enum RetryOutcome {
    Response(HttpResponse),
    User(UserIdentity),
    Authorized,
}

/// Entry point for editor integrations: sign-in plus file operations against
/// one GitHub account.
pub struct GitHubClient {
    config: Arc<ClientConfig>,
    session: Arc<AuthSession>,
    executor: Arc<RequestExecutor>,
    gateway: RepoFileGateway,
}

impl GitHubClient {
    pub fn builder(config: ClientConfig) -> GitHubClientBuilder {
        GitHubClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn gateway(&self) -> &RepoFileGateway {
        &self.gateway
    }

    pub async fn open_file(&self, locator: &Locator) -> Result<RemoteFile> {
        self.gateway.read_file(locator, FileFlavor::Document).await
    }

    pub async fn open_library(&self, locator: &Locator) -> Result<RemoteFile> {
        self.gateway.read_file(locator, FileFlavor::Library).await
    }

    /// Prepares a new, unsaved document in `folder`.
    pub async fn insert_file(
        &self,
        filename: &str,
        content: &[u8],
        folder: &Locator,
    ) -> Result<RemoteFile> {
        self.gateway
            .create_or_replace(filename, content, folder, FileFlavor::Document, false)
            .await
    }

    /// Writes a new library into `folder`.
    pub async fn insert_library(
        &self,
        filename: &str,
        content: &[u8],
        folder: &Locator,
        is_base64: bool,
    ) -> Result<RemoteFile> {
        self.gateway
            .create_or_replace(filename, content, folder, FileFlavor::Library, is_base64)
            .await
    }

    pub async fn save_file(&self, file: &mut RemoteFile) -> Result<SaveOutcome> {
        self.gateway.save_file(file).await
    }

    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.gateway.list_repositories().await
    }

    pub async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<Branch>> {
        self.gateway.list_branches(org, repo).await
    }

    pub async fn list_directory(&self, folder: &Locator) -> Result<Vec<ContentItem>> {
        self.gateway.list_directory(folder).await
    }

    /// Replays a step that previously timed out.
    ///
    /// A chained target replays its sign-in step and then the request that was
    /// waiting on it, so the outcome is that of the original call.
    pub async fn retry(&self, target: &RetryTarget) -> Result<RetryOutcome> {
        info!("Retrying timed out step");
        match target {
            RetryTarget::Then { first, next } => {
                Box::pin(self.retry(first)).await?;
                Box::pin(self.retry(next)).await
            }
            RetryTarget::Request(request) => self
                .executor
                .execute(request.clone())
                .await
                .map(RetryOutcome::Response),
            RetryTarget::CurrentUser => self.session.ensure_user().await.map(RetryOutcome::User),
            RetryTarget::TokenExchange { code, remember } => self
                .session
                .exchange_code(code, *remember)
                .await
                .map(|_| RetryOutcome::Authorized),
        }
    }

    /// Finishes a [`Self::save_file`] that timed out by replaying its write and
    /// recording the new version on `file`.
    pub async fn retry_save(
        &self,
        file: &mut RemoteFile,
        target: &RetryTarget,
    ) -> Result<SaveOutcome> {
        match self.retry(target).await? {
            RetryOutcome::Response(response) => self.gateway.complete_save(file, response, false),
            other => Err(ClientError::Parse(format!(
                "Retried step did not write {}: {:?}",
                file.meta.name, other
            ))),
        }
    }

    /// Responses that arrived after their request had already timed out.
    pub fn discarded_responses(&self) -> u64 {
        self.executor.watchdog().discarded()
    }
}

#[async_trait]
impl AuthorizableClient for GitHubClient {
    fn provider(&self) -> &'static str {
        "github"
    }

    async fn authorize(&self) -> Result<()> {
        self.session.authorize().await
    }

    async fn ensure_user(&self) -> Result<UserIdentity> {
        self.session.ensure_user().await
    }

    async fn logout(&self) -> Result<()> {
        self.session.logout().await
    }

    async fn session_state(&self) -> SessionState {
        self.session.state().await
    }
}

pub struct GitHubClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    consent: Option<Arc<dyn ConsentFlow>>,
    interaction: Option<Arc<dyn Interaction>>,
    tokens: Option<Arc<dyn TokenStore>>,
    converter: Option<Arc<dyn FileConverter>>,
}

impl GitHubClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            consent: None,
            interaction: None,
            tokens: None,
            converter: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn consent(mut self, consent: Arc<dyn ConsentFlow>) -> Self {
        self.consent = Some(consent);
        self
    }

    pub fn interaction(mut self, interaction: Arc<dyn Interaction>) -> Self {
        self.interaction = Some(interaction);
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn FileConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Validates the configuration and restores a remembered token.
    ///
    /// Without an explicit transport or token store, a [`ReqwestTransport`]
    /// and a [`FileTokenStore`] at its default location are used.
    pub async fn build(self) -> Result<GitHubClient> {
        self.config.validate()?;

        let consent = self
            .consent
            .ok_or_else(|| ClientError::Configuration("no consent flow configured".to_string()))?;
        let interaction = self
            .interaction
            .ok_or_else(|| ClientError::Configuration("no interaction configured".to_string()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(FileTokenStore::default()));

        let config = Arc::new(self.config);
        let watchdog = Arc::new(Watchdog::new(config.timeout()));
        let session = Arc::new(AuthSession::new(
            Arc::clone(&config),
            Arc::clone(&transport),
            consent,
            tokens,
            Arc::clone(&watchdog),
        ));
        session.restore().await?;

        let executor = Arc::new(RequestExecutor::new(
            Arc::clone(&session),
            transport,
            watchdog,
        ));
        let gateway = RepoFileGateway::new(
            Arc::clone(&config),
            Arc::clone(&executor),
            interaction,
            self.converter,
        );

        Ok(GitHubClient {
            config,
            session,
            executor,
            gateway,
        })
    }
}
