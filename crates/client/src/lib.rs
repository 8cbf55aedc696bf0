//! GitPad Client - GitHub storage for a diagram editor
//!
//! This crate lets an editor open, create and save files in GitHub
//! repositories through the REST contents API. It takes care of the OAuth
//! authorization-code flow, attaches the access token to every call, enforces
//! request deadlines and protects saves against concurrent remote edits.
//!
//! # Features
//!
//! - **Sign-in**: consent window, code exchange through a relay, optional
//!   remembered token
//! - **Files**: read and write base64 content, guarded by the file's SHA
//! - **Conflicts**: confirm before replacing existing files or overwriting
//!   remote changes
//! - **Browsing**: repositories, branches and folder listings
//! - **Timeouts**: late responses are discarded and the step can be replayed
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gitpad_client::{ClientConfig, GitHubClient, Locator};
//! use gitpad_client::mock::{ScriptedInteraction, StaticConsent};
//!
//! # async fn example() -> gitpad_client::Result<()> {
//! let config = ClientConfig::new("client-id", "https://relay.example.com/github");
//! let client = GitHubClient::builder(config)
//!     .consent(Arc::new(StaticConsent::new("code")))
//!     .interaction(Arc::new(ScriptedInteraction::new()))
//!     .build()
//!     .await?;
//!
//! let locator: Locator = "org/repo/main/diagram.xml".parse()?;
//! let mut file = client.open_file(&locator).await?;
//! file.set_content("<mxfile/>");
//! client.save_file(&mut file).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod conflict;
pub mod converter;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod http;
pub mod interaction;
pub mod locator;
pub mod mock;
pub mod models;
pub mod watchdog;

pub use auth::{
    AuthSession, AuthorizationGrant, ConsentFlow, ConsentWindow, FileTokenStore,
    MemoryTokenStore, PopupConsent, PopupOpener, SessionState, TokenStore,
};
pub use client::{AuthorizableClient, GitHubClient, GitHubClientBuilder, RetryOutcome};
pub use config::ClientConfig;
pub use conflict::{ConflictResolver, ExistsResolution};
pub use converter::{ConversionSource, FileConverter};
pub use error::{ClientError, Result, RetryTarget, format_file_size};
pub use executor::RequestExecutor;
pub use gateway::RepoFileGateway;
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
pub use interaction::Interaction;
pub use locator::Locator;
pub use models::{
    Branch, CommitInfo, ContentItem, ContentType, FileFlavor, FileMeta, RemoteFile, Repository,
    SaveOutcome, UserIdentity,
};
pub use watchdog::Watchdog;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
