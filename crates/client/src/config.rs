//! Client configuration
//!
//! Holds the provider endpoints, OAuth application identity and the limits the
//! client enforces. Every field has a serde default so a partial JSON document
//! (as written by the CLI) deserializes into a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_AUTH_BASE: &str = "https://github.com";
pub const DEFAULT_SCOPE: &str = "repo";
/// Request deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 25_000;
/// Maximum file size accepted by the contents API.
pub const DEFAULT_MAX_FILE_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// OAuth application client id.
    #[serde(default)]
    pub client_id: String,
    /// First-party relay that trades an authorization code for a token.
    #[serde(default)]
    pub exchange_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Window name used for the consent popup.
    #[serde(default = "default_popup_name")]
    pub popup_name: String,
    /// Extension given to files produced by the converter.
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_auth_base() -> String {
    DEFAULT_AUTH_BASE.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_file_size() -> usize {
    DEFAULT_MAX_FILE_SIZE
}

fn default_popup_name() -> String {
    "oauth".to_string()
}

fn default_extension() -> String {
    ".xml".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            exchange_url: String::new(),
            scope: default_scope(),
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            timeout_ms: default_timeout_ms(),
            max_file_size: default_max_file_size(),
            popup_name: default_popup_name(),
            default_extension: default_extension(),
        }
    }
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, exchange_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            exchange_url: exchange_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(ClientError::Configuration(
                "client_id must be set".to_string(),
            ));
        }
        if self.exchange_url.trim().is_empty() {
            return Err(ClientError::Configuration(
                "exchange_url must be set".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::Configuration(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        parse_url("exchange_url", &self.exchange_url)?;
        parse_url("api_base", &self.api_base)?;
        parse_url("auth_base", &self.auth_base)?;
        Ok(())
    }

    /// `https://github.com/login/oauth/authorize?client_id=..&scope=repo`
    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = parse_url("auth_base", &self.auth_base)?;
        url.path_segments_mut()
            .map_err(|_| cannot_be_base("auth_base"))?
            .pop_if_empty()
            .extend(["login", "oauth", "authorize"]);
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scope);
        Ok(url)
    }

    pub fn exchange_url(&self, code: &str) -> Result<Url> {
        let mut url = parse_url("exchange_url", &self.exchange_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("code", code);
        Ok(url)
    }

    /// Joins path segments onto the API base, percent-encoding each one.
    pub fn api_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = parse_url("api_base", &self.api_base)?;
        url.path_segments_mut()
            .map_err(|_| cannot_be_base("api_base"))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|e| ClientError::Configuration(format!("Invalid {} '{}': {}", field, value, e)))
}

fn cannot_be_base(field: &str) -> ClientError {
    ClientError::Configuration(format!("{} cannot be used as a base URL", field))
}
