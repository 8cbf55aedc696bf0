use std::time::Duration;

use thiserror::Error;

use crate::http::HttpRequest;

/// Describes the step that timed out so the caller can replay it later.
///
/// A timed-out operation is never retried automatically; the UI decides whether
/// to offer a retry and hands this back to [`crate::GitHubClient::retry`].
#[derive(Debug, Clone)]
pub enum RetryTarget {
    /// An authenticated API request issued through the executor.
    Request(HttpRequest),
    /// The current-user lookup performed by the session.
    CurrentUser,
    /// The authorization-code exchange with the token relay.
    TokenExchange { code: String, remember: bool },
    /// `first` timed out while it was preparing `next`; both run on retry.
    Then {
        first: Box<RetryTarget>,
        next: Box<RetryTarget>,
    },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration, retry: RetryTarget },

    #[error("Access denied")]
    AccessDenied,

    #[error("Forbidden")]
    Forbidden,

    #[error("The file is too large")]
    TooLarge,

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("The remote file has been changed")]
    Conflict,

    #[error("Error {status}")]
    Http { status: u16 },

    #[error("Cannot log in: {0}")]
    LoginFailed(String),

    #[error("The file is too large ({})", describe_size(.size, .limit))]
    SizeExceeded { size: usize, limit: usize },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("No converter available for '{0}'")]
    ConversionUnavailable(String),

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Invalid locator '{0}': expected org/repo/ref/path")]
    InvalidLocator(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// The provider rejected a write because the SHA it carried is stale.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict)
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClientError::Timeout { .. } | ClientError::Transport(_))
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ClientError::Cancelled
                | ClientError::InvalidLocator(_)
                | ClientError::SizeExceeded { .. }
                | ClientError::TooLarge
        )
    }

    /// Returns the replayable step when this error is a timeout.
    pub fn retry_target(&self) -> Option<&RetryTarget> {
        match self {
            ClientError::Timeout { retry, .. } => Some(retry),
            _ => None,
        }
    }

    /// Makes a timeout's replay continue with `next` once its own step is done.
    /// Other errors are returned unchanged.
    pub(crate) fn then_retry(self, next: RetryTarget) -> Self {
        match self {
            ClientError::Timeout { after, retry } => ClientError::Timeout {
                after,
                retry: RetryTarget::Then {
                    first: Box::new(retry),
                    next: Box::new(next),
                },
            },
            other => other,
        }
    }
}

fn describe_size(size: &usize, limit: &usize) -> String {
    format!("{} / {}", format_file_size(*size), format_file_size(*limit))
}

/// Formats a byte count the way the editor shows file sizes (`512 B`, `1.2 MB`).
pub fn format_file_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1000.0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let rounded = format!("{:.1}", value);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", trimmed, UNITS[unit])
}
