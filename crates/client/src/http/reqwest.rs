use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{ClientError, Result};

pub const USER_AGENT: &str = concat!("gitpad/", env!("CARGO_PKG_VERSION"));
pub const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client configured for GitHub API usage.
    ///
    /// The connection timeout here is a backstop only; request deadlines are
    /// enforced by the watchdog so that timeouts can be retried.
    pub fn new() -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT_HEADER),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());

        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        map_response(response).await
    }
}

async fn map_response(value: reqwest::Response) -> Result<HttpResponse> {
    let status = value.status().as_u16();
    let headers = value
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect::<Vec<_>>();

    let body = value.bytes().await?.to_vec();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => ClientError::Transport(format!("{} ({})", value, status.as_u16())),
            None => ClientError::Transport(value.to_string()),
        }
    }
}
