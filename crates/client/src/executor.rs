//! Authenticated request execution
//!
//! Every API call goes through [`RequestExecutor::execute`], which makes sure
//! the session has a token and a resolved user, attaches the token, enforces the
//! deadline and turns the provider's status codes into [`ClientError`]s:
//!
//! | status | outcome |
//! |---|---|
//! | 2xx | `Ok(response)` |
//! | 401 | re-authorize once and replay, then [`ClientError::AccessDenied`] |
//! | 403 | [`ClientError::TooLarge`] or [`ClientError::Forbidden`] |
//! | 404 | [`ClientError::NotFound`] |
//! | 409 | [`ClientError::Conflict`] |
//! | other | [`ClientError::Http`] |

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::AuthSession;
use crate::error::{ClientError, Result, RetryTarget};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::watchdog::Watchdog;

pub struct RequestExecutor {
    session: Arc<AuthSession>,
    transport: Arc<dyn HttpTransport>,
    watchdog: Arc<Watchdog>,
}

impl RequestExecutor {
    pub fn new(
        session: Arc<AuthSession>,
        transport: Arc<dyn HttpTransport>,
        watchdog: Arc<Watchdog>,
    ) -> Self {
        Self {
            session,
            transport,
            watchdog,
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn watchdog(&self) -> &Arc<Watchdog> {
        &self.watchdog
    }

    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut reauthorized = false;

        loop {
            let token = self
                .session
                .ready_token()
                .await
                .map_err(|e| e.then_retry(RetryTarget::Request(request.clone())))?;

            let mut authorized = request.clone();
            authorized.set_header("Authorization", format!("token {}", token));

            let response = self
                .watchdog
                .send(
                    Arc::clone(&self.transport),
                    authorized,
                    RetryTarget::Request(request.clone()),
                )
                .await?;

            match response.status {
                200..=299 => return Ok(response),
                401 if !reauthorized => {
                    info!("Access token rejected, re-authorizing");
                    self.session
                        .authorize()
                        .await
                        .map_err(|e| e.then_retry(RetryTarget::Request(request.clone())))?;
                    reauthorized = true;
                }
                401 => return Err(ClientError::AccessDenied),
                403 if is_too_large(&response) => return Err(ClientError::TooLarge),
                403 => return Err(ClientError::Forbidden),
                404 => return Err(ClientError::NotFound(request.url.to_string())),
                409 => {
                    debug!("Conflict reported for {} {}", request.method, request.url);
                    return Err(ClientError::Conflict);
                }
                status => return Err(ClientError::Http { status }),
            }
        }
    }

    pub async fn execute_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        self.execute(request).await?.json()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<String>,
}

/// Matches `{"errors": [{"code": "too_large"}]}`, the provider's way of
/// rejecting oversized content. Only the first entry is inspected.
fn is_too_large(response: &HttpResponse) -> bool {
    response
        .json::<ErrorBody>()
        .ok()
        .and_then(|body| body.errors.into_iter().next())
        .and_then(|entry| entry.code)
        .is_some_and(|code| code == "too_large")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::config::ClientConfig;
    use crate::mock::{MockTransport, StaticConsent};
    use serde_json::json;
    use std::time::Duration;
    use url::Url;

    struct Fixture {
        transport: Arc<MockTransport>,
        consent: Arc<StaticConsent>,
        executor: RequestExecutor,
    }

    async fn fixture(saved_token: Option<&str>, timeout: Duration) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let consent = Arc::new(StaticConsent::new("code"));
        let tokens = Arc::new(match saved_token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        });
        let watchdog = Arc::new(Watchdog::new(timeout));
        let session = Arc::new(AuthSession::new(
            Arc::new(ClientConfig::new("cid", "https://relay.example.com/github")),
            transport.clone(),
            consent.clone(),
            tokens,
            Arc::clone(&watchdog),
        ));
        session.restore().await.unwrap();

        Fixture {
            executor: RequestExecutor::new(session, transport.clone(), watchdog),
            transport,
            consent,
        }
    }

    fn branches_request() -> HttpRequest {
        HttpRequest::get(Url::parse("https://api.github.com/repos/a/b/branches").unwrap())
    }

    #[tokio::test]
    async fn test_without_token_authorizes_before_sending() {
        let f = fixture(None, Duration::from_secs(5)).await;
        f.transport.push(200, "access_token=new");
        f.transport.push_json(200, json!({"id": 1}));
        f.transport.push_json(200, json!([{"name": "main"}]));

        f.executor.execute(branches_request()).await.unwrap();

        assert_eq!(f.consent.grants_requested(), 1);
        let requests = f.transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].url.as_str().starts_with("https://relay.example.com/github"));
        assert_eq!(requests[1].url.path(), "/user");
        assert_eq!(requests[2].url.path(), "/repos/a/b/branches");
        assert_eq!(requests[2].header("Authorization"), Some("token new"));
    }

    #[tokio::test]
    async fn test_user_is_resolved_once_per_session() {
        let f = fixture(Some("t"), Duration::from_secs(5)).await;
        f.transport.push_json(200, json!({"id": 1}));
        f.transport.push_json(200, json!([]));
        f.transport.push_json(200, json!([]));

        f.executor.execute(branches_request()).await.unwrap();
        f.executor.execute(branches_request()).await.unwrap();

        let user_lookups = f
            .transport
            .requests()
            .iter()
            .filter(|r| r.url.path() == "/user")
            .count();
        assert_eq!(user_lookups, 1);
        assert_eq!(f.consent.grants_requested(), 0);
    }

    #[tokio::test]
    async fn test_401_reauthorizes_and_retries_once() {
        let f = fixture(Some("stale"), Duration::from_secs(5)).await;
        f.transport.push_json(200, json!({"id": 1}));
        f.transport.push(401, "");
        f.transport.push(200, "access_token=fresh");
        f.transport.push_json(200, json!([]));

        let response = f.executor.execute(branches_request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(f.consent.grants_requested(), 1);

        let requests = f.transport.requests();
        assert_eq!(requests[1].header("Authorization"), Some("token stale"));
        assert_eq!(requests[3].header("Authorization"), Some("token fresh"));
    }

    #[tokio::test]
    async fn test_second_401_does_not_loop() {
        let f = fixture(Some("stale"), Duration::from_secs(5)).await;
        f.transport.push_json(200, json!({"id": 1}));
        f.transport.push(401, "");
        f.transport.push(200, "access_token=fresh");
        f.transport.push(401, "");

        let err = f.executor.execute(branches_request()).await.unwrap_err();

        assert!(matches!(err, ClientError::AccessDenied));
        assert_eq!(f.consent.grants_requested(), 1);
        assert_eq!(f.transport.request_count(), 4);
        assert_eq!(f.transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases: Vec<(u16, &str)> = vec![
            (403, r#"{"errors": [{"code": "too_large"}]}"#),
            (403, r#"{"message": "rate limited"}"#),
            (403, "not json"),
            (404, "{}"),
            (409, "{}"),
            (500, "{}"),
        ];

        let mut outcomes = Vec::new();
        for (status, body) in cases {
            let f = fixture(Some("t"), Duration::from_secs(5)).await;
            f.transport.push_json(200, json!({"id": 1}));
            f.transport.push(status, body);
            outcomes.push(f.executor.execute(branches_request()).await.unwrap_err());
        }

        assert!(matches!(outcomes[0], ClientError::TooLarge));
        assert!(matches!(outcomes[1], ClientError::Forbidden));
        assert!(matches!(outcomes[2], ClientError::Forbidden));
        assert!(matches!(outcomes[3], ClientError::NotFound(_)));
        assert!(outcomes[4].is_conflict());
        assert!(matches!(outcomes[5], ClientError::Http { status: 500 }));
    }

    #[tokio::test]
    async fn test_too_large_only_checks_first_error() {
        let response = HttpResponse::new(
            403,
            r#"{"errors": [{"code": "invalid"}, {"code": "too_large"}]}"#,
        );
        assert!(!is_too_large(&response));
    }

    #[tokio::test]
    async fn test_timeout_retry_target_has_no_token() {
        let f = fixture(Some("secret"), Duration::from_millis(20)).await;
        f.transport.push_json(200, json!({"id": 1}));
        f.transport.push_delayed(Duration::from_millis(300), 200, "[]");

        let err = f.executor.execute(branches_request()).await.unwrap_err();

        match err.retry_target() {
            Some(RetryTarget::Request(request)) => {
                assert_eq!(request.url.path(), "/repos/a/b/branches");
                assert!(request.header("Authorization").is_none());
            }
            other => panic!("unexpected retry target: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_user_lookup_timeout_keeps_pending_request() {
        let f = fixture(Some("t"), Duration::from_millis(20)).await;
        f.transport.push_delayed(Duration::from_millis(300), 200, r#"{"id": 1}"#);

        let err = f.executor.execute(branches_request()).await.unwrap_err();

        match err.retry_target() {
            Some(RetryTarget::Then { first, next }) => {
                assert!(matches!(**first, RetryTarget::CurrentUser));
                match &**next {
                    RetryTarget::Request(request) => {
                        assert_eq!(request.url.path(), "/repos/a/b/branches")
                    }
                    other => panic!("unexpected follow-up: {:?}", other),
                }
            }
            other => panic!("unexpected retry target: {:?}", other),
        }
    }
}
