//! Scripted test doubles for the client's collaborators.
//!
//! [`MockTransport`] answers requests from a queue of canned replies and keeps
//! every request it saw. [`StaticConsent`] grants a fixed code without any UI,
//! and [`ScriptedInteraction`] answers prompts from queues.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::auth::consent::{AuthorizationGrant, ConsentFlow, ConsentWindow};
use crate::error::{ClientError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::interaction::Interaction;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone)]
enum Reply {
    Response {
        status: u16,
        body: Vec<u8>,
        delay: Option<Duration>,
    },
    Error(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Option<Method>,
    path_fragment: String,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.method.is_none_or(|m| m == request.method)
            && request.url.path().contains(&self.path_fragment)
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    route: Option<Route>,
    reply: Reply,
}

/// Transport that replays scripted replies.
///
/// Each request consumes the first queued reply whose route matches it
/// (unrouted replies match anything). A request with no matching reply fails
/// with [`ClientError::Transport`].
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(&self, route: Option<Route>, reply: Reply) {
        lock(&self.script).push_back(Scripted { route, reply });
    }

    pub fn push(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.enqueue(
            None,
            Reply::Response {
                status,
                body: body.into(),
                delay: None,
            },
        );
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push(status, body.to_string());
    }

    pub fn push_delayed(&self, delay: Duration, status: u16, body: impl Into<Vec<u8>>) {
        self.enqueue(
            None,
            Reply::Response {
                status,
                body: body.into(),
                delay: Some(delay),
            },
        );
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.enqueue(None, Reply::Error(message.into()));
    }

    /// Queues a reply only for requests with `method` whose URL path contains
    /// `path_fragment`.
    pub fn on(
        &self,
        method: Method,
        path_fragment: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) {
        self.enqueue(
            Some(Route {
                method: Some(method),
                path_fragment: path_fragment.into(),
            }),
            Reply::Response {
                status,
                body: body.into(),
                delay: None,
            },
        );
    }

    pub fn on_json(
        &self,
        method: Method,
        path_fragment: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) {
        self.on(method, path_fragment, status, body.to_string());
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests with `method` whose URL path contains `path_fragment`.
    pub fn requests_to(&self, method: Method, path_fragment: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.url.path().contains(path_fragment))
            .cloned()
            .collect()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let reply = {
            let mut script = lock(&self.script);
            let position = script
                .iter()
                .position(|s| s.route.as_ref().is_none_or(|r| r.matches(&request)));
            position.and_then(|index| script.remove(index))
        };
        lock(&self.requests).push(request.clone());

        match reply.map(|s| s.reply) {
            Some(Reply::Response {
                status,
                body,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(HttpResponse::new(status, body))
            }
            Some(Reply::Error(message)) => Err(ClientError::Transport(message)),
            None => Err(ClientError::Transport(format!(
                "no scripted response for {} {}",
                request.method, request.url
            ))),
        }
    }
}

struct CountingWindow(Arc<AtomicUsize>);

impl ConsentWindow for CountingWindow {
    fn close(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Consent flow that immediately grants a fixed code.
#[derive(Debug, Default)]
pub struct StaticConsent {
    code: String,
    remember: bool,
    declined: bool,
    requested: AtomicUsize,
    closed: Arc<AtomicUsize>,
    urls: Mutex<Vec<Url>>,
}

impl StaticConsent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// A flow in which the user never grants access.
    pub fn declining() -> Self {
        Self {
            declined: true,
            ..Self::default()
        }
    }

    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    pub fn grants_requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn closed_windows(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn authorize_urls(&self) -> Vec<Url> {
        lock(&self.urls).clone()
    }
}

#[async_trait]
impl ConsentFlow for StaticConsent {
    async fn request_grant(
        &self,
        authorize_url: &Url,
        _popup_name: &str,
    ) -> Result<AuthorizationGrant> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        lock(&self.urls).push(authorize_url.clone());

        if self.declined {
            return Err(ClientError::LoginFailed(
                "consent window was closed".to_string(),
            ));
        }

        Ok(AuthorizationGrant::new(self.code.clone(), self.remember)
            .with_window(Box::new(CountingWindow(Arc::clone(&self.closed)))))
    }
}

/// Interaction that answers from queues and records what it was asked.
///
/// Unanswered prompts accept the suggested default; unanswered confirmations
/// are declined.
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    prompt_answers: Mutex<VecDeque<Option<String>>>,
    confirm_answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
    confirms: Mutex<Vec<String>>,
    notices: Mutex<Vec<(String, String)>>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_prompt(self, answer: Option<&str>) -> Self {
        lock(&self.prompt_answers).push_back(answer.map(str::to_string));
        self
    }

    pub fn answer_confirm(self, answer: bool) -> Self {
        lock(&self.confirm_answers).push_back(answer);
        self
    }

    /// Prompt messages in the order they were shown, with their defaults.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn confirms(&self) -> Vec<String> {
        lock(&self.confirms).clone()
    }

    pub fn notices(&self) -> Vec<(String, String)> {
        lock(&self.notices).clone()
    }
}

#[async_trait]
impl Interaction for ScriptedInteraction {
    async fn prompt(&self, message: &str, default: &str) -> Option<String> {
        lock(&self.prompts).push(format!("{}: {}", message, default));
        lock(&self.prompt_answers)
            .pop_front()
            .unwrap_or_else(|| Some(default.to_string()))
    }

    async fn confirm(&self, message: &str) -> bool {
        lock(&self.confirms).push(message.to_string());
        lock(&self.confirm_answers).pop_front().unwrap_or(false)
    }

    async fn notify(&self, title: &str, message: &str) {
        lock(&self.notices).push((title.to_string(), message.to_string()));
    }
}
