//! Terminal implementations of the client's consent and prompt hooks.
//!
//! Prompts go to stderr so that stdout only carries command output.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use gitpad_client::{AuthorizationGrant, ClientError, ConsentFlow, Interaction};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use url::Url;

type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Line reader shared by every prompt of the process.
#[derive(Clone)]
pub struct Terminal {
    input: Arc<Mutex<Input>>,
}

impl Terminal {
    pub fn stdin() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }

    pub fn with_input(input: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
        }
    }

    /// Shows `label` and reads one line. `None` on end of input.
    pub async fn ask(&self, label: &str) -> Option<String> {
        eprint!("{}", label);
        let _ = io::stderr().flush();

        let mut line = String::new();
        match self.input.lock().await.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Consent for terminals: the user opens the authorize URL in a browser and
/// pastes back the code the relay displays.
pub struct TerminalConsent {
    terminal: Terminal,
    remember: bool,
}

impl TerminalConsent {
    pub fn new(terminal: Terminal, remember: bool) -> Self {
        Self { terminal, remember }
    }
}

#[async_trait]
impl ConsentFlow for TerminalConsent {
    async fn request_grant(
        &self,
        authorize_url: &Url,
        _popup_name: &str,
    ) -> gitpad_client::Result<AuthorizationGrant> {
        eprintln!("🔑 Open this page to authorize gitpad:");
        eprintln!("   {}", authorize_url);

        let code = self
            .terminal
            .ask("Authorization code: ")
            .await
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ClientError::LoginFailed("no authorization code entered".to_string()))?;

        Ok(AuthorizationGrant::new(code, self.remember))
    }
}

pub struct TerminalInteraction {
    terminal: Terminal,
    message: Option<String>,
    assume_yes: bool,
}

impl TerminalInteraction {
    /// `message` answers commit message prompts without asking; `assume_yes`
    /// accepts every confirmation.
    pub fn new(terminal: Terminal, message: Option<String>, assume_yes: bool) -> Self {
        Self {
            terminal,
            message,
            assume_yes,
        }
    }
}

#[async_trait]
impl Interaction for TerminalInteraction {
    async fn prompt(&self, message: &str, default: &str) -> Option<String> {
        if let Some(preset) = &self.message {
            return Some(preset.clone());
        }

        let answer = self
            .terminal
            .ask(&format!("{} [{}]: ", message, default))
            .await?;
        if answer.trim().is_empty() {
            Some(default.to_string())
        } else {
            Some(answer)
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            eprintln!("{} (y/N): y", message);
            return true;
        }

        self.terminal
            .ask(&format!("{} (y/N): ", message))
            .await
            .is_some_and(|answer| answer.trim().to_lowercase().starts_with('y'))
    }

    async fn notify(&self, title: &str, message: &str) {
        eprintln!("❌ {}: {}", title, message);
    }
}
