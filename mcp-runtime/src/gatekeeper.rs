//! Per-call credential guarantee.
//!
//! Every tool invocation passes through [`Gatekeeper::ensure_authenticated`]
//! before any upstream traffic. On stdio the user cannot see a consent page
//! mid-session, so an invalid credential is terminal there. On HTTP a
//! headless consent flow is attempted, at most one at a time.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::auth::{AuthBackend, Credential};
use crate::error::AuthenticationError;

const STDIO_REAUTH_MESSAGE: &str =
    "Authentication tokens are no longer valid. Please restart the server to re-authenticate.";
const HTTP_REAUTH_MESSAGE: &str = "Authentication required. Run `gdocs auth login`, or open the authorization URL printed in the server logs, then retry.";

/// How the gateway is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdio,
    Http,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stdio => "stdio",
            Channel::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Unknown,
    Valid,
    Invalid,
}

pub struct Gatekeeper {
    auth: Arc<dyn AuthBackend>,
    channel: Channel,
    state: RwLock<CredentialState>,
    reauth: Mutex<()>,
}

impl Gatekeeper {
    pub fn new(auth: Arc<dyn AuthBackend>, channel: Channel) -> Self {
        Self {
            auth,
            channel,
            state: RwLock::new(CredentialState::Unknown),
            reauth: Mutex::new(()),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub async fn state(&self) -> CredentialState {
        *self.state.read().await
    }

    async fn set_state(&self, next: CredentialState) {
        *self.state.write().await = next;
    }

    pub async fn ensure_authenticated(&self) -> Result<Credential, AuthenticationError> {
        if let Some(credential) = self.current_credential().await {
            self.set_state(CredentialState::Valid).await;
            return Ok(credential);
        }
        self.set_state(CredentialState::Invalid).await;

        match self.channel {
            Channel::Stdio => {
                tracing::warn!(event = "credential_invalid", channel = "stdio");
                Err(AuthenticationError::new(STDIO_REAUTH_MESSAGE))
            }
            Channel::Http => self.reauthenticate().await,
        }
    }

    async fn current_credential(&self) -> Option<Credential> {
        let mode = self.auth.account_mode();
        if !self.auth.validate_tokens(mode).await {
            return None;
        }
        self.auth.credential(mode).await
    }

    async fn reauthenticate(&self) -> Result<Credential, AuthenticationError> {
        let _guard = self.reauth.lock().await;

        // A flow that finished while we waited is reused.
        if let Some(credential) = self.current_credential().await {
            self.set_state(CredentialState::Valid).await;
            return Ok(credential);
        }

        tracing::info!(event = "reauth_started", channel = "http");
        match self.auth.start_interactive_auth(false).await {
            Ok(true) => match self.current_credential().await {
                Some(credential) => {
                    self.set_state(CredentialState::Valid).await;
                    tracing::info!(event = "reauth_completed", channel = "http");
                    Ok(credential)
                }
                None => Err(AuthenticationError::new(HTTP_REAUTH_MESSAGE)),
            },
            Ok(false) => {
                tracing::warn!(event = "reauth_incomplete", channel = "http");
                Err(AuthenticationError::new(HTTP_REAUTH_MESSAGE))
            }
            Err(err) => {
                tracing::warn!(event = "reauth_failed", channel = "http", error = %err);
                Err(AuthenticationError::new(format!(
                    "Re-authentication failed: {err}"
                )))
            }
        }
    }
}
