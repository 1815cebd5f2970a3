//! Credential handling as seen by the gateway.
//!
//! [`AuthBackend`] is the collaborator contract the gatekeeper consumes.
//! [`GoogleOAuth`] is the production backend.

mod google;
mod store;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gdocs_core::AccountMode;
use thiserror::Error;

pub use google::{GoogleOAuth, OAuthClient};
pub use store::{StoredTokens, TokenStore};

/// A bearer token confirmed valid for the current call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field(
                "access_token",
                &format_args!("<{}>", gdocs_core::auth::token_fingerprint(&self.access_token)),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error(
        "OAuth client file not found at {0}. Download it from Google Cloud Console or set GOOGLE_OAUTH_CREDENTIALS."
    )]
    MissingClientConfig(PathBuf),
    #[error("invalid OAuth client file: {0}")]
    InvalidClientConfig(String),
    #[error("token store error: {0}")]
    Store(String),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("callback listener failed: {0}")]
    Callback(#[from] std::io::Error),
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    fn account_mode(&self) -> AccountMode;

    /// Whether usable tokens exist for `mode`, refreshing them if needed.
    async fn validate_tokens(&self, mode: AccountMode) -> bool;

    /// Run the consent flow. `Ok(false)` means the user did not complete it.
    async fn start_interactive_auth(&self, open_browser: bool) -> Result<bool, AuthFlowError>;

    /// The stored credential for `mode`, if it is currently fresh.
    async fn credential(&self, mode: AccountMode) -> Option<Credential>;
}
