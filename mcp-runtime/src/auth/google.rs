use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gdocs_core::AccountMode;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use super::store::{StoredTokens, TokenStore};
use super::{AuthBackend, AuthFlowError, Credential};
use crate::config::AuthConfig;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CALLBACK_PATH: &str = "/oauth2callback";
const REFRESH_BUFFER_MINUTES: i64 = 5;

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive",
];

/// An installed-app OAuth client as downloaded from Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

impl OAuthClient {
    /// Accepts `{"installed": {...}}`, `{"web": {...}}` or a bare client object.
    pub fn from_json(raw: &str) -> Result<Self, AuthFlowError> {
        let wrapped: Option<ClientFile> = serde_json::from_str(raw).ok();
        if let Some(client) = wrapped.and_then(|file| file.installed.or(file.web)) {
            return Ok(client);
        }
        serde_json::from_str(raw).map_err(|e| AuthFlowError::InvalidClientConfig(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthFlowError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|_| AuthFlowError::MissingClientConfig(path.to_path_buf()))?;
        Self::from_json(&raw)
    }

    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<url::Url, AuthFlowError> {
        let scope = SCOPES.join(" ");
        url::Url::parse_with_params(
            &self.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("state", state),
            ],
        )
        .map_err(|e| AuthFlowError::InvalidClientConfig(format!("auth_uri: {e}")))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredTokens {
        StoredTokens {
            access_token: self.access_token,
            // Google omits the refresh token on refresh grants.
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: Utc::now() + chrono::Duration::seconds(self.expires_in),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

/// What the loopback listener received.
#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    Code { code: String, state: Option<String> },
    Denied(String),
}

/// Google OAuth backend: installed-app client, per-mode token file,
/// refresh-on-use and a loopback consent flow.
pub struct GoogleOAuth {
    config: AuthConfig,
    store: TokenStore,
    http: reqwest::Client,
    refresh_lock: Mutex<()>,
}

impl GoogleOAuth {
    pub fn new(config: AuthConfig) -> Self {
        let store = TokenStore::new(config.token_file.clone());
        Self {
            config,
            store,
            http: reqwest::Client::new(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn refresh_buffer() -> chrono::Duration {
        chrono::Duration::minutes(REFRESH_BUFFER_MINUTES)
    }

    async fn refresh(&self, mode: AccountMode) -> Result<StoredTokens, AuthFlowError> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let current = self
            .store
            .load(mode)
            .ok_or_else(|| AuthFlowError::Store(format!("no tokens stored for {mode}")))?;
        if current.is_fresh(Utc::now(), Self::refresh_buffer()) {
            return Ok(current);
        }
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| AuthFlowError::TokenExchange("no refresh token stored".to_string()))?;

        let client = OAuthClient::from_file(&self.config.client_file)?;
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
            ("client_id", client.client_id.clone()),
        ];
        if let Some(secret) = &client.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        let tokens = self
            .exchange(&client.token_uri, &form)
            .await?
            .into_stored(Some(refresh_token));
        self.store.save(mode, &tokens)?;
        tracing::info!(
            event = "oauth_tokens_refreshed",
            account_mode = %mode,
            expires_at = %tokens.expires_at
        );
        Ok(tokens)
    }

    async fn exchange(
        &self,
        token_uri: &str,
        form: &[(&str, String)],
    ) -> Result<TokenResponse, AuthFlowError> {
        let resp = self
            .http
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthFlowError::TokenExchange(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthFlowError::TokenExchange(format!("{status}: {body}")));
        }
        resp.json::<TokenResponse>()
            .await
            .map_err(|e| AuthFlowError::TokenExchange(e.to_string()))
    }

    /// Consent flow with an explicit timeout. Used by the CLI and the gatekeeper.
    pub async fn login(
        &self,
        open_browser: bool,
        timeout: Duration,
    ) -> Result<bool, AuthFlowError> {
        let client = OAuthClient::from_file(&self.config.client_file)?;
        let code_verifier = gdocs_core::auth::generate_code_verifier();
        let code_challenge = gdocs_core::auth::generate_code_challenge(&code_verifier);
        let state = gdocs_core::auth::generate_state();

        let listener = TcpListener::bind(("127.0.0.1", self.config.callback_port)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}{CALLBACK_PATH}");
        let authorize_url = client.authorize_url(&redirect_uri, &code_challenge, &state)?;

        tracing::warn!(
            event = "oauth_authorization_required",
            account_mode = %self.config.account_mode,
            auth_url = %authorize_url,
            "Visit the auth URL to authorize Google Docs access"
        );
        if open_browser {
            if let Err(err) = open::that(authorize_url.as_str()) {
                tracing::warn!(event = "oauth_browser_open_failed", error = %err);
            }
        }

        let outcome = tokio::select! {
            result = wait_for_callback(listener) => result?,
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(event = "oauth_flow_timed_out", timeout_secs = timeout.as_secs());
                return Ok(false);
            }
        };

        let (code, received_state) = match outcome {
            CallbackOutcome::Code { code, state } => (code, state),
            CallbackOutcome::Denied(reason) => {
                tracing::warn!(event = "oauth_consent_denied", reason = %reason);
                return Ok(false);
            }
        };
        if received_state.as_deref() != Some(state.as_str()) {
            tracing::warn!(event = "oauth_state_mismatch");
            return Ok(false);
        }

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", client.client_id.clone()),
        ];
        if let Some(secret) = &client.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        let mode = self.config.account_mode;
        let previous = self.store.load(mode).and_then(|t| t.refresh_token);
        let tokens = self
            .exchange(&client.token_uri, &form)
            .await?
            .into_stored(previous);
        self.store.save(mode, &tokens)?;
        tracing::info!(
            event = "oauth_login_completed",
            account_mode = %mode,
            token = %gdocs_core::auth::token_fingerprint(&tokens.access_token),
            token_path = %self.store.path().display()
        );
        Ok(true)
    }
}

#[async_trait]
impl AuthBackend for GoogleOAuth {
    fn account_mode(&self) -> AccountMode {
        self.config.account_mode
    }

    async fn validate_tokens(&self, mode: AccountMode) -> bool {
        let Some(tokens) = self.store.load(mode) else {
            return false;
        };
        if tokens.is_fresh(Utc::now(), Self::refresh_buffer()) {
            return true;
        }
        match self.refresh(mode).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(event = "oauth_refresh_failed", account_mode = %mode, error = %err);
                false
            }
        }
    }

    async fn start_interactive_auth(&self, open_browser: bool) -> Result<bool, AuthFlowError> {
        self.login(open_browser, self.config.auth_timeout).await
    }

    async fn credential(&self, mode: AccountMode) -> Option<Credential> {
        self.store
            .load(mode)
            .filter(|tokens| tokens.is_fresh(Utc::now(), Self::refresh_buffer()))
            .map(|tokens| tokens.credential())
    }
}

async fn wait_for_callback(listener: TcpListener) -> Result<CallbackOutcome, AuthFlowError> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);

        // GET /oauth2callback?code=...&state=... HTTP/1.1
        let path = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("");

        let Some(outcome) = parse_callback(path) else {
            // Favicon probes and other stray requests.
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await?;
            continue;
        };

        let body = match &outcome {
            CallbackOutcome::Code { .. } => {
                "<html><body><h1>Authenticated!</h1><p>You can close this tab.</p></body></html>"
            }
            CallbackOutcome::Denied(_) => {
                "<html><body><h1>Authorization failed</h1><p>You can close this tab.</p></body></html>"
            }
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        return Ok(outcome);
    }
}

fn parse_callback(path: &str) -> Option<CallbackOutcome> {
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.to_string())
    };
    if let Some(error) = param("error") {
        return Some(CallbackOutcome::Denied(error));
    }
    match param("code") {
        Some(code) => Some(CallbackOutcome::Code {
            code,
            state: param("state"),
        }),
        None => Some(CallbackOutcome::Denied("missing code".to_string())),
    }
}
