use std::path::PathBuf;
use std::time::Duration;

use gdocs_core::AccountMode;

use crate::gatekeeper::Channel;

pub const REQUEST_TIMEOUT_ENV: &str = "GDOCS_MCP_REQUEST_TIMEOUT_MS";
pub const CONNECT_TIMEOUT_ENV: &str = "GDOCS_MCP_CONNECT_TIMEOUT_MS";
pub const AUTH_TIMEOUT_ENV: &str = "GDOCS_MCP_AUTH_TIMEOUT_SECS";
pub const CREDENTIALS_ENV: &str = "GOOGLE_OAUTH_CREDENTIALS";
pub const TOKEN_PATH_ENV: &str = "GDOCS_MCP_TOKEN_PATH";

const REQUEST_TIMEOUT_MS_DEFAULT: u64 = 30_000;
const REQUEST_TIMEOUT_MS_MIN: u64 = 1_000;
const REQUEST_TIMEOUT_MS_MAX: u64 = 300_000;
const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 3_000;
const CONNECT_TIMEOUT_MS_MIN: u64 = 100;
const CONNECT_TIMEOUT_MS_MAX: u64 = 60_000;
const AUTH_TIMEOUT_SECS_DEFAULT: u64 = 300;
const AUTH_TIMEOUT_SECS_MIN: u64 = 10;
const AUTH_TIMEOUT_SECS_MAX: u64 = 3_600;

pub const DOCS_BASE_URL: &str = "https://docs.googleapis.com";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Runtime settings for one gateway instance.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub channel: Channel,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub docs_base_url: String,
    pub drive_base_url: String,
}

impl GatewayConfig {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS_DEFAULT),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS_DEFAULT),
            docs_base_url: DOCS_BASE_URL.to_string(),
            drive_base_url: DRIVE_BASE_URL.to_string(),
        }
    }

    /// Defaults with bounded environment overrides for the timeouts.
    pub fn from_env(channel: Channel) -> Self {
        let mut config = Self::new(channel);
        let (request_ms, from_env) = parse_env_u64_with_bounds(
            std::env::var(REQUEST_TIMEOUT_ENV).ok(),
            REQUEST_TIMEOUT_MS_MIN,
            REQUEST_TIMEOUT_MS_MAX,
            REQUEST_TIMEOUT_MS_DEFAULT,
        );
        if from_env {
            tracing::info!(
                event = "config_override_applied",
                key = REQUEST_TIMEOUT_ENV,
                value = request_ms
            );
        }
        let (connect_ms, from_env) = parse_env_u64_with_bounds(
            std::env::var(CONNECT_TIMEOUT_ENV).ok(),
            CONNECT_TIMEOUT_MS_MIN,
            CONNECT_TIMEOUT_MS_MAX,
            CONNECT_TIMEOUT_MS_DEFAULT,
        );
        if from_env {
            tracing::info!(
                event = "config_override_applied",
                key = CONNECT_TIMEOUT_ENV,
                value = connect_ms
            );
        }
        config.request_timeout = Duration::from_millis(request_ms);
        config.connect_timeout = Duration::from_millis(connect_ms);
        config
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Settings for the OAuth collaborator.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub account_mode: AccountMode,
    pub client_file: PathBuf,
    pub token_file: PathBuf,
    /// Loopback port for the consent callback; `0` picks a free port.
    pub callback_port: u16,
    pub auth_timeout: Duration,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let client_file = std::env::var(CREDENTIALS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("gcp-oauth.keys.json"));
        let token_file = std::env::var(TOKEN_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("tokens.json"));
        let (auth_secs, _) = parse_env_u64_with_bounds(
            std::env::var(AUTH_TIMEOUT_ENV).ok(),
            AUTH_TIMEOUT_SECS_MIN,
            AUTH_TIMEOUT_SECS_MAX,
            AUTH_TIMEOUT_SECS_DEFAULT,
        );
        Self {
            account_mode: AccountMode::from_env(),
            client_file,
            token_file,
            callback_port: 0,
            auth_timeout: Duration::from_secs(auth_secs),
        }
    }
}

/// `~/.config/gdocs-mcp` (or the platform equivalent).
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gdocs-mcp")
}

/// Parse `raw` and clamp into `[min, max]`. The flag is true when the value
/// came from the environment rather than the default.
pub fn parse_env_u64_with_bounds(
    raw: Option<String>,
    min: u64,
    max: u64,
    default: u64,
) -> (u64, bool) {
    match raw.and_then(|value| value.trim().parse::<u64>().ok()) {
        Some(parsed) => (parsed.clamp(min, max), true),
        None => (default, false),
    }
}
