use std::time::Duration;

use clap::Subcommand;
use gdocs_mcp_runtime::auth::{AuthBackend, GoogleOAuth, TokenStore};
use gdocs_mcp_runtime::config::AuthConfig;
use serde_json::{Value, json};

use crate::util::{exit_error, print_json};

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Run the browser consent flow and store tokens
    Login {
        /// Print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
        /// Give up waiting for the callback after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show whether usable tokens are stored for the account mode
    Status,
    /// Remove stored tokens for the account mode
    Logout,
}

pub async fn run(config: AuthConfig, command: AuthCommands) -> i32 {
    match command {
        AuthCommands::Login {
            no_browser,
            timeout_secs,
        } => login(config, !no_browser, timeout_secs).await,
        AuthCommands::Status => status(config).await,
        AuthCommands::Logout => logout(config),
    }
}

async fn login(config: AuthConfig, open_browser: bool, timeout_secs: Option<u64>) -> i32 {
    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(config.auth_timeout);
    let mode = config.account_mode;
    let oauth = GoogleOAuth::new(config);

    eprintln!("Waiting for Google consent (the authorization URL is logged above if no browser opens)...");
    match oauth.login(open_browser, timeout).await {
        Ok(true) => {
            print_json(&json!({
                "status": "logged_in",
                "account_mode": mode.as_str(),
                "token_path": oauth.store().path().display().to_string(),
            }));
            0
        }
        Ok(false) => exit_error(
            "Authentication was not completed.",
            Some("The consent page was denied, timed out, or returned a mismatched state. Run `gdocs auth login` again."),
        ),
        Err(err) => exit_error(
            &format!("Login failed: {err}"),
            Some("Check GOOGLE_OAUTH_CREDENTIALS points at an OAuth client JSON file."),
        ),
    }
}

async fn status(config: AuthConfig) -> i32 {
    let mode = config.account_mode;
    let oauth = GoogleOAuth::new(config);
    let authenticated = oauth.validate_tokens(mode).await;
    print_json(&status_report(oauth.store(), mode, authenticated));
    0
}

fn status_report(store: &TokenStore, mode: gdocs_core::AccountMode, authenticated: bool) -> Value {
    let stored = store.load(mode);
    json!({
        "account_mode": mode.as_str(),
        "token_path": store.path().display().to_string(),
        "authenticated": authenticated,
        "expires_at": stored.as_ref().map(|t| t.expires_at.to_rfc3339()),
        "token_fingerprint": stored
            .as_ref()
            .map(|t| gdocs_core::auth::token_fingerprint(&t.access_token)),
        "refreshable": stored.as_ref().is_some_and(|t| t.refresh_token.is_some()),
    })
}

fn logout(config: AuthConfig) -> i32 {
    let mode = config.account_mode;
    let store = TokenStore::new(config.token_file);
    match store.remove(mode) {
        Ok(removed) => {
            print_json(&json!({
                "status": "logged_out",
                "account_mode": mode.as_str(),
                "removed": removed,
                "token_path": store.path().display().to_string(),
            }));
            0
        }
        Err(err) => exit_error(&format!("Failed to remove tokens: {err}"), None),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use gdocs_core::AccountMode;
    use gdocs_mcp_runtime::auth::StoredTokens;

    use super::*;

    #[test]
    fn status_report_never_prints_the_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let empty = status_report(&store, AccountMode::Personal, false);
        assert_eq!(empty["authenticated"], json!(false));
        assert_eq!(empty["expires_at"], Value::Null);
        assert_eq!(empty["refreshable"], json!(false));

        store
            .save(
                AccountMode::Personal,
                &StoredTokens {
                    access_token: "ya29.secret".to_string(),
                    refresh_token: Some("1//refresh".to_string()),
                    expires_at: Utc::now() + ChronoDuration::hours(1),
                    scope: None,
                    token_type: Some("Bearer".to_string()),
                },
            )
            .unwrap();
        let report = status_report(&store, AccountMode::Personal, true);
        assert_eq!(report["refreshable"], json!(true));
        assert_eq!(report["token_fingerprint"].as_str().unwrap().len(), 12);
        assert!(!report.to_string().contains("ya29.secret"));

        let other = status_report(&store, AccountMode::Workspace, false);
        assert_eq!(other["token_fingerprint"], Value::Null);
    }
}
