use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use gdocs_core::AccountMode;
use gdocs_mcp_runtime::auth::{AuthBackend, GoogleOAuth};
use gdocs_mcp_runtime::config::{AuthConfig, GatewayConfig};
use gdocs_mcp_runtime::dispatch::Dispatcher;
use gdocs_mcp_runtime::gatekeeper::{Channel, Gatekeeper};
use gdocs_mcp_runtime::google::GoogleApiClient;
use gdocs_mcp_runtime::{McpServer, to_pretty_json};
use serde_json::json;

mod http;
mod observability;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

impl Transport {
    fn channel(self) -> Channel {
        match self {
            Transport::Stdio => Channel::Stdio,
            Transport::Http => Channel::Http,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "gdocs-mcp",
    version,
    about = "Google Docs MCP server over stdio or HTTP"
)]
struct Cli {
    /// Transport to serve MCP on
    #[arg(long, value_enum, env = "GDOCS_MCP_TRANSPORT", default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Bind address for the HTTP transport
    #[arg(long, env = "GDOCS_MCP_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the HTTP transport
    #[arg(long, env = "GDOCS_MCP_PORT", default_value_t = 3000)]
    port: u16,

    /// Skip startup authentication (tool calls still require credentials)
    #[arg(long, env = "GDOCS_MCP_TEST_MODE")]
    test_mode: bool,

    /// OAuth client file downloaded from Google Cloud Console
    #[arg(long, env = "GOOGLE_OAUTH_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Which stored credential set to use (personal or workspace)
    #[arg(long, env = "GOOGLE_ACCOUNT_MODE")]
    account_mode: Option<AccountMode>,

    /// Print the consent URL instead of opening a browser
    #[arg(long)]
    no_browser: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    observability::init_tracing();
    let cli = Cli::parse();

    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let channel = cli.transport.channel();

    let mut auth_config = AuthConfig::from_env();
    if let Some(path) = cli.credentials {
        auth_config.client_file = path;
    }
    if let Some(mode) = cli.account_mode {
        auth_config.account_mode = mode;
    }
    let oauth = Arc::new(GoogleOAuth::new(auth_config));

    if cli.test_mode {
        tracing::info!(event = "startup_auth_skipped", reason = "test_mode");
    } else if let Err(message) = startup_auth(oauth.as_ref(), channel, !cli.no_browser).await {
        return fatal(
            "authentication_failed",
            &message,
            "Run `gdocs auth login` or check GOOGLE_OAUTH_CREDENTIALS.",
        );
    }

    let config = GatewayConfig::from_env(channel);
    let api = match GoogleApiClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            return fatal(
                "client_init_failed",
                &err.to_string(),
                "Check TLS and proxy settings.",
            );
        }
    };
    let dispatcher = Dispatcher::new(api, Gatekeeper::new(oauth, channel), config.request_timeout);
    let server = Arc::new(McpServer::new(Arc::new(dispatcher)));

    tracing::info!(
        event = "mcp_server_starting",
        transport = channel.as_str(),
        version = env!("CARGO_PKG_VERSION")
    );
    let result = match cli.transport {
        Transport::Stdio => server.serve_stdio().await,
        Transport::Http => http::serve(server, SocketAddr::new(cli.host, cli.port))
            .await
            .map_err(|e| format!("HTTP server failed: {e}")),
    };
    match result {
        Ok(()) => 0,
        Err(message) => fatal("mcp_server_error", &message, "See the server log for details."),
    }
}

/// Stdio must start authenticated: nobody can answer a consent page mid-session.
/// HTTP defers to the first tool call.
async fn startup_auth(
    auth: &dyn AuthBackend,
    channel: Channel,
    open_browser: bool,
) -> Result<(), String> {
    let mode = auth.account_mode();
    if auth.validate_tokens(mode).await {
        tracing::info!(event = "startup_auth_ok", account_mode = %mode);
        return Ok(());
    }
    match channel {
        Channel::Http => {
            tracing::warn!(
                event = "startup_auth_deferred",
                account_mode = %mode,
                "No valid tokens; the first tool call will start the consent flow"
            );
            Ok(())
        }
        Channel::Stdio => match auth.start_interactive_auth(open_browser).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("Authentication was not completed.".to_string()),
            Err(err) => Err(err.to_string()),
        },
    }
}

fn fatal(code: &str, message: &str, docs_hint: &str) -> i32 {
    let payload = json!({
        "error": code,
        "message": message,
        "docs_hint": docs_hint,
    });
    eprintln!("{}", to_pretty_json(&payload));
    1
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gdocs_mcp_runtime::auth::{AuthFlowError, Credential};
    use gdocs_mcp_runtime::tools::args::{BatchUpdateRequest, CopyDocArgs};
    use gdocs_mcp_runtime::upstream::{
        BatchUpdateResponse, DocsApi, Document, DocumentQuery, DriveFile, FileList,
        FileListQuery, UpstreamError,
    };

    use super::*;

    /// Upstream that fails every call.
    pub(crate) struct NoDocs;

    #[async_trait]
    impl DocsApi for NoDocs {
        async fn create_document(&self, _: &Credential, _: &str) -> Result<Document, UpstreamError> {
            Err(UpstreamError::Opaque)
        }

        async fn get_document(
            &self,
            _: &Credential,
            _: &DocumentQuery,
        ) -> Result<Document, UpstreamError> {
            Err(UpstreamError::Opaque)
        }

        async fn list_files(
            &self,
            _: &Credential,
            _: &FileListQuery,
        ) -> Result<FileList, UpstreamError> {
            Err(UpstreamError::Opaque)
        }

        async fn batch_update(
            &self,
            _: &Credential,
            _: &str,
            _: &BatchUpdateRequest,
        ) -> Result<Option<BatchUpdateResponse>, UpstreamError> {
            Err(UpstreamError::Opaque)
        }

        async fn copy_file(&self, _: &Credential, _: &CopyDocArgs) -> Result<DriveFile, UpstreamError> {
            Err(UpstreamError::Opaque)
        }
    }

    pub(crate) struct StaticAuth {
        valid: AtomicBool,
        flow_outcome: Option<bool>,
        flows: AtomicUsize,
    }

    impl StaticAuth {
        pub(crate) fn new(valid: bool, flow_outcome: Option<bool>) -> Self {
            Self {
                valid: AtomicBool::new(valid),
                flow_outcome,
                flows: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthBackend for StaticAuth {
        fn account_mode(&self) -> AccountMode {
            AccountMode::Personal
        }

        async fn validate_tokens(&self, _: AccountMode) -> bool {
            self.valid.load(Ordering::SeqCst)
        }

        async fn start_interactive_auth(&self, _: bool) -> Result<bool, AuthFlowError> {
            self.flows.fetch_add(1, Ordering::SeqCst);
            match self.flow_outcome {
                Some(outcome) => {
                    self.valid.store(outcome, Ordering::SeqCst);
                    Ok(outcome)
                }
                None => Err(AuthFlowError::TokenExchange("denied".to_string())),
            }
        }

        async fn credential(&self, _: AccountMode) -> Option<Credential> {
            self.valid
                .load(Ordering::SeqCst)
                .then(|| Credential::new("ya29.test", None))
        }
    }

    #[tokio::test]
    async fn stdio_startup_runs_consent_flow_when_tokens_are_invalid() {
        let auth = StaticAuth::new(false, Some(true));
        assert!(startup_auth(&auth, Channel::Stdio, false).await.is_ok());
        assert_eq!(auth.flows.load(Ordering::SeqCst), 1);

        let declined = StaticAuth::new(false, Some(false));
        assert_eq!(
            startup_auth(&declined, Channel::Stdio, false).await,
            Err("Authentication was not completed.".to_string())
        );

        let broken = StaticAuth::new(false, None);
        let err = startup_auth(&broken, Channel::Stdio, false).await.unwrap_err();
        assert!(err.contains("denied"));
    }

    #[tokio::test]
    async fn http_startup_defers_authentication() {
        let auth = StaticAuth::new(false, Some(true));
        assert!(startup_auth(&auth, Channel::Http, false).await.is_ok());
        assert_eq!(auth.flows.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_tokens_skip_the_flow() {
        let auth = StaticAuth::new(true, None);
        assert!(startup_auth(&auth, Channel::Stdio, true).await.is_ok());
        assert_eq!(auth.flows.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["gdocs-mcp"]).unwrap();
        assert_eq!(cli.transport, Transport::Stdio);
        assert_eq!(cli.port, 3000);

        let cli = Cli::try_parse_from([
            "gdocs-mcp",
            "--transport",
            "http",
            "--port",
            "8080",
            "--account-mode",
            "workspace",
        ])
        .unwrap();
        assert_eq!(cli.transport.channel(), Channel::Http);
        assert_eq!(cli.account_mode, Some(AccountMode::Workspace));
    }
}
