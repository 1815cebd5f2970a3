use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gdocs_core::AccountMode;
use gdocs_mcp_runtime::config::AuthConfig;

mod commands;
mod util;

use commands::auth::AuthCommands;
use commands::tools::ToolsCommands;

#[derive(Parser)]
#[command(
    name = "gdocs",
    version,
    about = "Google Docs gateway CLI: manage OAuth tokens and invoke tools directly"
)]
struct Cli {
    /// Which stored credential set to use (personal or workspace)
    #[arg(long, global = true, env = "GOOGLE_ACCOUNT_MODE")]
    account_mode: Option<AccountMode>,

    /// OAuth client file downloaded from Google Cloud Console
    #[arg(long, global = true, env = "GOOGLE_OAUTH_CREDENTIALS")]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, inspect or forget stored Google tokens
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List tools or call one without an MCP client
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },
}

impl Cli {
    fn auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig::from_env();
        if let Some(path) = &self.credentials {
            config.client_file = path.clone();
        }
        if let Some(mode) = self.account_mode {
            config.account_mode = mode;
        }
        config
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = cli.auth_config();

    let code = match cli.command {
        Commands::Auth { command } => commands::auth::run(config, command).await,
        Commands::Tools { command } => commands::tools::run(config, command).await,
    };
    std::process::exit(code);
}
