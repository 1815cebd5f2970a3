use std::sync::Arc;

use clap::Subcommand;
use gdocs_mcp_runtime::auth::GoogleOAuth;
use gdocs_mcp_runtime::config::{AuthConfig, GatewayConfig};
use gdocs_mcp_runtime::dispatch::Dispatcher;
use gdocs_mcp_runtime::error::GatewayError;
use gdocs_mcp_runtime::gatekeeper::{Channel, Gatekeeper};
use gdocs_mcp_runtime::google::GoogleApiClient;
use gdocs_mcp_runtime::tools::registry;
use gdocs_mcp_runtime::to_pretty_json;
use serde_json::{Value, json};

use crate::util::{exit_error, print_json, read_tool_args};

#[derive(Subcommand)]
pub enum ToolsCommands {
    /// Print every tool with its input schema
    List,
    /// Invoke one tool and print its text result
    Call {
        /// Tool name (e.g. create-doc)
        name: String,
        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Read arguments from a JSON file (use '-' for stdin)
        #[arg(long)]
        args_file: Option<String>,
    },
}

pub async fn run(config: AuthConfig, command: ToolsCommands) -> i32 {
    match command {
        ToolsCommands::List => {
            let tools: Vec<Value> = registry().iter().map(|tool| tool.to_listing()).collect();
            print_json(&json!({ "tools": tools }));
            0
        }
        ToolsCommands::Call {
            name,
            args,
            args_file,
        } => {
            let raw = read_tool_args(args.as_deref(), args_file.as_deref())
                .unwrap_or_else(|message| exit_error(&message, None));
            call(config, &name, &raw).await
        }
    }
}

async fn call(config: AuthConfig, name: &str, raw: &Value) -> i32 {
    let gateway = GatewayConfig::from_env(Channel::Stdio);
    let api = match GoogleApiClient::new(&gateway) {
        Ok(client) => Arc::new(client),
        Err(err) => exit_error(&format!("Failed to build HTTP client: {err}"), None),
    };
    let gatekeeper = Gatekeeper::new(Arc::new(GoogleOAuth::new(config)), Channel::Stdio);
    let dispatcher = Dispatcher::new(api, gatekeeper, gateway.request_timeout);

    match dispatcher.dispatch(name, raw).await {
        Ok(result) => {
            println!("{}", result.text);
            0
        }
        Err(err) => {
            eprintln!("{}", to_pretty_json(&error_payload(&err)));
            1
        }
    }
}

fn error_payload(err: &GatewayError) -> Value {
    let mut payload = json!({
        "error": err.code(),
        "message": err.to_string(),
        "retryable": err.retryable(),
    });
    if let GatewayError::Authentication(_) = err {
        payload["docs_hint"] = json!("Run `gdocs auth login` first.");
    }
    if let Some(violations) = err.rpc_data().get("violations") {
        payload["violations"] = violations.clone();
    }
    payload
}

#[cfg(test)]
mod tests {
    use gdocs_mcp_runtime::error::AuthenticationError;

    use super::*;

    #[test]
    fn error_payload_mirrors_gateway_error() {
        let unknown = error_payload(&GatewayError::UnknownTool("delete-doc".to_string()));
        assert_eq!(
            unknown,
            json!({
                "error": "unknown_tool",
                "message": "Unknown tool: delete-doc",
                "retryable": false,
            })
        );

        let auth = error_payload(&GatewayError::from(AuthenticationError::new("sign in")));
        assert_eq!(auth["error"], json!("authentication_required"));
        assert!(auth["docs_hint"].as_str().unwrap().contains("gdocs auth login"));
    }

    #[test]
    fn validation_payload_lists_violations() {
        let descriptor = gdocs_mcp_runtime::tools::descriptor("create-doc").unwrap();
        let errors = descriptor.validate(&json!({})).unwrap_err();
        let payload = error_payload(&GatewayError::Validation {
            tool: "create-doc".to_string(),
            errors,
        });
        assert_eq!(payload["error"], json!("validation_failed"));
        assert_eq!(payload["violations"][0]["path"], json!("title"));
    }
}
