use std::io::Read;

use serde_json::{Value, json};

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", gdocs_mcp_runtime::to_pretty_json(&err));
    std::process::exit(1);
}

pub fn print_json(value: &Value) {
    println!("{}", gdocs_mcp_runtime::to_pretty_json(value));
}

/// Tool arguments from `--args` (inline JSON) or `--args-file` (path, or `-` for stdin).
pub fn read_tool_args(inline: Option<&str>, file: Option<&str>) -> Result<Value, String> {
    match (inline, file) {
        (Some(_), Some(_)) => Err("Use either --args or --args-file, not both".to_string()),
        (Some(raw), None) => {
            serde_json::from_str(raw).map_err(|e| format!("Invalid JSON in --args: {e}"))
        }
        (None, Some(path)) => read_json_from_file(path),
        (None, None) => Ok(json!({})),
    }
}

/// Read JSON from a file path or stdin (when path is "-").
pub fn read_json_from_file(path: &str) -> Result<Value, String> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON in '{path}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_args_and_files_are_exclusive() {
        assert_eq!(read_tool_args(None, None).unwrap(), json!({}));
        assert_eq!(
            read_tool_args(Some(r#"{"title":"Q3"}"#), None).unwrap(),
            json!({ "title": "Q3" })
        );
        assert!(read_tool_args(Some("{}"), Some("args.json")).is_err());
        assert!(
            read_tool_args(Some("{oops"), None)
                .unwrap_err()
                .starts_with("Invalid JSON in --args")
        );
    }

    #[test]
    fn args_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.json");
        std::fs::write(&path, r#"{ "documentId": "d1" }"#).unwrap();
        let value = read_tool_args(None, Some(path.to_str().unwrap())).unwrap();
        assert_eq!(value, json!({ "documentId": "d1" }));

        let missing = dir.path().join("missing.json");
        assert!(read_json_from_file(missing.to_str().unwrap()).is_err());
    }
}
