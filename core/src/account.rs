use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which persisted credential set is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    #[default]
    Personal,
    Workspace,
}

impl AccountMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountMode::Personal => "personal",
            AccountMode::Workspace => "workspace",
        }
    }

    /// Read `GOOGLE_ACCOUNT_MODE`, falling back to `personal` when unset or unknown.
    pub fn from_env() -> Self {
        std::env::var("GOOGLE_ACCOUNT_MODE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for AccountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "personal" | "normal" => Ok(AccountMode::Personal),
            "workspace" | "work" => Ok(AccountMode::Workspace),
            other => Err(format!(
                "unknown account mode '{other}', expected 'personal' or 'workspace'"
            )),
        }
    }
}
