use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use gdocs_core::AccountMode;
use serde::{Deserialize, Serialize};

use super::{AuthFlowError, Credential};

/// Tokens persisted for one account mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl StoredTokens {
    /// Still valid `buffer` from now.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer < self.expires_at
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone(), Some(self.expires_at))
    }
}

/// JSON file of [`StoredTokens`] keyed by account mode name.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, mode: AccountMode) -> Option<StoredTokens> {
        self.load_all().remove(mode.as_str())
    }

    /// Missing or unreadable files count as empty.
    pub fn load_all(&self) -> BTreeMap<String, StoredTokens> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, mode: AccountMode, tokens: &StoredTokens) -> Result<(), AuthFlowError> {
        let mut all = self.load_all();
        all.insert(mode.as_str().to_string(), tokens.clone());
        self.write_all(&all)
    }

    /// Returns whether an entry existed.
    pub fn remove(&self, mode: AccountMode) -> Result<bool, AuthFlowError> {
        let mut all = self.load_all();
        if all.remove(mode.as_str()).is_none() {
            return Ok(false);
        }
        self.write_all(&all)?;
        Ok(true)
    }

    fn write_all(&self, all: &BTreeMap<String, StoredTokens>) -> Result<(), AuthFlowError> {
        let store_err = |e: std::io::Error| AuthFlowError::Store(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let data = serde_json::to_string_pretty(all)
            .map_err(|e| AuthFlowError::Store(e.to_string()))?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(store_err)?;
        file.write_all(data.as_bytes()).map_err(store_err)?;
        Ok(())
    }
}

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
