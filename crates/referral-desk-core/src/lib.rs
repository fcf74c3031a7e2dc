// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const CRATE_NAME: &str = "referral-desk-core";

pub const ENV_REFERRAL_DESK_DATA_DIR: &str = "REFERRAL_DESK_DATA_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "referrals.sqlite";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

fn non_blank_env(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding the referral database when no explicit path is given.
///
/// `REFERRAL_DESK_DATA_DIR` wins, then `$XDG_DATA_HOME/referral-desk`, then
/// `$HOME/.local/share/referral-desk`, then `.referral-desk` in the working
/// directory.
#[must_use]
pub fn resolve_data_dir() -> PathBuf {
    non_blank_env(ENV_REFERRAL_DESK_DATA_DIR)
        .or_else(|| non_blank_env("XDG_DATA_HOME").map(|d| d.join("referral-desk")))
        .or_else(|| {
            non_blank_env("HOME").map(|h| h.join(".local").join("share").join("referral-desk"))
        })
        .unwrap_or_else(|| PathBuf::from(".referral-desk"))
}

#[must_use]
pub fn default_db_path() -> PathBuf {
    resolve_data_dir().join(DEFAULT_DB_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}

/// Key-order independent JSON, used to fingerprint list queries for cursors.
pub mod canonical {
    use serde::Serialize;
    use serde_json::Value;
    use sha2::{Digest, Sha256};

    pub fn stable_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&sorted(serde_json::to_value(value)?))
    }

    pub fn stable_json_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
        let digest = Sha256::digest(stable_json_bytes(value)?);
        Ok(format!("{digest:x}"))
    }

    fn sorted(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<_> = map.into_iter().collect();
                keys.sort_by(|a, b| a.0.cmp(&b.0));
                Value::Object(keys.into_iter().map(|(k, v)| (k, sorted(v))).collect())
            }
            Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
            other => other,
        }
    }
}
