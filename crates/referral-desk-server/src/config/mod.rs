// SPDX-License-Identifier: Apache-2.0

use referral_desk_core::default_db_path;
use referral_desk_model::RecordId;
use referral_desk_query::QueryLimits;
use referral_desk_store::MAX_BATCH_SIZE;
use serde::Serialize;
use std::path::PathBuf;

pub const ENV_BIND: &str = "REFERRAL_DESK_BIND";
pub const ENV_DB_PATH: &str = "REFERRAL_DESK_DB_PATH";
pub const ENV_CURSOR_SECRET: &str = "REFERRAL_DESK_CURSOR_SECRET";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "REFERRAL_DESK_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "REFERRAL_DESK_MAX_PAGE_SIZE";
pub const ENV_MAX_BODY_BYTES: &str = "REFERRAL_DESK_MAX_BODY_BYTES";
pub const ENV_IMPORT_BATCH_SIZE: &str = "REFERRAL_DESK_IMPORT_BATCH_SIZE";
pub const ENV_REQUIRE_API_KEY: &str = "REFERRAL_DESK_REQUIRE_API_KEY";
pub const ENV_API_KEYS: &str = "REFERRAL_DESK_API_KEYS";
pub const ENV_CORS_ALLOWED_ORIGINS: &str = "REFERRAL_DESK_CORS_ALLOWED_ORIGINS";
pub const ENV_LOG_JSON: &str = "REFERRAL_DESK_LOG_JSON";

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    #[serde(skip_serializing)]
    pub cursor_secret: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_body_bytes: usize,
    pub import_batch_size: usize,
    pub require_api_key: bool,
    #[serde(skip_serializing)]
    pub allowed_api_keys: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            db_path: default_db_path(),
            cursor_secret: "referral-desk-local-cursor-secret".to_string(),
            default_page_size: limits.default_limit,
            max_page_size: limits.max_limit,
            max_body_bytes: 8 * 1024 * 1024,
            import_batch_size: MAX_BATCH_SIZE,
            require_api_key: false,
            allowed_api_keys: Vec::new(),
            cors_allowed_origins: Vec::new(),
            log_json: true,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads every setting through `lookup`; unset or unparsable values keep
    /// their defaults. Without a configured cursor secret a random one is
    /// drawn, so cursors do not survive a restart.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let usize_var = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };
        let bool_var = |name: &str, default: bool| {
            lookup(name).and_then(|v| parse_bool(&v)).unwrap_or(default)
        };
        Self {
            bind_addr: lookup(ENV_BIND)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            db_path: lookup(ENV_DB_PATH)
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.db_path, PathBuf::from),
            cursor_secret: lookup(ENV_CURSOR_SECRET)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| RecordId::generate().into_inner()),
            default_page_size: usize_var(ENV_DEFAULT_PAGE_SIZE, defaults.default_page_size),
            max_page_size: usize_var(ENV_MAX_PAGE_SIZE, defaults.max_page_size),
            max_body_bytes: usize_var(ENV_MAX_BODY_BYTES, defaults.max_body_bytes),
            import_batch_size: usize_var(ENV_IMPORT_BATCH_SIZE, defaults.import_batch_size),
            require_api_key: bool_var(ENV_REQUIRE_API_KEY, defaults.require_api_key),
            allowed_api_keys: lookup(ENV_API_KEYS)
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            cors_allowed_origins: lookup(ENV_CORS_ALLOWED_ORIGINS)
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            log_json: bool_var(ENV_LOG_JSON, defaults.log_json),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_page_size == 0 {
            return Err("max page size must be > 0".to_string());
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(format!(
                "default page size must be between 1 and {}",
                self.max_page_size
            ));
        }
        if self.import_batch_size == 0 || self.import_batch_size > MAX_BATCH_SIZE {
            return Err(format!(
                "import batch size must be between 1 and {MAX_BATCH_SIZE}"
            ));
        }
        if self.max_body_bytes == 0 {
            return Err("max body bytes must be > 0".to_string());
        }
        if self.cursor_secret.is_empty() {
            return Err("cursor secret must not be empty".to_string());
        }
        if self.require_api_key && self.allowed_api_keys.is_empty() {
            return Err("require_api_key=true requires at least one allowed api key".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_page_size,
            max_limit: self.max_page_size,
            ..QueryLimits::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_DB_PATH, "/tmp/r.sqlite"),
            (ENV_DEFAULT_PAGE_SIZE, "10"),
            (ENV_MAX_PAGE_SIZE, "100"),
            (ENV_REQUIRE_API_KEY, "true"),
            (ENV_API_KEYS, "k1, k2,,"),
            (ENV_CORS_ALLOWED_ORIGINS, "https://intake.example"),
            (ENV_LOG_JSON, "0"),
        ]));
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/r.sqlite"));
        assert_eq!(cfg.query_limits().default_limit, 10);
        assert_eq!(cfg.query_limits().max_limit, 100);
        assert_eq!(cfg.allowed_api_keys, vec!["k1", "k2"]);
        assert_eq!(cfg.cors_allowed_origins, vec!["https://intake.example"]);
        assert!(cfg.require_api_key);
        assert!(!cfg.log_json);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unparsable_values_fall_back_and_secret_is_random() {
        let a = ServerConfig::from_lookup(lookup_from(&[(ENV_MAX_BODY_BYTES, "lots")]));
        let b = ServerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(a.max_body_bytes, ServerConfig::default().max_body_bytes);
        assert_ne!(a.cursor_secret, b.cursor_secret);
        assert!(!a.cursor_secret.is_empty());
    }

    #[test]
    fn validation_rejects_inconsistent_settings() {
        let bad_page = ServerConfig {
            default_page_size: 600,
            ..ServerConfig::default()
        };
        assert!(bad_page.validate().is_err());
        let keyless = ServerConfig {
            require_api_key: true,
            ..ServerConfig::default()
        };
        assert!(keyless.validate().is_err());
        let batch = ServerConfig {
            import_batch_size: 0,
            ..ServerConfig::default()
        };
        assert!(batch.validate().is_err());
        assert!(ServerConfig::default().validate().is_ok());
    }
}
