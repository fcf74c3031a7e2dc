// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod batch;
mod contacts;
mod normalize;
mod referrals;
mod schema;

use referral_desk_model::{FieldIssue, ValidationError};
use rusqlite::Connection;
use std::path::Path;

pub use batch::{BatchOutcome, BatchResult, MAX_BATCH_SIZE};
pub use contacts::ContactFilter;
pub use normalize::{escape_like, format_timestamp, normalize_lookup, parse_timestamp};
pub use referrals::{referral_from_row, REFERRAL_COLUMNS};
pub use schema::STORE_SCHEMA_VERSION;

pub const CRATE_NAME: &str = "referral-desk-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Sql,
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
    pub issues: Vec<FieldIssue>,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            issues: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::new(StoreErrorCode::NotFound, format!("{kind} {id} not found"))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::new(StoreErrorCode::Sql, value.to_string())
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self {
            code: StoreErrorCode::Validation,
            message: value.to_string(),
            issues: value.issues,
        }
    }
}

/// Owner of the SQLite connection holding referrals and referent contacts.
#[derive(Debug)]
pub struct ReferralStore {
    conn: Connection,
}

impl ReferralStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::new(
                        StoreErrorCode::Schema,
                        format!("create data dir {}: {e}", parent.display()),
                    )
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::apply_pragmas(&conn)?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Read access for query builders living outside this crate.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        schema::read_user_version(&self.conn)
    }

    /// Cheap round trip used by readiness checks.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        schema::read_meta(&self.conn, key)
    }
}
