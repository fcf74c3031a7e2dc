// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use rusqlite::{params, Connection, OptionalExtension};

pub const STORE_SCHEMA_VERSION: i64 = 1;

pub(crate) fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;
        PRAGMA synchronous=NORMAL;
        PRAGMA temp_store=MEMORY;
        PRAGMA busy_timeout=5000;
        ",
    )?;
    Ok(())
}

pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    let found = read_user_version(conn)?;
    if found > STORE_SCHEMA_VERSION {
        return Err(StoreError::new(
            StoreErrorCode::Schema,
            format!(
                "database schema version {found} is newer than supported version {STORE_SCHEMA_VERSION}"
            ),
        ));
    }
    if found == STORE_SCHEMA_VERSION {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS referrals (
          id TEXT PRIMARY KEY,
          first_name TEXT NOT NULL,
          last_name TEXT NOT NULL,
          name_normalized TEXT NOT NULL,
          lead_source TEXT NOT NULL,
          referral_source TEXT,
          referral_source_normalized TEXT,
          referral_out TEXT,
          insurance_company TEXT,
          insurance_normalized TEXT,
          program TEXT,
          referral_sent_to TEXT,
          admitted INTEGER NOT NULL CHECK (admitted IN (0, 1)),
          outreach_rep TEXT,
          notes TEXT,
          created_at TEXT NOT NULL,
          created_by TEXT NOT NULL,
          updated_at TEXT,
          updated_by TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_referrals_created ON referrals(created_at, id);
        CREATE INDEX IF NOT EXISTS idx_referrals_name ON referrals(name_normalized, id);
        CREATE INDEX IF NOT EXISTS idx_referrals_program ON referrals(program);
        CREATE TABLE IF NOT EXISTS referent_contacts (
          id TEXT PRIMARY KEY,
          referral_partner TEXT NOT NULL,
          partner_normalized TEXT NOT NULL,
          referral_rep TEXT NOT NULL,
          rep_normalized TEXT NOT NULL,
          referral_contact_info TEXT NOT NULL,
          referent_email TEXT,
          created_at TEXT NOT NULL,
          created_by TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contacts_created ON referent_contacts(created_at, id);
        CREATE TABLE IF NOT EXISTS store_meta (
          k TEXT PRIMARY KEY,
          v TEXT NOT NULL
        ) WITHOUT ROWID;
        ",
    )?;
    tx.execute(
        "INSERT INTO store_meta (k, v) VALUES ('schema_version', ?1)
         ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        params![STORE_SCHEMA_VERSION.to_string()],
    )?;
    tx.execute_batch(&format!("PRAGMA user_version={STORE_SCHEMA_VERSION};"))?;
    tx.commit()?;
    tracing::info!(
        schema_version = STORE_SCHEMA_VERSION,
        previous = found,
        "store schema ready"
    );
    Ok(())
}

pub(crate) fn read_user_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

pub(crate) fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT v FROM store_meta WHERE k = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}
