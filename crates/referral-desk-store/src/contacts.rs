// SPDX-License-Identifier: Apache-2.0

use crate::normalize::{escape_like, format_timestamp, normalize_lookup, parse_timestamp};
use crate::{ReferralStore, StoreError};
use chrono::{DateTime, Utc};
use referral_desk_model::{ContactDraft, ContactPatch, RecordId, ReferentContact};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const CONTACT_COLUMNS: &str =
    "id, referral_partner, referral_rep, referral_contact_info, referent_email, created_at, created_by";

/// Case-insensitive substring filters for the contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub referral_partner: Option<String>,
    pub referral_rep: Option<String>,
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<ReferentContact> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(5)?;
    let invalid = |idx: usize, message: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
        )
    };
    Ok(ReferentContact {
        id: RecordId::parse(&id).map_err(|e| invalid(0, e.to_string()))?,
        referral_partner: row.get(1)?,
        referral_rep: row.get(2)?,
        referral_contact_info: row.get(3)?,
        referent_email: row.get(4)?,
        created_at: parse_timestamp(&created_at).map_err(|e| invalid(5, e.to_string()))?,
        created_by: row.get(6)?,
    })
}

impl ReferralStore {
    pub fn insert_contact(
        &self,
        draft: ContactDraft,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ReferentContact, StoreError> {
        let contact = draft.into_contact(RecordId::generate(), actor, now)?;
        self.conn.execute(
            "INSERT INTO referent_contacts (
               id, referral_partner, partner_normalized, referral_rep, rep_normalized,
               referral_contact_info, referent_email, created_at, created_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                contact.id.as_str(),
                contact.referral_partner,
                normalize_lookup(&contact.referral_partner),
                contact.referral_rep,
                normalize_lookup(&contact.referral_rep),
                contact.referral_contact_info,
                contact.referent_email,
                format_timestamp(contact.created_at),
                contact.created_by,
            ],
        )?;
        Ok(contact)
    }

    pub fn get_contact(&self, id: &RecordId) -> Result<Option<ReferentContact>, StoreError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM referent_contacts WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.as_str()], contact_from_row)
            .optional()?)
    }

    pub fn update_contact(
        &self,
        id: &RecordId,
        patch: &ContactPatch,
    ) -> Result<ReferentContact, StoreError> {
        let current = self
            .get_contact(id)?
            .ok_or_else(|| StoreError::not_found("referent contact", id.as_str()))?;
        let merged = patch.apply(&current)?;
        self.conn.execute(
            "UPDATE referent_contacts SET
               referral_partner = ?2, partner_normalized = ?3, referral_rep = ?4,
               rep_normalized = ?5, referral_contact_info = ?6, referent_email = ?7
             WHERE id = ?1",
            params![
                merged.id.as_str(),
                merged.referral_partner,
                normalize_lookup(&merged.referral_partner),
                merged.referral_rep,
                normalize_lookup(&merged.referral_rep),
                merged.referral_contact_info,
                merged.referent_email,
            ],
        )?;
        Ok(merged)
    }

    pub fn delete_contact(&self, id: &RecordId) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM referent_contacts WHERE id = ?1",
            params![id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("referent contact", id.as_str()));
        }
        Ok(())
    }

    /// Newest first.
    pub fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<ReferentContact>, StoreError> {
        let mut where_parts: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(partner) = filter.referral_partner.as_deref().filter(|v| !v.trim().is_empty()) {
            where_parts.push("partner_normalized LIKE ? ESCAPE '!'");
            params.push(Value::Text(format!("%{}%", escape_like(&normalize_lookup(partner)))));
        }
        if let Some(rep) = filter.referral_rep.as_deref().filter(|v| !v.trim().is_empty()) {
            where_parts.push("rep_normalized LIKE ? ESCAPE '!'");
            params.push(Value::Text(format!("%{}%", escape_like(&normalize_lookup(rep)))));
        }
        let mut sql = format!("SELECT {CONTACT_COLUMNS} FROM referent_contacts");
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), contact_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
