// SPDX-License-Identifier: Apache-2.0

use crate::normalize::{format_timestamp, normalize_lookup, parse_timestamp};
use crate::{ReferralStore, StoreError};
use chrono::{DateTime, Utc};
use referral_desk_model::{
    LeadSource, LevelOfCare, RecordId, Referral, ReferralDraft, ReferralPatch,
};
use rusqlite::types::Type;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};

/// Column order understood by [`referral_from_row`].
pub const REFERRAL_COLUMNS: &str = "id, first_name, last_name, lead_source, referral_source, \
     referral_out, insurance_company, program, referral_sent_to, admitted, outreach_rep, notes, \
     created_at, created_by, updated_at, updated_by";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub fn referral_from_row(row: &Row<'_>) -> rusqlite::Result<Referral> {
    let id: String = row.get(0)?;
    let lead_source: String = row.get(3)?;
    let program: Option<String> = row.get(7)?;
    let updated_at: Option<String> = row.get(14)?;
    Ok(Referral {
        id: RecordId::parse(&id).map_err(|e| conversion_error(0, e.to_string()))?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        lead_source: LeadSource::parse(&lead_source)
            .map_err(|e| conversion_error(3, e.to_string()))?,
        referral_source: row.get(4)?,
        referral_out: row.get(5)?,
        insurance_company: row.get(6)?,
        program: program
            .map(|p| LevelOfCare::parse(&p))
            .transpose()
            .map_err(|e| conversion_error(7, e.to_string()))?,
        referral_sent_to: row.get(8)?,
        admitted: row.get::<_, i64>(9)? != 0,
        outreach_rep: row.get(10)?,
        notes: row.get(11)?,
        created_at: timestamp_at(row, 12)?,
        created_by: row.get(13)?,
        updated_at: updated_at
            .map(|raw| parse_timestamp(&raw))
            .transpose()
            .map_err(|e| conversion_error(14, e.to_string()))?,
        updated_by: row.get(15)?,
    })
}

pub(crate) fn insert_row(conn: &Connection, r: &Referral) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO referrals (
           id, first_name, last_name, name_normalized, lead_source, referral_source,
           referral_source_normalized, referral_out, insurance_company, insurance_normalized,
           program, referral_sent_to, admitted, outreach_rep, notes, created_at, created_by,
           updated_at, updated_by
         ) VALUES (
           :id, :first_name, :last_name, :name_normalized, :lead_source, :referral_source,
           :referral_source_normalized, :referral_out, :insurance_company, :insurance_normalized,
           :program, :referral_sent_to, :admitted, :outreach_rep, :notes, :created_at, :created_by,
           :updated_at, :updated_by
         )",
        named_params! {
            ":id": r.id.as_str(),
            ":first_name": r.first_name,
            ":last_name": r.last_name,
            ":name_normalized": normalize_lookup(&r.full_name()),
            ":lead_source": r.lead_source.as_str(),
            ":referral_source": r.referral_source,
            ":referral_source_normalized": r.referral_source.as_deref().map(normalize_lookup),
            ":referral_out": r.referral_out,
            ":insurance_company": r.insurance_company,
            ":insurance_normalized": r.insurance_company.as_deref().map(normalize_lookup),
            ":program": r.program.map(LevelOfCare::as_str),
            ":referral_sent_to": r.referral_sent_to,
            ":admitted": i64::from(r.admitted),
            ":outreach_rep": r.outreach_rep,
            ":notes": r.notes,
            ":created_at": format_timestamp(r.created_at),
            ":created_by": r.created_by,
            ":updated_at": r.updated_at.map(format_timestamp),
            ":updated_by": r.updated_by,
        },
    )?;
    Ok(())
}

impl ReferralStore {
    pub fn insert_referral(
        &self,
        draft: ReferralDraft,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Referral, StoreError> {
        let record = draft.into_referral(RecordId::generate(), actor, now)?;
        insert_row(&self.conn, &record)?;
        tracing::debug!(id = %record.id, actor, "referral inserted");
        Ok(record)
    }

    pub fn get_referral(&self, id: &RecordId) -> Result<Option<Referral>, StoreError> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.as_str()], referral_from_row)
            .optional()?)
    }

    pub fn update_referral(
        &self,
        id: &RecordId,
        patch: &ReferralPatch,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Referral, StoreError> {
        let current = self
            .get_referral(id)?
            .ok_or_else(|| StoreError::not_found("referral", id.as_str()))?;
        let mut merged = patch.apply(&current)?;
        merged.updated_at = Some(now);
        merged.updated_by = Some(actor.to_string());

        let changed = self.conn.execute(
            "UPDATE referrals SET
               first_name = :first_name, last_name = :last_name, name_normalized = :name_normalized,
               lead_source = :lead_source, referral_source = :referral_source,
               referral_source_normalized = :referral_source_normalized,
               referral_out = :referral_out, insurance_company = :insurance_company,
               insurance_normalized = :insurance_normalized, program = :program,
               referral_sent_to = :referral_sent_to, admitted = :admitted,
               outreach_rep = :outreach_rep, notes = :notes,
               updated_at = :updated_at, updated_by = :updated_by
             WHERE id = :id",
            named_params! {
                ":id": merged.id.as_str(),
                ":first_name": merged.first_name,
                ":last_name": merged.last_name,
                ":name_normalized": normalize_lookup(&merged.full_name()),
                ":lead_source": merged.lead_source.as_str(),
                ":referral_source": merged.referral_source,
                ":referral_source_normalized": merged.referral_source.as_deref().map(normalize_lookup),
                ":referral_out": merged.referral_out,
                ":insurance_company": merged.insurance_company,
                ":insurance_normalized": merged.insurance_company.as_deref().map(normalize_lookup),
                ":program": merged.program.map(LevelOfCare::as_str),
                ":referral_sent_to": merged.referral_sent_to,
                ":admitted": i64::from(merged.admitted),
                ":outreach_rep": merged.outreach_rep,
                ":notes": merged.notes,
                ":updated_at": merged.updated_at.map(format_timestamp),
                ":updated_by": merged.updated_by,
            },
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("referral", id.as_str()));
        }
        tracing::debug!(id = %id, actor, "referral updated");
        Ok(merged)
    }

    pub fn delete_referral(&self, id: &RecordId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM referrals WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::not_found("referral", id.as_str()));
        }
        tracing::debug!(id = %id, "referral deleted");
        Ok(())
    }

    /// Full set, newest first; feeds metrics and export.
    pub fn all_referrals(&self) -> Result<Vec<Referral>, StoreError> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals ORDER BY created_at DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], referral_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count_referrals(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM referrals", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
