// SPDX-License-Identifier: Apache-2.0

use crate::IngestError;
use referral_desk_model::Referral;
use referral_desk_query::GroupStats;
use referral_desk_store::format_timestamp;
use std::io::Write;

pub const REFERRAL_CSV_HEADER: [&str; 14] = [
    "ID",
    "First Name",
    "Last Name",
    "Lead Source",
    "Referral Source",
    "Referral Out",
    "Insurance Company",
    "Program",
    "Referral Sent To",
    "Admitted",
    "Outreach Rep",
    "Notes",
    "Created At",
    "Created By",
];

pub const METRICS_CSV_HEADER: [&str; 4] = ["Group", "Total", "Admitted", "Conversion Rate"];

fn csv_err(e: csv::Error) -> IngestError {
    IngestError(format!("csv write failed: {e}"))
}

/// Writes `rows` in the given order under [`REFERRAL_CSV_HEADER`]. The output
/// reads back through the importer without loss.
pub fn write_referrals_csv<W: Write>(out: W, rows: &[Referral]) -> Result<usize, IngestError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(REFERRAL_CSV_HEADER).map_err(csv_err)?;
    for r in rows {
        let created_at = format_timestamp(r.created_at);
        writer
            .write_record([
                r.id.as_str(),
                r.first_name.as_str(),
                r.last_name.as_str(),
                r.lead_source.as_str(),
                r.referral_source.as_deref().unwrap_or_default(),
                r.referral_out.as_deref().unwrap_or_default(),
                r.insurance_company.as_deref().unwrap_or_default(),
                r.program.map(|p| p.as_str()).unwrap_or_default(),
                r.referral_sent_to.as_deref().unwrap_or_default(),
                if r.admitted { "Yes" } else { "No" },
                r.outreach_rep.as_deref().unwrap_or_default(),
                r.notes.as_deref().unwrap_or_default(),
                created_at.as_str(),
                r.created_by.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| IngestError(format!("csv flush failed: {e}")))?;
    Ok(rows.len())
}

pub fn write_metrics_csv<W: Write>(out: W, groups: &[GroupStats]) -> Result<usize, IngestError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(METRICS_CSV_HEADER).map_err(csv_err)?;
    for g in groups {
        writer
            .write_record([
                g.key.clone(),
                g.total.to_string(),
                g.admitted.to_string(),
                format!("{:.1}", g.conversion_rate),
            ])
            .map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| IngestError(format!("csv flush failed: {e}")))?;
    Ok(groups.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_rows_format_rate_with_one_decimal() {
        let mut buf = Vec::new();
        let groups = vec![GroupStats {
            key: "St. Mary's, North".to_string(),
            total: 3,
            admitted: 1,
            conversion_rate: 33.3,
        }];
        assert_eq!(write_metrics_csv(&mut buf, &groups).expect("write"), 1);
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            text,
            "Group,Total,Admitted,Conversion Rate\n\"St. Mary's, North\",3,1,33.3\n"
        );
    }
}
