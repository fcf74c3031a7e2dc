// SPDX-License-Identifier: Apache-2.0

use crate::IngestError;

/// Referral field a CSV column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReferralColumn {
    FirstName,
    LastName,
    FullName,
    LeadSource,
    ReferralSource,
    ReferralOut,
    InsuranceCompany,
    Program,
    ReferralSentTo,
    Admitted,
    OutreachRep,
    Notes,
    CreatedAt,
    CreatedBy,
    /// Recognised but not imported (store-assigned values such as `ID`).
    Ignored,
}

const ALIASES: &[(&str, ReferralColumn)] = &[
    ("firstname", ReferralColumn::FirstName),
    ("fname", ReferralColumn::FirstName),
    ("first", ReferralColumn::FirstName),
    ("givenname", ReferralColumn::FirstName),
    ("lastname", ReferralColumn::LastName),
    ("lname", ReferralColumn::LastName),
    ("last", ReferralColumn::LastName),
    ("surname", ReferralColumn::LastName),
    ("familyname", ReferralColumn::LastName),
    ("name", ReferralColumn::FullName),
    ("fullname", ReferralColumn::FullName),
    ("clientname", ReferralColumn::FullName),
    ("patientname", ReferralColumn::FullName),
    ("leadsource", ReferralColumn::LeadSource),
    ("lead", ReferralColumn::LeadSource),
    ("leadtype", ReferralColumn::LeadSource),
    ("referralsource", ReferralColumn::ReferralSource),
    ("referredby", ReferralColumn::ReferralSource),
    ("referrer", ReferralColumn::ReferralSource),
    ("source", ReferralColumn::ReferralSource),
    ("referralout", ReferralColumn::ReferralOut),
    ("referredout", ReferralColumn::ReferralOut),
    ("outgoingreferral", ReferralColumn::ReferralOut),
    ("insurancecompany", ReferralColumn::InsuranceCompany),
    ("insurance", ReferralColumn::InsuranceCompany),
    ("payor", ReferralColumn::InsuranceCompany),
    ("payer", ReferralColumn::InsuranceCompany),
    ("insurer", ReferralColumn::InsuranceCompany),
    ("program", ReferralColumn::Program),
    ("levelofcare", ReferralColumn::Program),
    ("loc", ReferralColumn::Program),
    ("referralsentto", ReferralColumn::ReferralSentTo),
    ("sentto", ReferralColumn::ReferralSentTo),
    ("destination", ReferralColumn::ReferralSentTo),
    ("facility", ReferralColumn::ReferralSentTo),
    ("admitted", ReferralColumn::Admitted),
    ("admissionstatus", ReferralColumn::Admitted),
    ("admit", ReferralColumn::Admitted),
    ("outreachrep", ReferralColumn::OutreachRep),
    ("rep", ReferralColumn::OutreachRep),
    ("representative", ReferralColumn::OutreachRep),
    ("notes", ReferralColumn::Notes),
    ("note", ReferralColumn::Notes),
    ("comments", ReferralColumn::Notes),
    ("comment", ReferralColumn::Notes),
    ("createdat", ReferralColumn::CreatedAt),
    ("created", ReferralColumn::CreatedAt),
    ("date", ReferralColumn::CreatedAt),
    ("referraldate", ReferralColumn::CreatedAt),
    ("timestamp", ReferralColumn::CreatedAt),
    ("createdby", ReferralColumn::CreatedBy),
    ("submittedby", ReferralColumn::CreatedBy),
    ("id", ReferralColumn::Ignored),
    ("updatedat", ReferralColumn::Ignored),
    ("updatedby", ReferralColumn::Ignored),
];

/// Lowercase with every non-alphanumeric character removed.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[must_use]
pub fn lookup_column(raw: &str) -> Option<ReferralColumn> {
    let key = normalize_header(raw);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, column)| *column)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    pub columns: Vec<Option<ReferralColumn>>,
    pub unmapped: Vec<String>,
}

impl HeaderMap {
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self, IngestError> {
        let mut columns = Vec::new();
        let mut unmapped = Vec::new();
        let mut seen: Vec<ReferralColumn> = Vec::new();
        for raw in headers {
            let column = lookup_column(raw);
            match column {
                None => {
                    if !raw.trim().is_empty() {
                        unmapped.push(raw.trim().to_string());
                    }
                    columns.push(None);
                }
                // The first column wins when two headers alias the same field.
                Some(c) if c != ReferralColumn::Ignored && seen.contains(&c) => {
                    unmapped.push(raw.trim().to_string());
                    columns.push(None);
                }
                Some(c) => {
                    seen.push(c);
                    columns.push(Some(c));
                }
            }
        }
        let has_split = seen.contains(&ReferralColumn::FirstName) && seen.contains(&ReferralColumn::LastName);
        if !has_split && !seen.contains(&ReferralColumn::FullName) {
            return Err(IngestError(
                "CSV needs First Name and Last Name columns, or a single Name column".to_string(),
            ));
        }
        Ok(Self { columns, unmapped })
    }

    #[must_use]
    pub fn position(&self, column: ReferralColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == Some(column))
    }
}
