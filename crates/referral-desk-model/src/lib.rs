// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Referral desk model SSOT.
//!
//! ```compile_fail
//! use referral_desk_model::LeadSource;
//!
//! fn exhaustive_match(s: LeadSource) -> &'static str {
//!     match s {
//!         LeadSource::Insurance => "i",
//!         LeadSource::Kaiser => "k",
//!         LeadSource::Outreach => "o",
//!         LeadSource::Direct => "d",
//!     }
//! }
//! ```

mod contact;
mod day;
mod ids;
mod quarter;
mod referral;
mod serde_helpers;
mod validation;

pub use contact::{ContactDraft, ContactPatch, ReferentContact};
pub use day::{parse_iso_day, YEAR_RANGE};
pub use ids::RecordId;
pub use quarter::Quarter;
pub use referral::{LeadSource, LevelOfCare, Referral, ReferralDraft, ReferralPatch};
pub use validation::{
    clean_optional, FieldIssue, ValidationError, NAME_MAX_LEN, NOTES_MAX_LEN, TEXT_MAX_LEN,
};

pub const CRATE_NAME: &str = "referral-desk-model";

/// Actor recorded when a request carries no identity.
pub const UNKNOWN_ACTOR: &str = "unknown";
