// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![recursion_limit = "256"]

mod dto;
mod error_mapping;
mod errors;
mod openapi;
mod params;

pub const CRATE_NAME: &str = "referral-desk-api";
pub const API_VERSION: &str = "v1";

pub use dto::{
    ContactListResponse, DeletedResponse, MetricsResponse, PageDto, ReferralListResponse,
    VersionResponse,
};
pub use error_mapping::{map_error, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode, ApiErrorEnvelope, UNASSIGNED_REQUEST_ID};
pub use openapi::openapi_v1_spec;
pub use params::{
    parse_contact_filter, parse_export_params, parse_import_params, parse_metrics_params,
    parse_referral_filter, parse_referral_list_params, ExportParams, ImportParams, MetricsParams,
    MAX_CURSOR_BYTES,
};
