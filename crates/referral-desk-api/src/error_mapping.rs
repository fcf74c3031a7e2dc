// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};
use referral_desk_ingest::IngestError;
use referral_desk_model::ValidationError;
use referral_desk_query::{QueryError, QueryErrorCode};
use referral_desk_store::{StoreError, StoreErrorCode};
use serde_json::json;

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    pub schema_ref: &'static str,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidQueryParameter
        | ApiErrorCode::InvalidCursor
        | ApiErrorCode::InvalidBody => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::ValidationFailed => 422,
        ApiErrorCode::NotReady => 503,
        _ => 500,
    };

    ApiErrorMapping {
        status_code,
        schema_ref: API_ERROR_SCHEMA_REF,
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::validation_failed(&value.issues)
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value.code {
            StoreErrorCode::NotFound => Self::pending(
                ApiErrorCode::NotFound,
                value.message,
                json!({}),
            ),
            StoreErrorCode::Validation => Self::validation_failed(&value.issues),
            _ => Self::internal("store operation failed"),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value.code {
            QueryErrorCode::Validation => Self::pending(
                ApiErrorCode::InvalidQueryParameter,
                value.message,
                json!({}),
            ),
            QueryErrorCode::Cursor => Self::invalid_cursor(&value.message),
            _ => Self::internal("query failed"),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(value: IngestError) -> Self {
        Self::invalid_body(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use referral_desk_model::FieldIssue;

    #[test]
    fn store_errors_keep_their_meaning() {
        let missing: ApiError = StoreError::not_found("referral", "abc").into();
        assert_eq!(map_error(&missing).status_code, 404);

        let mut invalid = StoreError::new(StoreErrorCode::Validation, "bad");
        invalid.issues.push(FieldIssue {
            field: "first_name".to_string(),
            reason: "is required".to_string(),
        });
        let api: ApiError = invalid.into();
        assert_eq!(api.code, ApiErrorCode::ValidationFailed);
        assert_eq!(api.details["field_errors"][0]["field"], "first_name");
        assert_eq!(map_error(&api).status_code, 422);

        let sql: ApiError = StoreError::new(StoreErrorCode::Sql, "disk I/O error").into();
        assert_eq!(map_error(&sql).status_code, 500);
        assert!(!sql.message.contains("disk"));
    }

    #[test]
    fn query_errors_map_to_client_errors() {
        let v: ApiError = QueryError::validation("limit must be between 1 and 500").into();
        assert_eq!(map_error(&v).status_code, 400);
        let c: ApiError = QueryError::new(QueryErrorCode::Cursor, "bad signature").into();
        assert_eq!(c.code, ApiErrorCode::InvalidCursor);
    }
}
