// SPDX-License-Identifier: Apache-2.0

use crate::ApiErrorCode;
use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiErrorEnvelope"}}}
    })
}

fn query_param(name: &str, schema: Value) -> Value {
    json!({"name": name, "in": "query", "schema": schema})
}

fn id_param() -> Value {
    json!({"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}})
}

fn referral_filter_params() -> Vec<Value> {
    vec![
        query_param("program", json!({"$ref": "#/components/schemas/LevelOfCare"})),
        query_param("admitted", json!({"type": "boolean"})),
        query_param("referral_sent_to", json!({"type": "string"})),
        query_param("lead_source", json!({"$ref": "#/components/schemas/LeadSource"})),
        query_param("outreach_rep", json!({"type": "string"})),
        query_param("name", json!({"type": "string", "description": "substring of first or last name"})),
        query_param("referral_source", json!({"type": "string"})),
        query_param("insurance_company", json!({"type": "string"})),
        query_param("created_from", json!({"type": "string", "format": "date"})),
        query_param("created_to", json!({"type": "string", "format": "date"})),
    ]
}

fn metrics_params() -> Vec<Value> {
    vec![
        query_param("created_from", json!({"type": "string", "format": "date"})),
        query_param("created_to", json!({"type": "string", "format": "date"})),
        query_param("program", json!({"$ref": "#/components/schemas/LevelOfCare"})),
        query_param("referral_source", json!({"type": "string"})),
        query_param("referral_sent_to", json!({"type": "string"})),
        query_param("lead_source", json!({"$ref": "#/components/schemas/LeadSource"})),
        query_param("outreach_rep", json!({"type": "string"})),
        query_param("group_by", json!({"type": "string", "enum": ["lead_source", "referral_source", "referral_sent_to", "outreach_rep", "program", "insurance_company"]})),
        query_param("sort", json!({"type": "string", "enum": ["key", "total", "admitted", "rate"]})),
        query_param("direction", json!({"type": "string", "enum": ["asc", "desc"]})),
    ]
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    let error_codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    let mut list_params = referral_filter_params();
    list_params.extend([
        query_param("sort", json!({"type": "string", "enum": ["date", "name"]})),
        query_param("direction", json!({"type": "string", "enum": ["asc", "desc"]})),
        query_param("limit", json!({"type": "integer", "minimum": 1, "maximum": 500})),
        query_param("cursor", json!({"type": "string"})),
    ]);
    let mut export_params = referral_filter_params();
    export_params.extend([
        query_param("sort", json!({"type": "string", "enum": ["date", "name"]})),
        query_param("direction", json!({"type": "string", "enum": ["asc", "desc"]})),
    ]);
    let text_field = json!({"type": "string", "nullable": true});

    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "referral-desk API",
        "version": crate::API_VERSION
      },
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {
          "get": {
            "responses": {
              "200": {"description": "store reachable"},
              "503": error_response("store not reachable")
            }
          }
        },
        "/v1/version": {"get": {"responses": {"200": {"description": "service version"}}}},
        "/v1/openapi.json": {"get": {"responses": {"200": {"description": "this document"}}}},
        "/v1/referrals": {
          "get": {
            "parameters": list_params,
            "responses": {
              "200": {"description": "referral page"},
              "400": error_response("invalid query or cursor")
            }
          },
          "post": {
            "requestBody": {"required": true, "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ReferralDraft"}}}},
            "responses": {
              "201": {"description": "created referral", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Referral"}}}},
              "400": error_response("malformed body"),
              "422": error_response("validation failed")
            }
          }
        },
        "/v1/referrals/{id}": {
          "get": {
            "parameters": [id_param()],
            "responses": {"200": {"description": "referral"}, "404": error_response("not found")}
          },
          "patch": {
            "parameters": [id_param()],
            "requestBody": {"required": true, "content": {"application/json": {"schema": {"type": "object"}}}},
            "responses": {
              "200": {"description": "updated referral"},
              "404": error_response("not found"),
              "422": error_response("validation failed")
            }
          },
          "delete": {
            "parameters": [id_param()],
            "responses": {"200": {"description": "deleted"}, "404": error_response("not found")}
          }
        },
        "/v1/referrals/import": {
          "post": {
            "parameters": [
              query_param("batch_size", json!({"type": "integer", "minimum": 1, "maximum": 500})),
              query_param("default_lead_source", json!({"$ref": "#/components/schemas/LeadSource"})),
              query_param("dry_run", json!({"type": "boolean"}))
            ],
            "requestBody": {"required": true, "content": {"text/csv": {"schema": {"type": "string"}}}},
            "responses": {
              "200": {"description": "import report"},
              "400": error_response("unreadable CSV"),
              "413": error_response("body too large")
            }
          }
        },
        "/v1/referrals/export": {
          "get": {
            "parameters": export_params,
            "responses": {"200": {"description": "CSV export", "content": {"text/csv": {"schema": {"type": "string"}}}}}
          }
        },
        "/v1/metrics": {
          "get": {
            "parameters": metrics_params(),
            "responses": {"200": {"description": "metrics report"}, "400": error_response("invalid query")}
          }
        },
        "/v1/metrics/export": {
          "get": {
            "parameters": metrics_params(),
            "responses": {"200": {"description": "group CSV", "content": {"text/csv": {"schema": {"type": "string"}}}}}
          }
        },
        "/v1/referent-contacts": {
          "get": {
            "parameters": [
              query_param("referral_partner", json!({"type": "string"})),
              query_param("referral_rep", json!({"type": "string"}))
            ],
            "responses": {"200": {"description": "contact list"}}
          },
          "post": {
            "requestBody": {"required": true, "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ContactDraft"}}}},
            "responses": {"201": {"description": "created contact"}, "422": error_response("validation failed")}
          }
        },
        "/v1/referent-contacts/{id}": {
          "get": {"parameters": [id_param()], "responses": {"200": {"description": "contact"}, "404": error_response("not found")}},
          "patch": {"parameters": [id_param()], "responses": {"200": {"description": "updated contact"}, "404": error_response("not found"), "422": error_response("validation failed")}},
          "delete": {"parameters": [id_param()], "responses": {"200": {"description": "deleted"}, "404": error_response("not found")}}
        }
      },
      "components": {
        "securitySchemes": {
          "ApiKey": {"type": "apiKey", "in": "header", "name": "x-api-key"}
        },
        "schemas": {
          "LeadSource": {"type": "string", "enum": ["Insurance", "Kaiser", "Outreach", "Direct"]},
          "LevelOfCare": {"type": "string", "enum": ["DTX", "RTC", "PHP", "IOP"]},
          "ReferralDraft": {
            "type": "object",
            "required": ["first_name", "last_name"],
            "additionalProperties": false,
            "properties": {
              "first_name": {"type": "string", "maxLength": 256},
              "last_name": {"type": "string", "maxLength": 256},
              "lead_source": {"$ref": "#/components/schemas/LeadSource"},
              "referral_source": text_field,
              "referral_out": text_field,
              "insurance_company": text_field,
              "program": {"type": "string", "nullable": true},
              "referral_sent_to": text_field,
              "admitted": {"type": "boolean"},
              "outreach_rep": text_field,
              "notes": {"type": "string", "nullable": true, "maxLength": 4096}
            }
          },
          "Referral": {
            "type": "object",
            "required": ["id", "first_name", "last_name", "lead_source", "admitted", "created_at", "created_by"],
            "properties": {
              "id": {"type": "string", "format": "uuid"},
              "created_at": {"type": "string", "format": "date-time"},
              "created_by": {"type": "string"},
              "updated_at": {"type": "string", "format": "date-time", "nullable": true},
              "updated_by": {"type": "string", "nullable": true}
            }
          },
          "ContactDraft": {
            "type": "object",
            "required": ["referral_partner", "referral_rep", "referral_contact_info"],
            "additionalProperties": false,
            "properties": {
              "referral_partner": {"type": "string"},
              "referral_rep": {"type": "string"},
              "referral_contact_info": {"type": "string"},
              "referent_email": {"type": "string", "nullable": true}
            }
          },
          "ApiErrorCode": {"type": "string", "enum": error_codes},
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details", "request_id"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"},
              "request_id": {"type": "string"}
            }
          },
          "ApiErrorEnvelope": {
            "type": "object",
            "required": ["error"],
            "properties": {"error": {"$ref": "#/components/schemas/ApiError"}}
          }
        }
      }
    })
}
