// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
pub(crate) const CURSOR_VERSION_V1: &str = "v1";
const MAX_CURSOR_DEPTH: u32 = 100_000;
const MAX_CURSOR_TOKEN_LEN: usize = 1024;
const MAX_CURSOR_PAYLOAD_PART_LEN: usize = 768;
const MAX_CURSOR_SIG_PART_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CursorErrorCode {
    InvalidFormat,
    UnsupportedVersion,
    InvalidSignature,
    InvalidPayload,
    QueryHashMismatch,
    SortMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorError {
    pub code: CursorErrorCode,
    pub message: String,
}

impl CursorError {
    #[must_use]
    pub fn new(code: CursorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for CursorError {}

/// Which neighbour page a cursor opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    Next,
    Prev,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CursorPayload {
    #[serde(default = "cursor_version_v1")]
    pub cursor_version: String,
    pub sort: String,
    pub page: PageDirection,
    pub last_key: String,
    pub last_id: String,
    pub query_hash: String,
    #[serde(default)]
    pub depth: u32,
}

fn keyed_mac(secret: &[u8], payload_part: &str) -> Result<HmacSha256, CursorError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
    mac.update(payload_part.as_bytes());
    Ok(mac)
}

fn unbase64(part: &str) -> Result<Vec<u8>, CursorError> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidFormat, e.to_string()))
}

/// `v1.<base64url json>.<base64url hmac>`
pub fn encode_cursor(payload: &CursorPayload, secret: &[u8]) -> Result<String, CursorError> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(json);
    let signature = keyed_mac(secret, &payload_part)?.finalize().into_bytes();
    Ok(format!(
        "{CURSOR_VERSION_V1}.{payload_part}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verifies the signature first, then that the cursor belongs to this query.
pub fn decode_cursor(
    token: &str,
    secret: &[u8],
    expected_hash: &str,
    expected_sort: &str,
) -> Result<CursorPayload, CursorError> {
    if token.len() > MAX_CURSOR_TOKEN_LEN {
        return Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "cursor exceeds max length",
        ));
    }
    let (payload_part, sig_part) = split_token(token)?;
    if payload_part.len() > MAX_CURSOR_PAYLOAD_PART_LEN || sig_part.len() > MAX_CURSOR_SIG_PART_LEN
    {
        return Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "cursor part exceeds max length",
        ));
    }

    keyed_mac(secret, payload_part)?
        .verify_slice(&unbase64(sig_part)?)
        .map_err(|_| CursorError::new(CursorErrorCode::InvalidSignature, "cursor signature mismatch"))?;
    let payload: CursorPayload = serde_json::from_slice(&unbase64(payload_part)?)
        .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;

    let mismatch = if payload.cursor_version != CURSOR_VERSION_V1 {
        Some((CursorErrorCode::UnsupportedVersion, "cursor version unsupported".to_string()))
    } else if payload.query_hash != expected_hash {
        Some((
            CursorErrorCode::QueryHashMismatch,
            "cursor was issued for a different query".to_string(),
        ))
    } else if payload.sort != expected_sort {
        Some((
            CursorErrorCode::SortMismatch,
            format!("cursor sort {} does not match {expected_sort}", payload.sort),
        ))
    } else if payload.depth > MAX_CURSOR_DEPTH {
        Some((CursorErrorCode::InvalidPayload, "cursor depth exceeds max".to_string()))
    } else {
        None
    };
    match mismatch {
        Some((code, message)) => Err(CursorError::new(code, message)),
        None => Ok(payload),
    }
}

fn split_token(token: &str) -> Result<(&str, &str), CursorError> {
    let mut parts = token.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(CURSOR_VERSION_V1), Some(payload), Some(sig)) if !sig.contains('.') => {
            Ok((payload, sig))
        }
        (Some(version), Some(_), Some(sig)) if !sig.contains('.') => Err(CursorError::new(
            CursorErrorCode::UnsupportedVersion,
            format!("unsupported cursor version: {version}"),
        )),
        _ => Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "invalid cursor format",
        )),
    }
}

fn cursor_version_v1() -> String {
    CURSOR_VERSION_V1.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CursorPayload {
        CursorPayload {
            cursor_version: CURSOR_VERSION_V1.to_string(),
            sort: "date".to_string(),
            page: PageDirection::Next,
            last_key: "2024-01-01T00:00:00.000000000Z".to_string(),
            last_id: "6f9619ff-8b86-4d01-b42d-00cf4fc964ff".to_string(),
            query_hash: "abc".to_string(),
            depth: 1,
        }
    }

    #[test]
    fn round_trip_checks_signature_hash_and_sort() {
        let token = encode_cursor(&payload(), b"secret").expect("encode");
        assert!(token.starts_with("v1."));
        assert_eq!(
            decode_cursor(&token, b"secret", "abc", "date").expect("decode"),
            payload()
        );
        assert_eq!(
            decode_cursor(&token, b"other", "abc", "date")
                .expect_err("sig")
                .code,
            CursorErrorCode::InvalidSignature
        );
        assert_eq!(
            decode_cursor(&token, b"secret", "xyz", "date")
                .expect_err("hash")
                .code,
            CursorErrorCode::QueryHashMismatch
        );
        assert_eq!(
            decode_cursor(&token, b"secret", "abc", "name")
                .expect_err("sort")
                .code,
            CursorErrorCode::SortMismatch
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            decode_cursor("garbage", b"s", "abc", "date")
                .expect_err("format")
                .code,
            CursorErrorCode::InvalidFormat
        );
        assert_eq!(
            decode_cursor("v9.a.b", b"s", "abc", "date")
                .expect_err("version")
                .code,
            CursorErrorCode::UnsupportedVersion
        );
        let long = "v1.".to_string() + &"a".repeat(2000) + ".b";
        assert_eq!(
            decode_cursor(&long, b"s", "abc", "date")
                .expect_err("length")
                .code,
            CursorErrorCode::InvalidFormat
        );
    }
}
