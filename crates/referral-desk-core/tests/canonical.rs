use referral_desk_core::{canonical, ExitCode, MachineError};
use serde_json::json;

#[test]
fn stable_json_bytes_are_key_order_deterministic() {
    let a = json!({"z": 2, "a": 1});
    let b = json!({"a": 1, "z": 2});
    let ba = canonical::stable_json_bytes(&a).expect("stable json a");
    let bb = canonical::stable_json_bytes(&b).expect("stable json b");
    assert_eq!(ba, bb);
}

#[test]
fn stable_json_hash_ignores_nested_key_order() {
    let a = json!({"filter": {"program": "RTC", "admitted": true}, "limit": 25});
    let b = json!({"limit": 25, "filter": {"admitted": true, "program": "RTC"}});
    assert_eq!(
        canonical::stable_json_hash_hex(&a).expect("hash a"),
        canonical::stable_json_hash_hex(&b).expect("hash b")
    );
}

#[test]
fn stable_json_hash_is_lowercase_sha256() {
    let hash = canonical::stable_json_hash_hex(&json!({"b": [1, {"d": 0, "c": 1}]})).expect("hash");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(
        canonical::stable_json_bytes(&json!({"b": [1, {"d": 0, "c": 1}]})).expect("bytes"),
        br#"{"b":[1,{"c":1,"d":0}]}"#.to_vec()
    );
}

#[test]
fn machine_error_serializes_details() {
    let err = MachineError::new("validation", "row rejected").with_detail("line", "4");
    let value = serde_json::to_value(&err).expect("json");
    assert_eq!(value["details"]["line"], "4");
    assert_eq!(err.to_string(), "validation: row rejected");
    assert_eq!(ExitCode::Validation.as_str(), "validation");
    assert_eq!(ExitCode::Internal as u8, 10);
}
