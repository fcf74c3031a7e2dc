use referral_desk_model::{
    ContactDraft, LeadSource, LevelOfCare, RecordId, ReferralDraft, ReferralPatch,
};

#[test]
fn enums_serialize_with_display_labels() {
    assert_eq!(
        serde_json::to_string(&LeadSource::Kaiser).expect("json"),
        "\"Kaiser\""
    );
    assert_eq!(
        serde_json::to_string(&LevelOfCare::Dtx).expect("json"),
        "\"DTX\""
    );
    let parsed: LevelOfCare = serde_json::from_str("\"rtc\"").expect("lenient parse");
    assert_eq!(parsed, LevelOfCare::Rtc);
}

#[test]
fn draft_rejects_unknown_fields_and_bad_enums() {
    assert!(serde_json::from_str::<ReferralDraft>(r#"{"first_name":"A","nickname":"B"}"#).is_err());
    assert!(serde_json::from_str::<ReferralDraft>(r#"{"lead_source":"Walk-in"}"#).is_err());
    assert!(serde_json::from_str::<ContactDraft>(r#"{"referral_partner":"x","fax":"1"}"#).is_err());
}

#[test]
fn patch_distinguishes_absent_from_empty() {
    let patch: ReferralPatch =
        serde_json::from_str(r#"{"notes":"","admitted":true}"#).expect("json");
    assert_eq!(patch.notes.as_deref(), Some(""));
    assert_eq!(patch.admitted, Some(true));
    assert_eq!(patch.referral_source, None);
    assert!(!patch.is_empty());
    assert!(ReferralPatch::default().is_empty());
}

#[test]
fn patch_program_reads_like_the_draft_field() {
    let set: ReferralPatch = serde_json::from_str(r#"{"program":"php"}"#).expect("json");
    assert_eq!(set.program, Some(Some(LevelOfCare::Php)));
    let cleared: ReferralPatch = serde_json::from_str(r#"{"program":"  "}"#).expect("json");
    assert_eq!(cleared.program, Some(None));
    let nulled: ReferralPatch = serde_json::from_str(r#"{"program":null}"#).expect("json");
    assert_eq!(nulled.program, Some(None));
    let absent: ReferralPatch = serde_json::from_str(r#"{"admitted":false}"#).expect("json");
    assert_eq!(absent.program, None);
    assert!(serde_json::from_str::<ReferralPatch>(r#"{"program":"Sober living"}"#).is_err());
}

#[test]
fn record_id_rejects_non_uuid_json() {
    assert!(serde_json::from_str::<RecordId>("\"abc\"").is_err());
}
