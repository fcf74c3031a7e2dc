use chrono::{DateTime, Duration, TimeZone, Utc};
use referral_desk_model::{
    ContactDraft, ContactPatch, LeadSource, LevelOfCare, RecordId, ReferralDraft, ReferralPatch,
};
use referral_desk_store::{ContactFilter, ReferralStore, StoreErrorCode, STORE_SCHEMA_VERSION};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).single().expect("time")
}

#[test]
fn open_creates_schema_and_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("referrals.sqlite");
    let store = ReferralStore::open(&path).expect("open");
    assert_eq!(store.schema_version().expect("version"), STORE_SCHEMA_VERSION);
    assert_eq!(
        store.meta("schema_version").expect("meta").as_deref(),
        Some("1")
    );
    drop(store);
    let reopened = ReferralStore::open(&path).expect("reopen");
    assert_eq!(reopened.count_referrals().expect("count"), 0);
}

#[test]
fn open_refuses_newer_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("future.sqlite");
    {
        let conn = rusqlite::Connection::open(&path).expect("raw open");
        conn.execute_batch("PRAGMA user_version=99;").expect("bump");
    }
    let err = ReferralStore::open(&path).expect_err("newer schema");
    assert_eq!(err.code, StoreErrorCode::Schema);
}

#[test]
fn referral_crud_round_trip() {
    let store = ReferralStore::open_in_memory().expect("store");
    let draft = ReferralDraft {
        program: Some(LevelOfCare::Rtc),
        referral_sent_to: Some("SBR".into()),
        ..ReferralDraft::new("Ana", "Diaz", LeadSource::Kaiser)
    };
    let created = store.insert_referral(draft, "intake@example.org", t0()).expect("insert");
    let fetched = store.get_referral(&created.id).expect("get").expect("present");
    assert_eq!(fetched, created);

    let later = t0() + Duration::hours(2);
    let updated = store
        .update_referral(
            &created.id,
            &ReferralPatch {
                admitted: Some(true),
                referral_sent_to: Some(String::new()),
                ..ReferralPatch::default()
            },
            "admin@example.org",
            later,
        )
        .expect("update");
    assert!(updated.admitted);
    assert_eq!(updated.referral_sent_to, None);
    assert_eq!(updated.updated_at, Some(later));
    assert_eq!(updated.updated_by.as_deref(), Some("admin@example.org"));
    assert_eq!(
        store.get_referral(&created.id).expect("get").expect("present"),
        updated
    );

    store.delete_referral(&created.id).expect("delete");
    assert!(store.get_referral(&created.id).expect("get").is_none());
    let err = store.delete_referral(&created.id).expect_err("gone");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[test]
fn insert_rejects_invalid_draft_with_field_issues() {
    let store = ReferralStore::open_in_memory().expect("store");
    let err = store
        .insert_referral(
            ReferralDraft::new("Ana", "Diaz", LeadSource::Outreach),
            "a",
            t0(),
        )
        .expect_err("rep required");
    assert_eq!(err.code, StoreErrorCode::Validation);
    assert_eq!(err.issues[0].field, "outreach_rep");
    assert_eq!(store.count_referrals().expect("count"), 0);
}

#[test]
fn update_missing_referral_is_not_found() {
    let store = ReferralStore::open_in_memory().expect("store");
    let err = store
        .update_referral(&RecordId::generate(), &ReferralPatch::default(), "a", t0())
        .expect_err("missing");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[test]
fn all_referrals_is_newest_first() {
    let store = ReferralStore::open_in_memory().expect("store");
    for (i, name) in ["Old", "Mid", "New"].iter().enumerate() {
        store
            .insert_referral(
                ReferralDraft::new(name, "X", LeadSource::Direct),
                "a",
                t0() + Duration::days(i as i64),
            )
            .expect("insert");
    }
    let names: Vec<String> = store
        .all_referrals()
        .expect("all")
        .into_iter()
        .map(|r| r.first_name)
        .collect();
    assert_eq!(names, vec!["New", "Mid", "Old"]);
}

#[test]
fn contacts_crud_and_filters() {
    let store = ReferralStore::open_in_memory().expect("store");
    let harbor = store
        .insert_contact(
            ContactDraft {
                referral_partner: "Harbor Clinic".into(),
                referral_rep: "Lee Park".into(),
                referral_contact_info: "555-0100".into(),
                referent_email: None,
            },
            "admin",
            t0(),
        )
        .expect("insert");
    store
        .insert_contact(
            ContactDraft {
                referral_partner: "Valley 100% Care".into(),
                referral_rep: "Kim".into(),
                referral_contact_info: "555-0101".into(),
                referent_email: Some("kim@valley.example".into()),
            },
            "admin",
            t0() + Duration::minutes(1),
        )
        .expect("insert");

    let all = store.list_contacts(&ContactFilter::default()).expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].referral_partner, "Valley 100% Care");

    let by_partner = store
        .list_contacts(&ContactFilter {
            referral_partner: Some("HARBOR".into()),
            ..ContactFilter::default()
        })
        .expect("filter");
    assert_eq!(by_partner.len(), 1);
    assert_eq!(by_partner[0].id, harbor.id);

    let literal_percent = store
        .list_contacts(&ContactFilter {
            referral_partner: Some("100%".into()),
            ..ContactFilter::default()
        })
        .expect("filter");
    assert_eq!(literal_percent.len(), 1);

    let updated = store
        .update_contact(
            &harbor.id,
            &ContactPatch {
                referral_rep: Some("Jordan".into()),
                ..ContactPatch::default()
            },
        )
        .expect("update");
    assert_eq!(updated.referral_rep, "Jordan");
    let by_rep = store
        .list_contacts(&ContactFilter {
            referral_rep: Some("jord".into()),
            ..ContactFilter::default()
        })
        .expect("filter");
    assert_eq!(by_rep.len(), 1);

    store.delete_contact(&harbor.id).expect("delete");
    assert!(store.get_contact(&harbor.id).expect("get").is_none());
    assert_eq!(
        store.delete_contact(&harbor.id).expect_err("gone").code,
        StoreErrorCode::NotFound
    );
}
