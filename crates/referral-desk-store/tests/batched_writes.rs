use chrono::{TimeZone, Utc};
use referral_desk_model::{LeadSource, RecordId, Referral, ReferralDraft};
use referral_desk_store::{ReferralStore, StoreErrorCode, MAX_BATCH_SIZE};

fn record(i: usize) -> Referral {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single().expect("time");
    ReferralDraft::new(&format!("P{i}"), "Batch", LeadSource::Insurance)
        .into_referral(RecordId::generate(), "import", now)
        .expect("valid")
}

#[test]
fn rows_are_split_into_batches() {
    let mut store = ReferralStore::open_in_memory().expect("store");
    let rows: Vec<Referral> = (0..7).map(record).collect();
    let outcome = store.insert_referrals_batched(rows, 3).expect("batched");
    assert_eq!(outcome.batches.len(), 3);
    assert_eq!(outcome.written, 7);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.batches[2].rows, 1);
    assert_eq!(store.count_referrals().expect("count"), 7);
}

#[test]
fn failing_batch_rolls_back_alone() {
    let mut store = ReferralStore::open_in_memory().expect("store");
    let mut rows: Vec<Referral> = (0..6).map(record).collect();
    // Duplicate primary key inside the second batch.
    rows[3].id = rows[2].id.clone();
    let outcome = store.insert_referrals_batched(rows, 2).expect("batched");
    assert_eq!(outcome.written, 4);
    assert_eq!(outcome.failed, 2);
    let failed: Vec<usize> = outcome.failed_batches().map(|b| b.index).collect();
    assert_eq!(failed, vec![1]);
    assert_eq!(store.count_referrals().expect("count"), 4);
}

#[test]
fn batch_size_is_capped_and_zero_rejected() {
    let mut store = ReferralStore::open_in_memory().expect("store");
    let outcome = store
        .insert_referrals_batched(vec![record(1)], 10_000)
        .expect("batched");
    assert_eq!(outcome.batch_size, MAX_BATCH_SIZE);
    let err = store
        .insert_referrals_batched(vec![record(2)], 0)
        .expect_err("zero");
    assert_eq!(err.code, StoreErrorCode::Validation);
}
