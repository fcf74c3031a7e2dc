use proptest::prelude::*;
use referral_desk_ingest::{lookup_column, normalize_header};

proptest! {
    #[test]
    fn normalisation_is_idempotent(raw in "[ -~]{0,40}") {
        let once = normalize_header(&raw);
        prop_assert_eq!(normalize_header(&once), once.clone());
        prop_assert!(once.chars().all(char::is_alphanumeric));
    }

    #[test]
    fn punctuation_and_case_do_not_change_lookup(sep in "[ _./-]{0,3}", upper in any::<bool>()) {
        let raw = format!("first{sep}name");
        let raw = if upper { raw.to_uppercase() } else { raw };
        prop_assert_eq!(lookup_column(&raw), lookup_column("First Name"));
    }
}
