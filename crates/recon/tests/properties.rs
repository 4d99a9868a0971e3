use proptest::prelude::*;

use tabmatch_recon::config::{DuplicatePolicy, MatchMode, MatchPolicy, OutputLayout};
use tabmatch_recon::matcher::match_records;
use tabmatch_recon::model::{Classification, LeftOutcome, MatchKeySpec, RecordSet, Value};
use tabmatch_recon::reconcile::reconcile;

fn key_set(name: &str, keys: &[String]) -> RecordSet {
    RecordSet::from_rows(
        name,
        &["id", "key"],
        keys.iter()
            .enumerate()
            .map(|(i, k)| vec![Value::Text(format!("{name}{i}")), Value::from(k.as_str())])
            .collect(),
    )
}

fn layout() -> OutputLayout {
    OutputLayout {
        classification_column: "Match_Type".into(),
        left_prefix: String::new(),
        right_prefix: "GITHUB_".into(),
    }
}

fn policy_strategy() -> impl Strategy<Value = MatchPolicy> {
    (
        prop_oneof![Just(MatchMode::OneToOne), Just(MatchMode::ManyToOne)],
        prop_oneof![Just(DuplicatePolicy::Skip), Just(DuplicatePolicy::Flag)],
    )
        .prop_map(|(mode, on_duplicate)| MatchPolicy { mode, on_duplicate })
}

proptest! {
    #[test]
    fn row_count_is_left_plus_unconsumed_right(
        left_keys in prop::collection::vec("[a-c]{0,1}", 0..12),
        right_keys in prop::collection::vec("[a-c]{0,1}", 0..12),
        policy in policy_strategy(),
    ) {
        let left = key_set("L", &left_keys);
        let right = key_set("R", &right_keys);
        let keys = MatchKeySpec::single("key", "key");
        let result = match_records(&left, &right, &keys, policy).unwrap();
        let merged = reconcile(&left, &right, &result, &layout()).unwrap();

        prop_assert_eq!(
            merged.rows.len(),
            left.len() + right.len() - result.consumed_count()
        );
        let left_rows = merged.rows.iter().filter(|r| r.left.is_some()).count();
        prop_assert_eq!(left_rows, left.len());
    }

    #[test]
    fn disjoint_sets_keep_every_record(
        left_keys in prop::collection::vec("[a-m]{1,3}", 0..10),
        right_keys in prop::collection::vec("[n-z]{1,3}", 0..10),
        policy in policy_strategy(),
    ) {
        let left = key_set("L", &left_keys);
        let right = key_set("R", &right_keys);
        let keys = MatchKeySpec::single("key", "key");
        let result = match_records(&left, &right, &keys, policy).unwrap();
        let merged = reconcile(&left, &right, &result, &layout()).unwrap();
        prop_assert_eq!(merged.rows.len(), left.len() + right.len());
    }

    #[test]
    fn one_to_one_never_reuses_a_right_record(
        left_keys in prop::collection::vec("[a-c]", 0..12),
        right_keys in prop::collection::vec("[a-c]", 0..12),
        on_duplicate in prop_oneof![Just(DuplicatePolicy::Skip), Just(DuplicatePolicy::Flag)],
    ) {
        let left = key_set("L", &left_keys);
        let right = key_set("R", &right_keys);
        let keys = MatchKeySpec::single("key", "key");
        let policy = MatchPolicy { mode: MatchMode::OneToOne, on_duplicate };
        let result = match_records(&left, &right, &keys, policy).unwrap();

        let mut used = vec![0usize; right.len()];
        for outcome in &result.outcomes {
            if let LeftOutcome::Matched { right, .. } = outcome {
                used[*right] += 1;
            }
        }
        prop_assert!(used.iter().all(|n| *n <= 1));
    }

    #[test]
    fn earliest_right_candidate_wins(
        left_key in "[a-c]",
        right_keys in prop::collection::vec("[a-c]", 1..12),
    ) {
        let left = key_set("L", &[left_key.clone()]);
        let right = key_set("R", &right_keys);
        let keys = MatchKeySpec::single("key", "key");
        let result = match_records(&left, &right, &keys, MatchPolicy::default()).unwrap();

        let expected = right_keys.iter().position(|k| *k == left_key);
        match (result.outcomes[0], expected) {
            (LeftOutcome::Matched { right, .. }, Some(first)) => prop_assert_eq!(right, first),
            (LeftOutcome::Unmatched, None) => {}
            (other, expected) => prop_assert!(false, "got {:?}, expected {:?}", other, expected),
        }
    }

    #[test]
    fn comparison_ignores_case_and_surrounding_space(
        word in "[a-z]{1,8}",
        pad_left in " {0,3}",
        pad_right in " {0,3}",
    ) {
        let left = key_set("L", &[word.clone()]);
        let right = key_set("R", &[format!("{pad_left}{}{pad_right}", word.to_uppercase())]);
        let keys = MatchKeySpec::single("key", "key");
        let result = match_records(&left, &right, &keys, MatchPolicy::default()).unwrap();
        prop_assert_eq!(result.outcomes[0].classification(), Classification::MatchedOnFirstKey);
    }

    #[test]
    fn reconcile_twice_is_identical(
        left_keys in prop::collection::vec("[a-d]{0,1}", 0..10),
        right_keys in prop::collection::vec("[a-d]{0,1}", 0..10),
        policy in policy_strategy(),
    ) {
        let left = key_set("L", &left_keys);
        let right = key_set("R", &right_keys);
        let keys = MatchKeySpec::single("key", "key");
        let first = match_records(&left, &right, &keys, policy).unwrap();
        let second = match_records(&left, &right, &keys, policy).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            reconcile(&left, &right, &first, &layout()).unwrap(),
            reconcile(&left, &right, &second, &layout()).unwrap()
        );
    }
}
