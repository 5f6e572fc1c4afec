//! Property tests: the block switcher never exposes more than one
//! open-response condition, and running it again changes nothing.

use presurvey_gate::guards::param_transform::{
    normalize_open_response, split_conditions, LEARNING_CONDITIONS, OPEN_RESPONSE_LCS,
    SHOW_OPEN_RESPONSE_QUESTIONS,
};
use presurvey_types::ExtraParams;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_condition() -> impl Strategy<Value = String> {
    "[a-z][a-z-]{0,11}"
}

/// A comma- or space-separated list of conditions, duplicates allowed.
fn arb_condition_list() -> impl Strategy<Value = (Vec<String>, String)> {
    (
        prop::collection::vec(arb_condition(), 1..8),
        prop_oneof![Just(","), Just(", "), Just(" ")],
    )
        .prop_map(|(items, sep)| {
            let joined = items.join(sep);
            (items, joined)
        })
}

fn arb_seed() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,24}"
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn narrows_to_one_original_candidate((items, raw) in arb_condition_list(), seed in arb_seed()) {
        let mut params: ExtraParams = [(OPEN_RESPONSE_LCS, raw.as_str())].into_iter().collect();
        normalize_open_response(&mut params, &seed);

        let chosen = params.get(OPEN_RESPONSE_LCS).unwrap().to_string();
        prop_assert_eq!(split_conditions(&chosen).len(), 1);
        prop_assert!(items.contains(&chosen));
    }

    #[test]
    fn legacy_flag_narrows_learning_conditions((items, raw) in arb_condition_list(), seed in arb_seed()) {
        let mut params: ExtraParams = [
            (SHOW_OPEN_RESPONSE_QUESTIONS, "true"),
            (LEARNING_CONDITIONS, raw.as_str()),
        ]
        .into_iter()
        .collect();
        normalize_open_response(&mut params, &seed);

        let chosen = params.get(OPEN_RESPONSE_LCS).unwrap().to_string();
        prop_assert!(items.contains(&chosen));
        prop_assert_eq!(params.get(LEARNING_CONDITIONS), Some(raw.as_str()));
    }

    #[test]
    fn second_pass_is_a_no_op(
        (_, raw) in arb_condition_list(),
        legacy in any::<bool>(),
        seed in arb_seed(),
    ) {
        let mut params = ExtraParams::new();
        if legacy {
            params.set(SHOW_OPEN_RESPONSE_QUESTIONS, "true");
            params.set(LEARNING_CONDITIONS, raw);
        } else {
            params.set(OPEN_RESPONSE_LCS, raw);
        }

        normalize_open_response(&mut params, &seed);
        let once = params.clone();
        let changed = normalize_open_response(&mut params, &seed);

        prop_assert!(!changed);
        prop_assert_eq!(params, once);
    }

    #[test]
    fn same_seed_same_choice((_, raw) in arb_condition_list(), seed in arb_seed()) {
        let mut a: ExtraParams = [(OPEN_RESPONSE_LCS, raw.as_str())].into_iter().collect();
        let mut b = a.clone();
        normalize_open_response(&mut a, &seed);
        normalize_open_response(&mut b, &seed);
        prop_assert_eq!(a, b);
    }
}
