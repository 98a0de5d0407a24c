use ifeval_core::evaluator::check;
use ifeval_core::metrics::count_words;
use ifeval_core::{InstructionRegistry, Mode, Params};
use proptest::prelude::*;

const CAT_TOKENS: &[&str] = &["cat", "Cat", "CAT.", "category", "bobcat", "dog", "concatenate"];

fn text_with_noise() -> impl Strategy<Value = String> {
    "[a-zA-Z ,.!?*\"\n]{0,120}"
}

proptest! {
    #[test]
    fn word_count_boundary(words in prop::collection::vec("[a-z]{1,8}", 0..40), threshold in 1usize..40) {
        let registry = InstructionRegistry::builtin();
        let bound = registry
            .bind("length_constraints:number_words", &Params::new().with("num_words", threshold))
            .unwrap();
        let response = words.join(" ");

        prop_assert_eq!(count_words(&response), words.len());
        prop_assert_eq!(bound.check(&response), words.len() >= threshold);
    }

    #[test]
    fn forbidden_word_is_whole_word(picks in prop::collection::vec(0usize..7, 0..12)) {
        let registry = InstructionRegistry::builtin();
        let bound = registry
            .bind("keywords:forbidden_words", &Params::new().with("forbidden_words", vec!["cat"]))
            .unwrap();
        let tokens: Vec<&str> = picks.iter().map(|&i| CAT_TOKENS[i]).collect();
        let response = tokens.join(" ");

        let contains_cat = picks.iter().any(|&i| i < 3);
        prop_assert_eq!(bound.check(&response), !contains_cat);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn checkers_are_deterministic(response in ".{0,200}", seed in 0u64..4) {
        let registry = InstructionRegistry::builtin();
        for kind in registry.kinds() {
            let bound = kind.bind(&kind.sample_params_seeded(seed)).unwrap();
            prop_assert_eq!(bound.check(&response), bound.check(&response));
            prop_assert_eq!(bound.describe(), bound.describe());
        }
    }

    #[test]
    fn loose_accepts_whatever_strict_accepts(response in text_with_noise(), seed in 0u64..4) {
        let registry = InstructionRegistry::builtin();
        for kind in registry.kinds() {
            let bound = kind.bind(&kind.sample_params_seeded(seed)).unwrap();
            if check(&bound, &response, Mode::Strict) {
                prop_assert!(check(&bound, &response, Mode::Loose), "{} rejected in loose mode", kind.id());
            }
        }
    }
}
