use ifeval_core::{
    EvaluationExample, Evaluator, InstructionError, InstructionRegistry, InstructionStatus, Mode,
    Params, Report,
};

fn followed(registry: &InstructionRegistry, id: &str, params: Params, response: &str) -> bool {
    let example = EvaluationExample::new(1, "prompt", response).with_instruction(id, params);
    Evaluator::new(registry)
        .evaluate(&example, Mode::Strict)
        .follow_all_instructions()
}

#[test]
fn sentence_count_minimum() {
    let registry = InstructionRegistry::builtin();
    let params = Params::new()
        .with("num_sentences", 3)
        .with("relation", "at least");
    assert!(followed(
        &registry,
        "length_constraints:number_sentences",
        params,
        "Hello. World. Foo."
    ));
}

#[test]
fn uppercase_response() {
    let registry = InstructionRegistry::builtin();
    assert!(!followed(
        &registry,
        "change_case:english_capital",
        Params::new(),
        "hello world"
    ));
    assert!(followed(
        &registry,
        "change_case:english_capital",
        Params::new(),
        "HELLO WORLD"
    ));
}

#[test]
fn two_responses_separated_by_asterisks() {
    let registry = InstructionRegistry::builtin();
    let with_marker = "The first answer is short.\n******\nThe second answer differs.";
    let without_marker = "The first answer is short.\n\nThe second answer differs.";
    assert!(followed(
        &registry,
        "combination:two_responses",
        Params::new(),
        with_marker
    ));
    assert!(!followed(
        &registry,
        "combination:two_responses",
        Params::new(),
        without_marker
    ));
}

#[test]
fn too_few_placeholders() {
    let registry = InstructionRegistry::builtin();
    assert!(!followed(
        &registry,
        "detectable_content:number_placeholders",
        Params::new().with("num_placeholders", 3),
        "My [name] is from [city]."
    ));
}

#[test]
fn malformed_json_is_a_failure_not_an_error() {
    let registry = InstructionRegistry::builtin();
    let example = EvaluationExample::new(1, "prompt", "{\"a\": [1, 2,}")
        .with_instruction("detectable_format:json_format", Params::new());
    let result = Evaluator::new(&registry).evaluate(&example, Mode::Strict);

    assert_eq!(result.outcomes[0].status, InstructionStatus::NotFollowed);
    assert!(result.is_scorable());
}

#[test]
fn unknown_id_marks_only_its_slot() {
    let registry = InstructionRegistry::builtin();
    let example = EvaluationExample::new(1, "prompt", "HELLO THERE")
        .with_instruction("change_case:english_capital", Params::new())
        .with_instruction("no_such:instruction", Params::new())
        .with_instruction("punctuation:no_comma", Params::new());

    let results = Evaluator::new(&registry).evaluate_all_modes(&example);
    for result in [&results.strict, &results.loose] {
        assert_eq!(result.outcomes.len(), 3);
        assert!(result.outcomes[0].status.is_followed());
        assert_eq!(
            result.outcomes[1].status,
            InstructionStatus::Error {
                error: InstructionError::UnknownInstructionId("no_such:instruction".to_string())
            }
        );
        assert!(result.outcomes[2].status.is_followed());
        assert!(!result.is_scorable());
    }

    let report = Report::from_results(&[results.strict]);
    assert_eq!(report.unscorable_prompts, 1);
    assert_eq!(report.instruction_level.total, 2);
}

#[test]
fn empty_response_policy() {
    let registry = InstructionRegistry::builtin();
    assert!(!followed(
        &registry,
        "length_constraints:number_words",
        Params::new().with("num_words", 1),
        "   "
    ));
    assert!(followed(
        &registry,
        "keywords:forbidden_words",
        Params::new().with("forbidden_words", vec!["cat"]),
        ""
    ));
}
