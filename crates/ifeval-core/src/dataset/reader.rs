//! JSON-lines reading and writing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::schema::validate_input_example;
use super::{DatasetError, InputExample, OutputRecord, ResponseRecord};
use crate::types::EvaluationResult;

/// Non-blank lines with their 1-based line numbers.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn read_file(path: &Path) -> Result<String, DatasetError> {
    fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse input examples from JSON-lines text.
///
/// With `validate_schema`, each record is checked against the embedded
/// schema before it is decoded.
pub fn parse_input_examples(
    text: &str,
    validate_schema: bool,
) -> Result<Vec<InputExample>, DatasetError> {
    let mut examples = Vec::new();
    for (line, raw) in numbered_lines(text) {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|source| DatasetError::Json { line, source })?;

        if validate_schema {
            validate_input_example(&value).map_err(|errors| DatasetError::Schema { line, errors })?;
        }

        let example: InputExample =
            serde_json::from_value(value).map_err(|source| DatasetError::Json { line, source })?;
        if example.kwargs.len() > example.instruction_id_list.len() {
            warn!(
                line,
                key = example.key,
                "more kwargs than instruction ids; extra kwargs are ignored"
            );
        }
        examples.push(example);
    }
    debug!(count = examples.len(), "parsed input examples");
    Ok(examples)
}

/// Read input examples from a JSON-lines file.
pub fn read_input_examples(
    path: impl AsRef<Path>,
    validate_schema: bool,
) -> Result<Vec<InputExample>, DatasetError> {
    parse_input_examples(&read_file(path.as_ref())?, validate_schema)
}

/// Parse responses from JSON-lines text into a prompt -> response map.
///
/// When a prompt appears more than once the last response wins.
pub fn parse_responses(text: &str) -> Result<HashMap<String, String>, DatasetError> {
    let mut responses = HashMap::new();
    for (line, raw) in numbered_lines(text) {
        let record: ResponseRecord =
            serde_json::from_str(raw).map_err(|source| DatasetError::Json { line, source })?;
        if responses.insert(record.prompt, record.response).is_some() {
            warn!(line, "duplicate prompt in responses; keeping the later one");
        }
    }
    Ok(responses)
}

/// Read responses from a JSON-lines file.
pub fn read_responses(path: impl AsRef<Path>) -> Result<HashMap<String, String>, DatasetError> {
    parse_responses(&read_file(path.as_ref())?)
}

/// Render results as JSON lines, one [`OutputRecord`] per result.
pub fn to_jsonl(results: &[EvaluationResult]) -> Result<String, DatasetError> {
    let mut out = String::new();
    for result in results {
        out.push_str(&serde_json::to_string(&OutputRecord::from(result))?);
        out.push('\n');
    }
    Ok(out)
}

/// Write results to a JSON-lines file, creating parent directories.
pub fn write_results(
    path: impl AsRef<Path>,
    results: &[EvaluationResult],
) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let io_error = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, to_jsonl(results)?).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstructionOutcome, InstructionStatus, Mode};

    const INPUT: &str = r#"
{"key": 1, "prompt": "Write a poem.", "instruction_id_list": ["punctuation:no_comma"], "kwargs": [{}]}

{"key": 2, "prompt": "Write an essay.", "instruction_id_list": ["length_constraints:number_words"], "kwargs": [{"num_words": 300, "relation": "at least", "keyword": null}]}
"#;

    #[test]
    fn test_parse_input_examples() {
        let examples = parse_input_examples(INPUT, true).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].key, 2);
        assert_eq!(examples[1].kwargs[0].len(), 2);
    }

    #[test]
    fn test_bad_json_reports_line() {
        let text = "{\"prompt\": \"p\", \"instruction_id_list\": []}\n{not json}";
        match parse_input_examples(text, false) {
            Err(DatasetError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_failure_reports_line() {
        let text = "{\"prompt\": 5, \"instruction_id_list\": []}";
        match parse_input_examples(text, true) {
            Err(DatasetError::Schema { line, errors }) => {
                assert_eq!(line, 1);
                assert!(!errors.is_empty());
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_responses() {
        let text = "{\"prompt\": \"a\", \"response\": \"x\"}\n{\"prompt\": \"b\", \"response\": \"y\"}";
        let responses = parse_responses(text).unwrap();
        assert_eq!(responses.get("a").map(String::as_str), Some("x"));
        assert_eq!(responses.len(), 2);
    }

    #[test]
    fn test_to_jsonl() {
        let results = vec![EvaluationResult {
            key: 1,
            prompt: "p".into(),
            response: "r".into(),
            mode: Mode::Strict,
            outcomes: vec![InstructionOutcome {
                instruction_id: "punctuation:no_comma".into(),
                status: InstructionStatus::Followed,
            }],
        }];
        let text = to_jsonl(&results).unwrap();
        assert_eq!(text.lines().count(), 1);
        let record: OutputRecord = serde_json::from_str(text.trim()).unwrap();
        assert!(record.follow_all_instructions);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_responses("/nonexistent/responses.jsonl").unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
