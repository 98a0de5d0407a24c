//! JSON Schema validation for input example records.
//!
//! Records are validated against `schema/input_example.schema.json`, which
//! is embedded at compile time and compiled once.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded input example schema.
const INPUT_EXAMPLE_SCHEMA_JSON: &str = include_str!("../../schema/input_example.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(INPUT_EXAMPLE_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;
        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate one input record.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_input_example(record: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(record)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_record_passes() {
        let record = json!({
            "key": 1000,
            "prompt": "Write a 300+ word summary.",
            "instruction_id_list": ["punctuation:no_comma", "length_constraints:number_words"],
            "kwargs": [{}, {"relation": "at least", "num_words": 300, "unused": null}]
        });
        assert!(validate_input_example(&record).is_ok());
    }

    #[test]
    fn test_missing_prompt_fails() {
        let record = json!({ "instruction_id_list": [] });
        assert!(validate_input_example(&record).is_err());
    }

    #[test]
    fn test_malformed_id_fails() {
        let record = json!({
            "prompt": "p",
            "instruction_id_list": ["NoCategory"]
        });
        let errors = validate_input_example(&record).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_kwargs_must_be_objects() {
        let record = json!({
            "prompt": "p",
            "instruction_id_list": ["punctuation:no_comma"],
            "kwargs": ["not an object"]
        });
        assert!(validate_input_example(&record).is_err());
    }

    #[test]
    fn test_extra_fields_allowed() {
        let record = json!({
            "prompt": "p",
            "instruction_id_list": [],
            "source": "ja-ifeval"
        });
        assert!(validate_input_example(&record).is_ok());
    }
}
