//! Core types shared by the registry, the evaluator and the dataset layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::instructions::InstructionError;

/// Identifier of an instruction kind, of the form `"<category>:<name>"`.
pub type InstructionId = String;

/// Category part of an instruction id (`"keywords"` for `"keywords:existence"`).
pub fn category_of(instruction_id: &str) -> &str {
    instruction_id
        .split_once(':')
        .map(|(category, _)| category)
        .unwrap_or(instruction_id)
}

/// A single instruction parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "number",
            ParamValue::Str(_) => "string",
            ParamValue::List(_) => "list",
        }
    }

    /// Integer view; integral floats (`3.0`) are accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        ParamValue::List(value.into_iter().map(String::from).collect())
    }
}

/// Parameter mapping (name -> value) for one instruction.
///
/// `null` values in serialized input are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<ParamValue>>",
    into = "BTreeMap<String, ParamValue>"
)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Option<ParamValue>>> for Params {
    fn from(raw: BTreeMap<String, Option<ParamValue>>) -> Self {
        Params(
            raw.into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
        )
    }
}

impl From<Params> for BTreeMap<String, ParamValue> {
    fn from(params: Params) -> Self {
        params.0
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Evaluation strictness mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Checker runs on the response exactly as given.
    Strict,
    /// Checker runs on a fixed set of response transforms; any success counts.
    Loose,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::Loose => "loose",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One required constraint of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionSpec {
    pub id: InstructionId,
    #[serde(default)]
    pub params: Params,
}

impl InstructionSpec {
    pub fn new(id: impl Into<String>, params: Params) -> Self {
        Self {
            id: id.into(),
            params,
        }
    }
}

/// A prompt, its required constraints, and the candidate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationExample {
    /// Prompt identifier
    #[serde(default)]
    pub key: i64,

    /// Prompt text
    pub prompt: String,

    /// Required constraints, in presentation order
    pub instructions: Vec<InstructionSpec>,

    /// Candidate response
    pub response: String,
}

impl EvaluationExample {
    pub fn new(key: i64, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            key,
            prompt: prompt.into(),
            instructions: Vec::new(),
            response: response.into(),
        }
    }

    /// Append a constraint (builder style).
    pub fn with_instruction(mut self, id: impl Into<String>, params: Params) -> Self {
        self.instructions.push(InstructionSpec::new(id, params));
        self
    }
}

/// Result of checking one instruction slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstructionStatus {
    Followed,
    NotFollowed,
    /// The instruction could not be evaluated (unknown id, bad parameters)
    Error { error: InstructionError },
}

impl InstructionStatus {
    pub fn from_bool(followed: bool) -> Self {
        if followed {
            InstructionStatus::Followed
        } else {
            InstructionStatus::NotFollowed
        }
    }

    pub fn is_followed(&self) -> bool {
        matches!(self, InstructionStatus::Followed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, InstructionStatus::Error { .. })
    }
}

/// Outcome for one slot of an example's instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub instruction_id: InstructionId,
    #[serde(flatten)]
    pub status: InstructionStatus,
}

/// Per-example evaluation result under one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub key: i64,
    pub prompt: String,
    pub response: String,
    pub mode: Mode,

    /// One outcome per input instruction, in input order
    pub outcomes: Vec<InstructionOutcome>,
}

impl EvaluationResult {
    /// Result for an example that never reached the checkers, such as one
    /// whose response could not be fetched. Every slot carries `reason`.
    pub fn not_evaluated(example: &EvaluationExample, mode: Mode, reason: &str) -> Self {
        EvaluationResult {
            key: example.key,
            prompt: example.prompt.clone(),
            response: example.response.clone(),
            mode,
            outcomes: example
                .instructions
                .iter()
                .map(|spec| InstructionOutcome {
                    instruction_id: spec.id.clone(),
                    status: InstructionStatus::Error {
                        error: InstructionError::NotEvaluated(reason.to_string()),
                    },
                })
                .collect(),
        }
    }

    /// True iff every slot was followed. Error slots count as not followed.
    pub fn follow_all_instructions(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_followed())
    }

    /// False when any slot could not be evaluated.
    pub fn is_scorable(&self) -> bool {
        !self.outcomes.iter().any(|o| o.status.is_error())
    }

    /// Boolean per slot; error slots map to `false`.
    pub fn follow_instruction_list(&self) -> Vec<bool> {
        self.outcomes.iter().map(|o| o.status.is_followed()).collect()
    }

    pub fn instruction_id_list(&self) -> Vec<InstructionId> {
        self.outcomes.iter().map(|o| o.instruction_id.clone()).collect()
    }

    /// Errors keyed by slot index.
    pub fn errors(&self) -> BTreeMap<usize, String> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| match &outcome.status {
                InstructionStatus::Error { error } => Some((index, error.to_string())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_of() {
        assert_eq!(category_of("keywords:existence"), "keywords");
        assert_eq!(category_of("no_category"), "no_category");
    }

    #[test]
    fn test_params_drop_nulls() {
        let params: Params =
            serde_json::from_str(r#"{"num_words": 300, "relation": null}"#).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("num_words"), Some(&ParamValue::Int(300)));
    }

    #[test]
    fn test_param_value_untagged() {
        let params: Params = serde_json::from_str(
            r#"{"a": true, "b": 2, "c": 2.0, "d": "x", "e": ["y", "z"]}"#,
        )
        .unwrap();
        assert_eq!(params.get("a"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.get("c").and_then(ParamValue::as_int), Some(2));
        assert_eq!(params.get("d").and_then(ParamValue::as_str), Some("x"));
        assert_eq!(params.get("e").and_then(ParamValue::as_list).map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_result_flags() {
        let result = EvaluationResult {
            key: 1,
            prompt: "p".into(),
            response: "r".into(),
            mode: Mode::Strict,
            outcomes: vec![
                InstructionOutcome {
                    instruction_id: "a:b".into(),
                    status: InstructionStatus::Followed,
                },
                InstructionOutcome {
                    instruction_id: "c:d".into(),
                    status: InstructionStatus::Error {
                        error: InstructionError::UnknownInstructionId("c:d".into()),
                    },
                },
            ],
        };

        assert!(!result.follow_all_instructions());
        assert!(!result.is_scorable());
        assert_eq!(result.follow_instruction_list(), vec![true, false]);
        assert_eq!(result.errors().len(), 1);
    }

    #[test]
    fn test_not_evaluated_marks_every_slot() {
        let example = EvaluationExample::new(4, "p", "")
            .with_instruction("punctuation:no_comma", Params::new())
            .with_instruction("keywords:existence", Params::new());
        let result = EvaluationResult::not_evaluated(&example, Mode::Loose, "source offline");

        assert_eq!(result.key, 4);
        assert_eq!(result.mode, Mode::Loose);
        assert_eq!(result.outcomes.len(), 2);
        assert!(!result.is_scorable());
        assert_eq!(
            result.errors().get(&1).map(String::as_str),
            Some("Not evaluated: source offline")
        );
    }
}
