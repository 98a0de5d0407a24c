//! Instruction kinds.
//!
//! Each kind owns a parameter contract, a description builder and a
//! checker. Kinds are grouped by category, one module per category:
//!
//! | Module | Category prefix |
//! |--------|-----------------|
//! | `keywords` | `keywords:` |
//! | `language` | `language:` |
//! | `length` | `length_constraints:` |
//! | `content` | `detectable_content:` |
//! | `format` | `detectable_format:` |
//! | `combination` | `combination:` |
//! | `startend` | `startend:` |
//! | `case` | `change_case:` |
//! | `punctuation` | `punctuation:` |
//!
//! The catalogue is closed: `builtin_kinds()` lists every supported id.

mod case;
mod combination;
mod content;
mod format;
mod keywords;
mod language;
mod length;
mod punctuation;
mod startend;

pub use combination::{PROMPT_TO_REPEAT, RESPONSE_SEPARATOR};
pub use format::CONSTRAINED_RESPONSE_OPTIONS;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

use crate::langid;
use crate::types::{ParamValue, Params};

/// Errors raised while resolving or binding an instruction.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InstructionError {
    #[error("Unknown instruction id: {0}")]
    UnknownInstructionId(String),

    #[error("{instruction}: unknown parameter '{parameter}'")]
    UnknownParameter {
        instruction: String,
        parameter: String,
    },

    #[error("{instruction}: missing required parameter '{parameter}'")]
    MissingParameter {
        instruction: String,
        parameter: String,
    },

    #[error("{instruction}: invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        instruction: String,
        parameter: String,
        reason: String,
    },

    #[error("Not evaluated: {0}")]
    NotEvaluated(String),
}

/// A bound instruction's two capabilities.
pub trait Instruction: Send + Sync {
    /// Human-readable constraint sentence with parameters interpolated.
    fn describe(&self) -> String;

    /// Whether `response` satisfies the constraint.
    fn check(&self, response: &str) -> bool;

    /// Whether loose mode may drop the first or last line of the response
    /// before checking. Constraints on how the response ends opt out.
    fn allows_line_removal(&self) -> bool {
        true
    }
}

// =========================================================================
// PARAMETER CONTRACT
// =========================================================================

/// Comparison relation for count-based instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessThan,
    AtMost,
    AtLeast,
    Exactly,
}

/// Legal values of a relation parameter.
pub const RELATION_CHOICES: &[&str] = &["less than", "at most", "at least", "exactly"];

impl Relation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "less than" => Some(Relation::LessThan),
            "at most" => Some(Relation::AtMost),
            "at least" => Some(Relation::AtLeast),
            "exactly" => Some(Relation::Exactly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::LessThan => "less than",
            Relation::AtMost => "at most",
            Relation::AtLeast => "at least",
            Relation::Exactly => "exactly",
        }
    }

    /// Compare an observed count against the threshold.
    pub fn holds(&self, actual: usize, threshold: usize) -> bool {
        match self {
            Relation::LessThan => actual < threshold,
            Relation::AtMost => actual <= threshold,
            Relation::AtLeast => actual >= threshold,
            Relation::Exactly => actual == threshold,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type and legal range of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "choices", rename_all = "snake_case")]
pub enum ParamType {
    /// Integer >= 0
    Count,
    /// Integer >= 1
    Positive,
    /// Non-empty string (trimmed)
    Text,
    /// One of the listed strings
    Choice(&'static [&'static str]),
    /// Non-empty list of non-empty strings
    Keywords,
    /// A single ASCII letter
    Letter,
    /// Supported ISO 639-1 language code
    Language,
    /// Boolean
    Flag,
}

impl ParamType {
    /// Check `value` against this type, returning the normalized value.
    fn validate(&self, value: &ParamValue) -> Result<ParamValue, String> {
        match self {
            ParamType::Count | ParamType::Positive => {
                let min = if *self == ParamType::Count { 0 } else { 1 };
                match value.as_int() {
                    Some(n) if n >= min => Ok(ParamValue::Int(n)),
                    Some(n) => Err(format!("expected an integer >= {}, got {}", min, n)),
                    None => Err(format!("expected an integer, got {}", value.type_name())),
                }
            }
            ParamType::Text => match value.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => Ok(ParamValue::Str(s.to_string())),
                Some(_) => Err("expected a non-empty string".to_string()),
                None => Err(format!("expected a string, got {}", value.type_name())),
            },
            ParamType::Choice(choices) => match value.as_str() {
                Some(s) if choices.contains(&s) => Ok(ParamValue::Str(s.to_string())),
                Some(s) => Err(format!("'{}' is not one of {:?}", s, choices)),
                None => Err(format!("expected a string, got {}", value.type_name())),
            },
            ParamType::Keywords => {
                let items: Vec<String> = match value {
                    ParamValue::Str(s) => vec![s.clone()],
                    ParamValue::List(items) => items.clone(),
                    other => {
                        return Err(format!("expected a list of strings, got {}", other.type_name()))
                    }
                };
                let items: Vec<String> = items.iter().map(|s| s.trim().to_string()).collect();
                if items.is_empty() || items.iter().any(String::is_empty) {
                    Err("expected a non-empty list of non-empty strings".to_string())
                } else {
                    Ok(ParamValue::List(items))
                }
            }
            ParamType::Letter => match value.as_str().map(str::trim) {
                Some(s) if s.chars().count() == 1 && s.chars().all(|c| c.is_ascii_alphabetic()) => {
                    Ok(ParamValue::Str(s.to_string()))
                }
                Some(s) => Err(format!("expected a single ASCII letter, got '{}'", s)),
                None => Err(format!("expected a string, got {}", value.type_name())),
            },
            ParamType::Language => match value.as_str() {
                Some(code) if langid::is_supported(code) => Ok(ParamValue::Str(code.to_string())),
                Some(code) => Err(format!("unsupported language code '{}'", code)),
                None => Err(format!("expected a string, got {}", value.type_name())),
            },
            ParamType::Flag => match value.as_bool() {
                Some(b) => Ok(ParamValue::Bool(b)),
                None => Err(format!("expected a boolean, got {}", value.type_name())),
            },
        }
    }
}

/// Statically declared default of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    Int(i64),
    Str(&'static str),
    Bool(bool),
}

impl ParamDefault {
    fn to_value(self) -> ParamValue {
        match self {
            ParamDefault::Int(v) => ParamValue::Int(v),
            ParamDefault::Str(s) => ParamValue::Str(s.to_string()),
            ParamDefault::Bool(b) => ParamValue::Bool(b),
        }
    }
}

/// A recognized parameter of an instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub default: Option<ParamDefault>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, ty: ParamType, default: ParamDefault) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Count => f.write_str("integer >= 0"),
            ParamType::Positive => f.write_str("integer >= 1"),
            ParamType::Text => f.write_str("text"),
            ParamType::Choice(choices) => write!(f, "one of {}", choices.join(" | ")),
            ParamType::Keywords => f.write_str("list of words"),
            ParamType::Letter => f.write_str("letter"),
            ParamType::Language => f.write_str("language code"),
            ParamType::Flag => f.write_str("boolean"),
        }
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        match self.default {
            None => f.write_str(" (required)"),
            Some(ParamDefault::Int(v)) => write!(f, " (default {})", v),
            Some(ParamDefault::Str(s)) => write!(f, " (default \"{}\")", s),
            Some(ParamDefault::Bool(b)) => write!(f, " (default {})", b),
        }
    }
}

/// Relation parameter defaulting to "at least".
const fn relation_param(name: &'static str) -> ParamSpec {
    ParamSpec::optional(
        name,
        ParamType::Choice(RELATION_CHOICES),
        ParamDefault::Str("at least"),
    )
}

/// Ids an instruction kind cannot be combined with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conflicts {
    /// Conflicts with the listed ids (and itself)
    With(&'static [&'static str]),
    /// Conflicts with every id except the listed ones
    AllExcept(&'static [&'static str]),
}

impl Conflicts {
    fn declares(&self, own_id: &str, other: &str) -> bool {
        if own_id == other {
            return true;
        }
        match self {
            Conflicts::With(ids) => ids.contains(&other),
            Conflicts::AllExcept(ids) => !ids.contains(&other),
        }
    }
}

// =========================================================================
// KIND + BINDING
// =========================================================================

type BuildFn = fn(&Args<'_>) -> Result<Box<dyn Instruction>, InstructionError>;
type SampleFn = fn(&mut dyn RngCore) -> Params;

/// Registry entry: the static definition of one instruction kind.
pub struct InstructionKind {
    id: &'static str,
    params: &'static [ParamSpec],
    conflicts: Conflicts,
    build: BuildFn,
    sample: SampleFn,
}

impl InstructionKind {
    pub const fn new(
        id: &'static str,
        params: &'static [ParamSpec],
        conflicts: Conflicts,
        build: BuildFn,
        sample: SampleFn,
    ) -> Self {
        Self {
            id,
            params,
            conflicts,
            build,
            sample,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn category(&self) -> &'static str {
        self.id.split_once(':').map(|(c, _)| c).unwrap_or(self.id)
    }

    /// Recognized parameters, with types and defaults.
    pub fn params(&self) -> &'static [ParamSpec] {
        self.params
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Whether this kind declares a conflict with `other` (one direction only).
    pub fn declares_conflict_with(&self, other: &str) -> bool {
        self.conflicts.declares(self.id, other)
    }

    /// Validate `supplied` against the parameter contract and build the
    /// bound instruction.
    pub fn bind(&self, supplied: &Params) -> Result<BoundInstruction, InstructionError> {
        if let Some(unknown) = supplied.keys().find(|key| !self.accepts(key)) {
            return Err(InstructionError::UnknownParameter {
                instruction: self.id.to_string(),
                parameter: unknown.to_string(),
            });
        }

        let mut resolved = Params::new();
        for spec in self.params {
            let value = match (supplied.get(spec.name), spec.default) {
                (Some(value), _) => spec.ty.validate(value).map_err(|reason| {
                    InstructionError::InvalidParameter {
                        instruction: self.id.to_string(),
                        parameter: spec.name.to_string(),
                        reason,
                    }
                })?,
                (None, Some(default)) => default.to_value(),
                (None, None) => {
                    return Err(InstructionError::MissingParameter {
                        instruction: self.id.to_string(),
                        parameter: spec.name.to_string(),
                    })
                }
            };
            resolved.insert(spec.name, value);
        }

        let inner = (self.build)(&Args {
            instruction: self.id,
            params: &resolved,
        })?;

        Ok(BoundInstruction {
            id: self.id,
            params: resolved,
            inner,
        })
    }

    /// Draw a legal parameter set.
    pub fn sample_params(&self, rng: &mut dyn RngCore) -> Params {
        (self.sample)(rng)
    }

    /// Draw a legal parameter set from a seeded generator.
    pub fn sample_params_seeded(&self, seed: u64) -> Params {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample_params(&mut rng)
    }
}

impl fmt::Debug for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionKind")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish()
    }
}

/// An instruction kind paired with validated, default-filled parameters.
pub struct BoundInstruction {
    id: &'static str,
    params: Params,
    inner: Box<dyn Instruction>,
}

impl BoundInstruction {
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Resolved parameters, defaults included.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn describe(&self) -> String {
        self.inner.describe()
    }

    pub fn allows_line_removal(&self) -> bool {
        self.inner.allows_line_removal()
    }

    /// Run the checker. A panic inside the checker is logged and reported
    /// as "not followed".
    pub fn check(&self, response: &str) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.inner.check(response))) {
            Ok(followed) => followed,
            Err(_) => {
                tracing::error!(
                    instruction = self.id,
                    response_len = response.len(),
                    "checker panicked; treating instruction as not followed"
                );
                false
            }
        }
    }
}

impl fmt::Debug for BoundInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInstruction")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish()
    }
}

/// Typed access to resolved parameters inside a kind's build function.
pub struct Args<'a> {
    instruction: &'static str,
    params: &'a Params,
}

impl<'a> Args<'a> {
    fn get(&self, name: &str) -> Result<&'a ParamValue, InstructionError> {
        self.params
            .get(name)
            .ok_or_else(|| InstructionError::MissingParameter {
                instruction: self.instruction.to_string(),
                parameter: name.to_string(),
            })
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> InstructionError {
        InstructionError::InvalidParameter {
            instruction: self.instruction.to_string(),
            parameter: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn count(&self, name: &str) -> Result<usize, InstructionError> {
        let value = self.get(name)?;
        value
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.invalid(name, "expected a non-negative integer"))
    }

    pub fn text(&self, name: &str) -> Result<&'a str, InstructionError> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| self.invalid(name, "expected a string"))
    }

    pub fn list(&self, name: &str) -> Result<&'a [String], InstructionError> {
        let value = self.get(name)?;
        value
            .as_list()
            .ok_or_else(|| self.invalid(name, "expected a list of strings"))
    }

    pub fn flag(&self, name: &str) -> Result<bool, InstructionError> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| self.invalid(name, "expected a boolean"))
    }

    pub fn relation(&self, name: &str) -> Result<Relation, InstructionError> {
        let value = self.text(name)?;
        Relation::parse(value).ok_or_else(|| self.invalid(name, format!("unknown relation '{}'", value)))
    }

    /// Report a cross-parameter constraint violation.
    pub fn reject(&self, name: &str, reason: impl Into<String>) -> InstructionError {
        self.invalid(name, reason)
    }
}

// =========================================================================
// SAMPLING HELPERS
// =========================================================================

/// Vocabulary for sampled keyword parameters.
const WORD_LIST: &[&str] = &[
    "adventure", "balance", "bridge", "candle", "canvas", "captain", "castle", "climate",
    "compass", "courage", "crystal", "culture", "desert", "diamond", "dragon", "engine",
    "festival", "forest", "garden", "harbor", "harvest", "history", "horizon", "island",
    "journey", "kingdom", "ladder", "lantern", "library", "market", "meadow", "melody",
    "mirror", "mountain", "museum", "network", "ocean", "orchestra", "palace", "planet",
    "puzzle", "rainbow", "river", "rocket", "science", "season", "shadow", "signal",
    "silver", "station", "story", "summer", "thunder", "treasure", "valley", "village",
    "voyage", "whisper", "window", "winter",
];

fn sample_keywords(rng: &mut dyn RngCore, n: usize) -> Vec<String> {
    let mut words: Vec<String> = WORD_LIST
        .choose_multiple(rng, n)
        .map(|w| w.to_string())
        .collect();
    words.sort();
    words
}

fn sample_choice(rng: &mut dyn RngCore, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

fn sample_relation(rng: &mut dyn RngCore) -> &'static str {
    if rng.gen_bool(0.5) {
        "less than"
    } else {
        "at least"
    }
}

fn sample_count(rng: &mut dyn RngCore, low: usize, high: usize) -> usize {
    rng.gen_range(low..=high)
}

/// Render a keyword list for a description sentence.
fn render_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every built-in instruction kind.
pub fn builtin_kinds() -> Vec<InstructionKind> {
    let mut kinds = Vec::new();
    kinds.extend(keywords::kinds());
    kinds.extend(language::kinds());
    kinds.extend(length::kinds());
    kinds.extend(content::kinds());
    kinds.extend(format::kinds());
    kinds.extend(combination::kinds());
    kinds.extend(startend::kinds());
    kinds.extend(case::kinds());
    kinds.extend(punctuation::kinds());
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(id: &str) -> InstructionKind {
        builtin_kinds()
            .into_iter()
            .find(|k| k.id() == id)
            .unwrap()
    }

    #[test]
    fn test_relation_holds() {
        assert!(Relation::LessThan.holds(2, 3));
        assert!(!Relation::LessThan.holds(3, 3));
        assert!(Relation::AtMost.holds(3, 3));
        assert!(Relation::AtLeast.holds(3, 3));
        assert!(!Relation::AtLeast.holds(2, 3));
        assert!(Relation::Exactly.holds(3, 3));
        assert!(Relation::parse("more than").is_none());
    }

    #[test]
    fn test_param_spec_display() {
        let params = kind("length_constraints:number_words").params();
        assert_eq!(params[0].to_string(), "num_words: integer >= 0 (required)");
        assert_eq!(
            params[1].to_string(),
            "relation: one of less than | at most | at least | exactly (default \"at least\")"
        );
    }

    #[test]
    fn test_bind_fills_defaults() {
        let bound = kind("length_constraints:number_words")
            .bind(&Params::new().with("num_words", 10))
            .unwrap();
        assert_eq!(
            bound.params().get("relation"),
            Some(&ParamValue::Str("at least".to_string()))
        );
    }

    #[test]
    fn test_bind_rejects_unknown_parameter() {
        let err = kind("length_constraints:number_words")
            .bind(&Params::new().with("num_words", 10).with("colour", "red"))
            .unwrap_err();
        assert!(matches!(err, InstructionError::UnknownParameter { ref parameter, .. } if parameter == "colour"));
    }

    #[test]
    fn test_bind_rejects_missing_parameter() {
        let err = kind("length_constraints:number_words")
            .bind(&Params::new())
            .unwrap_err();
        assert!(matches!(err, InstructionError::MissingParameter { .. }));
    }

    #[test]
    fn test_bind_rejects_out_of_range() {
        let err = kind("length_constraints:number_words")
            .bind(&Params::new().with("num_words", -1))
            .unwrap_err();
        assert!(matches!(err, InstructionError::InvalidParameter { .. }));

        let err = kind("length_constraints:number_words")
            .bind(&Params::new().with("num_words", 5).with("relation", "about"))
            .unwrap_err();
        assert!(matches!(err, InstructionError::InvalidParameter { .. }));
    }

    #[test]
    fn test_keywords_accepts_single_string() {
        let bound = kind("keywords:existence")
            .bind(&Params::new().with("keywords", "ocean"))
            .unwrap();
        assert!(bound.check("The ocean is deep."));
    }

    #[test]
    fn test_every_kind_samples_bindable_params() {
        for kind in builtin_kinds() {
            for seed in 0..5 {
                let params = kind.sample_params_seeded(seed);
                let bound = kind
                    .bind(&params)
                    .unwrap_or_else(|e| panic!("{} failed to bind sample: {}", kind.id(), e));
                assert!(!bound.describe().is_empty());
            }
        }
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let kind = kind("keywords:frequency");
        assert_eq!(kind.sample_params_seeded(7), kind.sample_params_seeded(7));
    }

    #[test]
    fn test_check_is_deterministic() {
        let bound = kind("length_constraints:number_sentences")
            .bind(&Params::new().with("num_sentences", 2))
            .unwrap();
        let response = "One. Two. Three.";
        assert_eq!(bound.check(response), bound.check(response));
    }

    struct Exploding;

    impl Instruction for Exploding {
        fn describe(&self) -> String {
            "explodes".to_string()
        }

        fn check(&self, _response: &str) -> bool {
            panic!("pathological input")
        }
    }

    #[test]
    fn test_checker_panic_is_not_followed() {
        let bound = BoundInstruction {
            id: "test:exploding",
            params: Params::new(),
            inner: Box::new(Exploding),
        };
        assert!(!bound.check("anything"));
    }
}
