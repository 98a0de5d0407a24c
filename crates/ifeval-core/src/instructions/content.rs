//! `detectable_content:` instructions.

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

use super::{
    sample_choice, sample_count, Args, Conflicts, Instruction, InstructionError, InstructionKind,
    ParamDefault, ParamSpec, ParamType,
};
use crate::types::Params;

lazy_static! {
    /// Square-bracket placeholder such as `[address]`.
    static ref PLACEHOLDER: Regex = Regex::new(r"\[.*?\]").unwrap();
}

const MAX_PLACEHOLDERS: usize = 4;
const POSTSCRIPT_MARKERS: &[&str] = &["P.S.", "P.P.S"];

const PLACEHOLDER_PARAMS: &[ParamSpec] =
    &[ParamSpec::required("num_placeholders", ParamType::Count)];

const POSTSCRIPT_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "postscript_marker",
    ParamType::Text,
    ParamDefault::Str("P.S."),
)];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "detectable_content:number_placeholders",
            PLACEHOLDER_PARAMS,
            Conflicts::With(&[]),
            Placeholders::build,
            Placeholders::sample,
        ),
        InstructionKind::new(
            "detectable_content:postscript",
            POSTSCRIPT_PARAMS,
            Conflicts::With(&[]),
            Postscript::build,
            Postscript::sample,
        ),
    ]
}

/// At least N square-bracket placeholders.
pub struct Placeholders {
    minimum: usize,
}

impl Placeholders {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            minimum: args.count("num_placeholders")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("num_placeholders", sample_count(rng, 1, MAX_PLACEHOLDERS))
    }
}

impl Instruction for Placeholders {
    fn describe(&self) -> String {
        format!(
            "The response must contain at least {} placeholders represented by square \
             brackets, such as [address].",
            self.minimum
        )
    }

    fn check(&self, response: &str) -> bool {
        PLACEHOLDER.find_iter(response).count() >= self.minimum
    }
}

/// A postscript introduced by a marker.
pub struct Postscript {
    marker: String,
    pattern: Regex,
}

impl Postscript {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        let marker = args.text("postscript_marker")?.to_string();
        let body = match marker.as_str() {
            "P.P.S" => r"p\.\s?p\.\s?s".to_string(),
            "P.S." => r"p\.\s?s\.".to_string(),
            other => regex::escape(&other.to_lowercase()),
        };
        let pattern = Regex::new(&format!(r"(?m)\s*{}.*$", body))
            .map_err(|e| args.reject("postscript_marker", e.to_string()))?;
        Ok(Box::new(Self { marker, pattern }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("postscript_marker", sample_choice(rng, POSTSCRIPT_MARKERS))
    }
}

impl Instruction for Postscript {
    fn describe(&self) -> String {
        format!(
            "At the end of your response, please explicitly add a postscript starting with {}",
            self.marker
        )
    }

    fn check(&self, response: &str) -> bool {
        self.pattern.is_match(&response.to_lowercase())
    }
}
