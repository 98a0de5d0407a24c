//! `detectable_format:` instructions: bullets, highlights, sections, JSON
//! and titles.

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

use super::{
    sample_choice, sample_count, Args, Conflicts, Instruction, InstructionError, InstructionKind,
    ParamDefault, ParamSpec, ParamType,
};
use crate::types::Params;

lazy_static! {
    // =========================================================================
    // MARKDOWN PATTERNS
    // =========================================================================

    static ref STAR_BULLET: Regex = Regex::new(r"(?m)^\s*\*[^*].*$").unwrap();
    static ref DASH_BULLET: Regex = Regex::new(r"(?m)^\s*-.*$").unwrap();

    static ref HIGHLIGHT: Regex = Regex::new(r"\*[^\n*]*\*").unwrap();
    static ref DOUBLE_HIGHLIGHT: Regex = Regex::new(r"\*\*[^\n*]*\*\*").unwrap();

    static ref TITLE: Regex = Regex::new(r"<<[^\n]+>>").unwrap();
}

const MAX_BULLETS: usize = 5;
const MAX_HIGHLIGHTS: usize = 4;
const MAX_SECTIONS: usize = 5;
const SECTION_SPLITTERS: &[&str] = &["Section", "SECTION"];

/// Accepted answers for a constrained response.
pub const CONSTRAINED_RESPONSE_OPTIONS: &[&str] =
    &["My answer is yes.", "My answer is no.", "My answer is maybe."];

const BULLET_PARAMS: &[ParamSpec] = &[ParamSpec::required("num_bullets", ParamType::Count)];

const HIGHLIGHT_PARAMS: &[ParamSpec] =
    &[ParamSpec::required("num_highlights", ParamType::Count)];

const SECTION_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional(
        "section_spliter",
        ParamType::Text,
        ParamDefault::Str("Section"),
    ),
    ParamSpec::required("num_sections", ParamType::Count),
];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![
        InstructionKind::new(
            "detectable_format:number_bullet_lists",
            BULLET_PARAMS,
            Conflicts::With(&[
                "detectable_format:number_highlighted_sections",
                "detectable_format:json_format",
            ]),
            BulletList::build,
            BulletList::sample,
        ),
        InstructionKind::new(
            "detectable_format:constrained_response",
            &[],
            Conflicts::AllExcept(&[
                "keywords:existence",
                "keywords:forbidden_words",
                "language:response_language",
            ]),
            ConstrainedResponse::build,
            ConstrainedResponse::sample,
        ),
        InstructionKind::new(
            "detectable_format:number_highlighted_sections",
            HIGHLIGHT_PARAMS,
            Conflicts::With(&[]),
            Highlights::build,
            Highlights::sample,
        ),
        InstructionKind::new(
            "detectable_format:multiple_sections",
            SECTION_PARAMS,
            Conflicts::With(&[
                "detectable_format:number_highlighted_sections",
                "length_constraints:number_paragraphs",
            ]),
            Sections::build,
            Sections::sample,
        ),
        InstructionKind::new(
            "detectable_format:json_format",
            &[],
            Conflicts::AllExcept(&["keywords:existence", "keywords:forbidden_words"]),
            JsonFormat::build,
            JsonFormat::sample,
        ),
        InstructionKind::new(
            "detectable_format:title",
            &[],
            Conflicts::With(&[]),
            Title::build,
            Title::sample,
        ),
    ]
}

/// Exactly N markdown bullet points.
pub struct BulletList {
    expected: usize,
}

impl BulletList {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            expected: args.count("num_bullets")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("num_bullets", sample_count(rng, 1, MAX_BULLETS))
    }
}

impl Instruction for BulletList {
    fn describe(&self) -> String {
        format!(
            "Your answer must contain exactly {} bullet points. Use the markdown bullet points \
             such as:\n* This is point 1.\n* This is point 2",
            self.expected
        )
    }

    fn check(&self, response: &str) -> bool {
        let bullets =
            STAR_BULLET.find_iter(response).count() + DASH_BULLET.find_iter(response).count();
        bullets == self.expected
    }
}

/// The response contains one of the fixed answer phrases.
pub struct ConstrainedResponse;

impl ConstrainedResponse {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

impl Instruction for ConstrainedResponse {
    fn describe(&self) -> String {
        format!(
            "Answer with one of the following options: (\"{}\")",
            CONSTRAINED_RESPONSE_OPTIONS.join("\", \"")
        )
    }

    fn check(&self, response: &str) -> bool {
        let response = response.trim();
        CONSTRAINED_RESPONSE_OPTIONS
            .iter()
            .any(|option| response.contains(option))
    }
}

/// At least N non-empty `*highlighted*` or `**highlighted**` spans.
pub struct Highlights {
    minimum: usize,
}

impl Highlights {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            minimum: args.count("num_highlights")?,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new().with("num_highlights", sample_count(rng, 1, MAX_HIGHLIGHTS))
    }
}

impl Instruction for Highlights {
    fn describe(&self) -> String {
        format!(
            "Highlight at least {} sections in your answer with markdown, i.e. *highlighted section*.",
            self.minimum
        )
    }

    fn check(&self, response: &str) -> bool {
        let single = HIGHLIGHT
            .find_iter(response)
            .filter(|m| !m.as_str().trim_matches('*').trim().is_empty())
            .count();
        let double = DOUBLE_HIGHLIGHT
            .find_iter(response)
            .filter(|m| {
                let inner = m.as_str();
                !inner[2..inner.len() - 2].trim().is_empty()
            })
            .count();
        single + double >= self.minimum
    }
}

/// At least N sections introduced by `<splitter> <number>`.
pub struct Sections {
    splitter: String,
    minimum: usize,
    pattern: Regex,
}

impl Sections {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        let splitter = args.text("section_spliter")?.to_string();
        let pattern = Regex::new(&format!(r"\s?{}\s?\d+\s?", regex::escape(&splitter)))
            .map_err(|e| args.reject("section_spliter", e.to_string()))?;
        Ok(Box::new(Self {
            splitter,
            minimum: args.count("num_sections")?,
            pattern,
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        Params::new()
            .with("section_spliter", sample_choice(rng, SECTION_SPLITTERS))
            .with("num_sections", sample_count(rng, 1, MAX_SECTIONS))
    }
}

impl Instruction for Sections {
    fn describe(&self) -> String {
        format!(
            "Your response must have {n} sections. Mark the beginning of each section with \
             {s} X, such as:\n{s} 1\n[content of section 1]\n{s} 2\n[content of section 2]",
            n = self.minimum,
            s = self.splitter
        )
    }

    fn check(&self, response: &str) -> bool {
        let sections = self.pattern.split(response).count() - 1;
        sections >= self.minimum
    }
}

/// The whole response is valid JSON, optionally inside a code fence.
pub struct JsonFormat;

impl JsonFormat {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

/// Strip a surrounding markdown code fence (```json, ```Json, ```JSON or ```).
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = ["```json", "```Json", "```JSON", "```"]
        .iter()
        .find_map(|fence| text.strip_prefix(fence))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

impl Instruction for JsonFormat {
    fn describe(&self) -> String {
        "Entire output should be wrapped in JSON format. You can use markdown ticks such as ```."
            .to_string()
    }

    fn check(&self, response: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(strip_code_fence(response)).is_ok()
    }
}

/// A title wrapped in double angular brackets.
pub struct Title;

impl Title {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

impl Instruction for Title {
    fn describe(&self) -> String {
        "Your answer must contain a title, wrapped in double angular brackets, such as \
         <<poem of joy>>."
            .to_string()
    }

    fn check(&self, response: &str) -> bool {
        TITLE.find_iter(response).any(|m| {
            !m.as_str()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .trim()
                .is_empty()
        })
    }
}
