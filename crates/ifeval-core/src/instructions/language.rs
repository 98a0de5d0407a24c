//! `language:` instructions.

use rand::seq::SliceRandom;
use rand::RngCore;

use super::{Args, Conflicts, Instruction, InstructionError, InstructionKind, ParamSpec, ParamType};
use crate::langid;
use crate::types::Params;

const RESPONSE_LANGUAGE_PARAMS: &[ParamSpec] =
    &[ParamSpec::required("language", ParamType::Language)];

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![InstructionKind::new(
        "language:response_language",
        RESPONSE_LANGUAGE_PARAMS,
        Conflicts::With(&["change_case:english_capital", "change_case:english_lowercase"]),
        ResponseLanguage::build,
        ResponseLanguage::sample,
    )]
}

/// The whole response must be written in one language.
///
/// When the language of the response cannot be determined the instruction
/// counts as followed.
pub struct ResponseLanguage {
    code: String,
}

impl ResponseLanguage {
    fn build(args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self {
            code: args.text("language")?.to_string(),
        }))
    }

    fn sample(rng: &mut dyn RngCore) -> Params {
        let code = langid::SUPPORTED_LANGUAGES
            .choose(rng)
            .map(|(code, _, _)| *code)
            .unwrap_or("en");
        Params::new().with("language", code)
    }
}

impl Instruction for ResponseLanguage {
    fn describe(&self) -> String {
        let name = langid::language_name(&self.code).unwrap_or(self.code.as_str());
        format!(
            "Your ENTIRE response should be in {} language, no other language is allowed.",
            name
        )
    }

    fn check(&self, response: &str) -> bool {
        match langid::detect_language(response) {
            Some(detected) => detected == self.code,
            None => true,
        }
    }
}
