//! `punctuation:` instructions.

use rand::RngCore;

use super::{Args, Conflicts, Instruction, InstructionError, InstructionKind};
use crate::types::Params;

pub(super) fn kinds() -> Vec<InstructionKind> {
    vec![InstructionKind::new(
        "punctuation:no_comma",
        &[],
        Conflicts::With(&[]),
        NoComma::build,
        NoComma::sample,
    )]
}

/// No commas anywhere in the response.
pub struct NoComma;

impl NoComma {
    fn build(_args: &Args<'_>) -> Result<Box<dyn Instruction>, InstructionError> {
        Ok(Box::new(Self))
    }

    fn sample(_rng: &mut dyn RngCore) -> Params {
        Params::new()
    }
}

impl Instruction for NoComma {
    fn describe(&self) -> String {
        "In your entire response, refrain from the use of any commas.".to_string()
    }

    fn check(&self, response: &str) -> bool {
        !response.contains(',')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_comma() {
        let bound = kinds()[0].bind(&Params::new()).unwrap();
        assert!(bound.check("No commas here."));
        assert!(!bound.check("One, two."));
        assert!(bound.check(""));
    }
}
