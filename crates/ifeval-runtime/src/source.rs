//! Where responses come from.

use async_trait::async_trait;
use std::collections::HashMap;

use ifeval_core::InputExample;

use crate::RuntimeError;

/// Supplies the model response for an input example.
///
/// `Ok(None)` means the source has no response for this prompt; the batch
/// runner evaluates it as an empty response.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    async fn response_for(&self, input: &InputExample) -> Result<Option<String>, RuntimeError>;
}

/// Responses already loaded into memory, keyed by prompt text.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResponses {
    responses: HashMap<String, String>,
}

impl InMemoryResponses {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self { responses }
    }

    pub fn insert(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses.insert(prompt.into(), response.into());
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl From<HashMap<String, String>> for InMemoryResponses {
    fn from(responses: HashMap<String, String>) -> Self {
        Self::new(responses)
    }
}

#[async_trait]
impl ResponseSource for InMemoryResponses {
    async fn response_for(&self, input: &InputExample) -> Result<Option<String>, RuntimeError> {
        Ok(self.responses.get(&input.prompt).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(prompt: &str) -> InputExample {
        InputExample {
            key: 1,
            prompt: prompt.to_string(),
            instruction_id_list: vec![],
            kwargs: vec![],
        }
    }

    #[tokio::test]
    async fn test_lookup_by_prompt() {
        let mut source = InMemoryResponses::default();
        source.insert("Write a poem.", "roses are red");

        assert_eq!(
            source.response_for(&input("Write a poem.")).await,
            Ok(Some("roses are red".to_string()))
        );
        assert_eq!(source.response_for(&input("Other prompt")).await, Ok(None));
        assert_eq!(source.len(), 1);
    }
}
