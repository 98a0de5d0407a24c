//! Instruction registry.
//!
//! An immutable catalogue mapping instruction ids to kinds. Built once
//! (usually with [`InstructionRegistry::builtin`]) and shared by reference
//! with every evaluator.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::instructions::{
    builtin_kinds, BoundInstruction, InstructionError, InstructionKind, ParamSpec,
};
use crate::types::{InstructionSpec, Params};

/// Registry errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Instruction id already registered: {0}")]
    DuplicateId(String),

    #[error("Instruction id not found: {0}")]
    NotFound(String),
}

impl From<RegistryError> for InstructionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) | RegistryError::NotFound(id) => {
                InstructionError::UnknownInstructionId(id)
            }
        }
    }
}

/// Catalogue entry summary for tooling (`catalog`, `describe`).
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub id: &'static str,
    pub category: &'static str,
    pub params: &'static [ParamSpec],
}

/// Immutable id -> kind catalogue.
#[derive(Debug, Default)]
pub struct InstructionRegistry {
    kinds: BTreeMap<&'static str, InstructionKind>,
}

impl InstructionRegistry {
    /// An empty registry (useful for tests with fakes or subsets).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in instruction kind.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in builtin_kinds() {
            let id = kind.id();
            if let Err(e) = registry.register(kind) {
                // The built-in catalogue is static; a duplicate is a bug.
                panic!("invalid built-in catalogue at {}: {}", id, e);
            }
        }
        registry
    }

    /// Add a kind. Fails if the id is already present.
    pub fn register(&mut self, kind: InstructionKind) -> Result<(), RegistryError> {
        if self.kinds.contains_key(kind.id()) {
            return Err(RegistryError::DuplicateId(kind.id().to_string()));
        }
        self.kinds.insert(kind.id(), kind);
        Ok(())
    }

    /// Look up a kind by its full id.
    pub fn resolve(&self, id: &str) -> Result<&InstructionKind, RegistryError> {
        self.kinds
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Resolve and bind in one step.
    pub fn bind(&self, id: &str, params: &Params) -> Result<BoundInstruction, InstructionError> {
        self.resolve(id)?.bind(params)
    }

    /// Bind an `(id, params)` pair.
    pub fn bind_spec(&self, spec: &InstructionSpec) -> Result<BoundInstruction, InstructionError> {
        self.bind(&spec.id, &spec.params)
    }

    /// Description sentence for `id` with `params` (defaults filled in).
    pub fn describe(&self, id: &str, params: &Params) -> Result<String, InstructionError> {
        Ok(self.bind(id, params)?.describe())
    }

    /// Recognized parameters of `id`, with types and defaults.
    pub fn parameters(&self, id: &str) -> Result<&'static [ParamSpec], RegistryError> {
        Ok(self.resolve(id)?.params())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &InstructionKind> {
        self.kinds.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    pub fn summaries(&self) -> Vec<KindSummary> {
        self.kinds
            .values()
            .map(|kind| KindSummary {
                id: kind.id(),
                category: kind.category(),
                params: kind.params(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    // =========================================================================
    // CONFLICTS
    // =========================================================================

    /// Whether `a` and `b` cannot appear in the same prompt.
    ///
    /// Symmetric: a conflict declared by either side counts. Every id
    /// conflicts with itself. Unknown ids conflict with nothing.
    pub fn conflicts(&self, a: &str, b: &str) -> bool {
        if a == b {
            return self.kinds.contains_key(a);
        }
        match (self.kinds.get(a), self.kinds.get(b)) {
            (Some(ka), Some(kb)) => ka.declares_conflict_with(b) || kb.declares_conflict_with(a),
            _ => false,
        }
    }

    /// Conflicting pairs `(i, j)`, `i < j`, among `ids`.
    pub fn find_conflicts<S: AsRef<str>>(&self, ids: &[S]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if self.conflicts(ids[i].as_ref(), ids[j].as_ref()) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    // =========================================================================
    // SAMPLING
    // =========================================================================

    /// Draw up to `n` mutually non-conflicting kinds with sampled parameters.
    ///
    /// Fewer than `n` are returned when the catalogue cannot supply that many
    /// compatible kinds.
    pub fn sample_instructions(&self, n: usize, rng: &mut dyn RngCore) -> Vec<InstructionSpec> {
        let mut candidates: Vec<&InstructionKind> = self.kinds.values().collect();
        candidates.shuffle(rng);

        let mut chosen: Vec<InstructionSpec> = Vec::with_capacity(n);
        for kind in candidates {
            if chosen.len() == n {
                break;
            }
            if chosen.iter().any(|spec| self.conflicts(&spec.id, kind.id())) {
                continue;
            }
            chosen.push(InstructionSpec::new(kind.id(), kind.sample_params(rng)));
        }
        chosen
    }
}
