//! Model routing and prompt configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Per-model knobs that influence request translation.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    /// Model used for warmup and title-generation requests.
    pub small_model: Option<String>,

    /// Per-model reasoning effort overrides. Models not listed here use
    /// [`ReasoningEffort::High`].
    pub reasoning_effort: BTreeMap<String, ReasoningEffort>,

    /// Extra system prompt text appended per model.
    pub extra_prompts: BTreeMap<String, String>,
}

/// Reasoning effort requested from the upstream for reasoning-capable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Minimal reasoning.
    Minimal,
    /// Low reasoning.
    Low,
    /// Medium reasoning.
    Medium,
    /// High reasoning.
    High,
}

impl ReasoningEffort {
    /// Wire value for the upstream `reasoning.effort` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
