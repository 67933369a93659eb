//! Settings structs for the fields the pipeline consumes.

use serde::{Deserialize, Serialize};

/// Provider kinds the pipeline knows how to talk to.
///
/// LM Studio, llama.cpp and Oobabooga all expose the OpenAI-compatible chat
/// API, so they share one client implementation; the variant is kept so
/// settings files stay self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Ollama,
    LmStudio,
    LlamaCpp,
    Oobabooga,
}

impl ProviderKind {
    /// Whether this provider speaks the OpenAI-compatible chat completions API.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::LmStudio => write!(f, "lm-studio"),
            ProviderKind::LlamaCpp => write!(f, "llama-cpp"),
            ProviderKind::Oobabooga => write!(f, "oobabooga"),
        }
    }
}

/// A named captioning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Display name other settings refer to
    pub name: String,

    /// Which wire protocol the backend speaks
    pub provider: ProviderKind,

    /// Base URL, e.g. `http://localhost:11434`
    pub url: String,

    /// Model identifier passed to the backend
    pub model: String,
}

/// A named prompt with an assigned endpoint and output format tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// Template name
    pub name: String,

    /// Prompt text; `{output_format}` is substituted before use
    pub prompt: String,

    /// Name of the endpoint this template is assigned to
    pub endpoint: String,

    /// Output format tag, e.g. "Text" or "Markdown"
    pub output_format: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            prompt: String::new(),
            endpoint: String::new(),
            output_format: "Text".to_string(),
        }
    }
}

/// Batch execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Run captioning with a bounded worker pool instead of strictly in order
    pub parallel: bool,

    /// Worker pool width when `parallel` is enabled
    pub workers: usize,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Concurrent file handles for loose caption export
    pub export_fanout: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: 4,
            timeout_ms: 120_000,
            export_fanout: 8,
        }
    }
}

impl BatchConfig {
    /// Concurrency limit the orchestrator should use: 1 when sequential.
    pub fn effective_workers(&self) -> usize {
        if self.parallel {
            self.workers
        } else {
            1
        }
    }
}
