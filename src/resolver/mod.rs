pub mod model;
pub mod pattern;

pub use model::ModelResolver;
pub use pattern::PatternResolver;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::catalog::ToolCatalog;
use crate::llm::LlmError;

/// A resolved (tool name, arguments) pair ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    /// Short human-readable description of why this call was chosen;
    /// surfaces in the progress notice.
    pub reasoning: String,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
            reasoning: reasoning.into(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Terminal outcome of one resolution call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// An ordered list of invocations to execute
    ToolCalls(Vec<ToolInvocation>),
    /// The request is understood but under-specified; the string says
    /// what is missing
    NeedsMoreInfo(String),
}

/// Errors from intent resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The strategy could not derive a structured decision
    #[error("Could not parse intent decision: {0}")]
    Parse(String),
    /// The delegated language-model call failed
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Maps free text plus the tool catalog into invocations, or a
/// needs-more-information signal. One call is terminal: no retries.
#[async_trait]
pub trait IntentResolver: Send + Sync {
    async fn resolve(&self, input: &str, catalog: &ToolCatalog)
        -> Result<Resolution, ResolveError>;
}
