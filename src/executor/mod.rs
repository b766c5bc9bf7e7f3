use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::format::format_result;
use crate::mcp::RemoteTools;
use crate::resolver::ToolInvocation;

/// Outcome of one invocation. Transient: produced per invocation,
/// rendered, then discarded.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub success: bool,
    pub tool_name: String,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub formatted: Option<String>,
}

impl InvocationResult {
    pub fn ok(tool_name: impl Into<String>, data: Value) -> Self {
        let tool_name = tool_name.into();
        let formatted = format_result(&tool_name, &data);
        Self {
            success: true,
            tool_name,
            data: Some(data),
            error: None,
            formatted: Some(formatted),
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tool_name: tool_name.into(),
            data: None,
            error: Some(error.into()),
            formatted: None,
        }
    }
}

/// Runs resolved invocations against the remote endpoint, strictly one
/// after another. Each outcome is captured independently; a failure never
/// aborts the rest of the batch.
pub struct ToolExecutor {
    remote: Arc<dyn RemoteTools>,
}

impl ToolExecutor {
    pub fn new(remote: Arc<dyn RemoteTools>) -> Self {
        Self { remote }
    }

    /// One-shot status line announcing the batch, built from each
    /// invocation's reasoning.
    pub fn progress_notice(invocations: &[ToolInvocation]) -> String {
        let doing: Vec<&str> = invocations
            .iter()
            .map(|inv| inv.reasoning.as_str())
            .filter(|r| !r.is_empty())
            .collect();
        if doing.is_empty() {
            "Working on it...".to_string()
        } else {
            format!("Working on it: {}", doing.join(", "))
        }
    }

    pub async fn execute(&self, invocation: &ToolInvocation) -> InvocationResult {
        debug!(tool = %invocation.tool_name, "Executing invocation");
        let arguments = Value::Object(invocation.arguments.clone());

        match self.remote.call_tool(&invocation.tool_name, arguments).await {
            Ok(data) => InvocationResult::ok(&invocation.tool_name, data),
            Err(e) => {
                warn!(tool = %invocation.tool_name, error = %e, "Invocation failed");
                InvocationResult::failed(&invocation.tool_name, e.to_string())
            }
        }
    }

    /// Executes a batch sequentially, preserving resolver order in the
    /// returned results.
    pub async fn execute_all(&self, invocations: &[ToolInvocation]) -> Vec<InvocationResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            results.push(self.execute(invocation).await);
        }
        results
    }
}
