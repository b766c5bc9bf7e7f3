use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::mcp::{RemoteTools, ToolInfo};

const NO_TOOLS_SENTENCE: &str = "No tools are currently available.";

/// A point-in-time snapshot of the remote tool inventory, plus the
/// rendering that turns it into decision context.
///
/// The inventory loads lazily, exactly once per instance: concurrent first
/// callers share the in-flight load, and a failed load caches an empty
/// list. Construct a fresh catalog to retry.
pub struct ToolCatalog {
    source: Option<Arc<dyn RemoteTools>>,
    tools: OnceCell<Vec<ToolInfo>>,
    default_repository: Option<(String, String)>,
    fallback_owner: Option<String>,
}

impl ToolCatalog {
    pub fn new(
        source: Arc<dyn RemoteTools>,
        default_repository: Option<(String, String)>,
    ) -> Self {
        Self {
            source: Some(source),
            tools: OnceCell::new(),
            default_repository,
            fallback_owner: None,
        }
    }

    /// Builds a catalog around an already-known inventory, skipping the
    /// remote load. Used for warm starts and in tests.
    pub fn from_snapshot(
        tools: Vec<ToolInfo>,
        default_repository: Option<(String, String)>,
    ) -> Self {
        Self {
            source: None,
            tools: OnceCell::new_with(Some(tools)),
            default_repository,
            fallback_owner: None,
        }
    }

    /// Sets the owner that bare repository names resolve against: the
    /// configured default owner, or the signed-in user's login.
    pub fn with_fallback_owner(mut self, owner: impl Into<String>) -> Self {
        self.fallback_owner = Some(owner.into());
        self
    }

    /// The cached tool list, loading it on first access.
    pub async fn available_tools(&self) -> &[ToolInfo] {
        self.tools
            .get_or_init(|| async {
                let Some(source) = &self.source else {
                    return Vec::new();
                };
                match source.list_tools().await {
                    Ok(tools) => {
                        debug!(count = tools.len(), "Loaded tool catalog");
                        tools
                    }
                    Err(e) => {
                        warn!(error = %e, "Tool catalog load failed; continuing with no tools");
                        Vec::new()
                    }
                }
            })
            .await
    }

    /// Renders the inventory as a natural-language block: each tool's name
    /// and description, and for each declared parameter its name, a
    /// required/optional marker, and its description or type.
    pub async fn tools_context(&self) -> String {
        let tools = self.available_tools().await;
        if tools.is_empty() {
            return NO_TOOLS_SENTENCE.to_string();
        }

        let mut out = String::from("Available tools:\n");
        for tool in tools {
            out.push_str(&format!("\n- {}: {}\n", tool.name, tool.description));

            let properties = tool.input_schema.get("properties").and_then(Value::as_object);
            let Some(properties) = properties else {
                continue;
            };
            if properties.is_empty() {
                continue;
            }

            let required: Vec<&str> = tool
                .input_schema
                .get("required")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            out.push_str("  Parameters:\n");
            for (name, schema) in properties {
                let marker = if required.contains(&name.as_str()) {
                    "required"
                } else {
                    "optional"
                };
                let detail = schema
                    .get("description")
                    .and_then(Value::as_str)
                    .or_else(|| schema.get("type").and_then(Value::as_str))
                    .unwrap_or("no description");
                out.push_str(&format!("    - {} ({}): {}\n", name, marker, detail));
            }
        }
        out
    }

    /// The instruction block handed to the model-delegated resolver:
    /// tools context, default-repository note, and behavioral guidelines.
    pub async fn system_prompt(&self) -> String {
        let tools_context = self.tools_context().await;

        let repository_note = match &self.default_repository {
            Some((owner, repo)) => format!(
                "When the user does not name a repository, use the default {}/{}.",
                owner, repo
            ),
            None => "No default repository is configured; require the user to name one \
                     explicitly as owner/repo before acting on repository-scoped tools."
                .to_string(),
        };

        format!(
            "You are a GitHub assistant that maps user requests to tool calls.\n\n\
             {tools_context}\n\
             {repository_note}\n\n\
             Guidelines:\n\
             - Only call tools that appear in the list above.\n\
             - Fill every required parameter; never invent repository names.\n\
             - Prefer a single tool call unless the request clearly asks for several things.\n\
             - If the request cannot be satisfied with the available tools, say what is missing."
        )
    }

    /// The configured default repository, if any.
    pub fn default_repository(&self) -> Option<&(String, String)> {
        self.default_repository.as_ref()
    }

    /// The owner bare repository names are scoped to, if known.
    pub fn fallback_owner(&self) -> Option<&str> {
        self.fallback_owner.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpError, MockRemoteTools};

    fn issue_tool() -> ToolInfo {
        ToolInfo {
            name: "get_issue".to_string(),
            description: "Get details of an issue".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner" },
                    "repo": { "type": "string" },
                    "issue_number": { "type": "number", "description": "Issue number" }
                },
                "required": ["owner", "repo"]
            }),
        }
    }

    #[tokio::test]
    async fn loads_at_most_once_under_concurrent_access() {
        let mut source = MockRemoteTools::new();
        source
            .expect_list_tools()
            .times(1)
            .returning(|| Ok(vec![issue_tool()]));

        let catalog = ToolCatalog::new(Arc::new(source), None);
        let (first, second) = tokio::join!(catalog.available_tools(), catalog.available_tools());
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn failed_load_caches_empty_and_is_not_retried() {
        let mut source = MockRemoteTools::new();
        source
            .expect_list_tools()
            .times(1)
            .returning(|| Err(McpError::ListTools("boom".to_string())));

        let catalog = ToolCatalog::new(Arc::new(source), None);
        assert!(catalog.available_tools().await.is_empty());
        // Second access must not hit the source again (times(1) above).
        assert!(catalog.available_tools().await.is_empty());
    }

    #[tokio::test]
    async fn context_marks_required_and_optional_parameters() {
        let catalog = ToolCatalog::from_snapshot(vec![issue_tool()], None);
        let context = catalog.tools_context().await;

        assert!(context.contains("get_issue: Get details of an issue"));
        assert!(context.contains("owner (required): Repository owner"));
        assert!(context.contains("issue_number (optional): Issue number"));
        // Falls back to the type when there is no description.
        assert!(context.contains("repo (required): string"));
    }

    #[tokio::test]
    async fn empty_catalog_renders_fixed_sentence() {
        let catalog = ToolCatalog::from_snapshot(Vec::new(), None);
        assert_eq!(catalog.tools_context().await, NO_TOOLS_SENTENCE);
    }

    #[tokio::test]
    async fn system_prompt_mentions_default_repository() {
        let catalog = ToolCatalog::from_snapshot(
            vec![issue_tool()],
            Some(("octocat".to_string(), "hello-world".to_string())),
        );
        let prompt = catalog.system_prompt().await;
        assert!(prompt.contains("octocat/hello-world"));
        assert!(prompt.contains("Guidelines:"));
    }
}
