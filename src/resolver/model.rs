use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::{IntentResolver, ResolveError, Resolution, ToolInvocation};
use crate::catalog::ToolCatalog;
use crate::llm::LlmClient;

const DEFAULT_MISSING_INFO: &str =
    "could you say which repository and what you'd like me to do with it?";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentDecision {
    #[serde(default)]
    tool_calls: Vec<DecidedCall>,
    #[serde(default)]
    needs_more_info: bool,
    missing_info: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecidedCall {
    tool_name: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    reasoning: String,
}

/// Delegates intent resolution to a language model constrained to answer
/// with a JSON decision object.
pub struct ModelResolver {
    llm: Arc<dyn LlmClient>,
}

impl ModelResolver {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn instruction(user_text: &str) -> String {
        format!(
            "User request: {user_text}\n\n\
             Respond with a single JSON object of this exact shape and nothing else:\n\
             {{\"toolCalls\": [{{\"toolName\": \"<tool>\", \"parameters\": {{}}, \
             \"reasoning\": \"<why>\"}}], \"needsMoreInfo\": false, \"missingInfo\": null}}\n\
             Set needsMoreInfo to true and fill missingInfo when the request is \
             under-specified, leaving toolCalls empty."
        )
    }
}

/// Returns the first balanced `{…}` span in `text`, tracking string
/// literals and escapes.
///
/// Known fragility, kept for compatibility: a stray brace in prose before
/// the JSON can throw the scan off. A stricter contract (whole response is
/// JSON, or a fenced block) would be the hardened alternative.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait]
impl IntentResolver for ModelResolver {
    async fn resolve(
        &self,
        input: &str,
        catalog: &ToolCatalog,
    ) -> Result<Resolution, ResolveError> {
        let system_prompt = catalog.system_prompt().await;
        let response = self
            .llm
            .complete(&system_prompt, &Self::instruction(input))
            .await?;

        let json = extract_json_object(&response).ok_or_else(|| {
            ResolveError::Parse("no JSON object found in model response".to_string())
        })?;

        let decision: IntentDecision =
            serde_json::from_str(json).map_err(|e| ResolveError::Parse(e.to_string()))?;

        if decision.needs_more_info || decision.tool_calls.is_empty() {
            return Ok(Resolution::NeedsMoreInfo(
                decision
                    .missing_info
                    .unwrap_or_else(|| DEFAULT_MISSING_INFO.to_string()),
            ));
        }

        debug!(count = decision.tool_calls.len(), "Model resolution produced invocations");
        Ok(Resolution::ToolCalls(
            decision
                .tool_calls
                .into_iter()
                .map(|call| ToolInvocation {
                    tool_name: call.tool_name,
                    arguments: call.parameters,
                    reasoning: call.reasoning,
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_snapshot(Vec::new(), None)
    }

    fn resolver_returning(response: &str) -> ModelResolver {
        let mut llm = MockLlmClient::new();
        let response = response.to_string();
        llm.expect_complete()
            .returning(move |_, _| Ok(response.clone()));
        ModelResolver::new(Arc::new(llm))
    }

    #[test]
    fn extracts_first_balanced_object() {
        assert_eq!(extract_json_object("{\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(
            extract_json_object("sure, here you go: {\"a\": {\"b\": 2}} trailing"),
            Some("{\"a\": {\"b\": 2}}")
        );
        // Braces inside string literals do not close the span.
        assert_eq!(
            extract_json_object("{\"a\": \"}\"}"),
            Some("{\"a\": \"}\"}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{never closed"), None);
    }

    #[tokio::test]
    async fn valid_decision_maps_to_invocations() {
        let resolver = resolver_returning(
            r#"Here is my decision:
            {"toolCalls": [{"toolName": "get_issue",
                            "parameters": {"owner": "octocat", "repo": "hello-world", "issue_number": 68},
                            "reasoning": "fetching the issue"}],
             "needsMoreInfo": false}"#,
        );

        let resolution = resolver.resolve("show issue #68", &catalog()).await.unwrap();
        let Resolution::ToolCalls(calls) = resolution else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "get_issue");
        assert_eq!(calls[0].arguments["issue_number"], 68);
        assert_eq!(calls[0].reasoning, "fetching the issue");
    }

    #[tokio::test]
    async fn empty_tool_calls_normalize_to_needs_more_info() {
        let resolver =
            resolver_returning(r#"{"toolCalls": [], "needsMoreInfo": false, "missingInfo": null}"#);
        let resolution = resolver.resolve("hmm", &catalog()).await.unwrap();
        assert!(matches!(resolution, Resolution::NeedsMoreInfo(_)));
    }

    #[tokio::test]
    async fn flagged_needs_more_info_carries_the_missing_detail() {
        let resolver = resolver_returning(
            r#"{"toolCalls": [], "needsMoreInfo": true, "missingInfo": "which repository?"}"#,
        );
        let resolution = resolver.resolve("list issues", &catalog()).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::NeedsMoreInfo("which repository?".to_string())
        );
    }

    #[tokio::test]
    async fn unparseable_response_is_a_parse_error() {
        let resolver = resolver_returning("I would love to help but cannot decide.");
        let result = resolver.resolve("do things", &catalog()).await;
        assert!(matches!(result, Err(ResolveError::Parse(_))));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let resolver = resolver_returning(r#"{"toolCalls": "not-a-list"}"#);
        let result = resolver.resolve("do things", &catalog()).await;
        assert!(matches!(result, Err(ResolveError::Parse(_))));
    }
}
