use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{CredentialRecord, CredentialStore, OauthFlow};
use crate::catalog::ToolCatalog;
use crate::config::{Config, ResolverStrategy};
use crate::error::HubchatError;
use crate::executor::{InvocationResult, ToolExecutor};
use crate::llm::LlmClient;
use crate::mcp::{tool_names, McpClient, RemoteTools, SharedClient};
use crate::resolver::{
    IntentResolver, ModelResolver, PatternResolver, Resolution, ToolInvocation,
};

/// The outgoing side of one handled message: an optional one-shot
/// progress notice to send before the work, and the final reply text.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub notice: Option<String>,
    pub text: String,
}

impl AgentReply {
    fn text_only(text: impl Into<String>) -> Self {
        Self {
            notice: None,
            text: text.into(),
        }
    }
}

/// The per-message pipeline: credential gate, fresh tool client, intent
/// resolution, sequential execution, formatting.
///
/// Everything here is scoped to a single incoming message; the credential
/// store is the only state shared across messages.
pub struct ChatAgent {
    config: Config,
    credentials: CredentialStore,
    oauth: OauthFlow,
    resolver: Arc<dyn IntentResolver>,
}

impl ChatAgent {
    /// Builds the agent, selecting the resolver strategy from
    /// configuration. The model strategy needs an LLM client; without one
    /// it falls back to pattern matching.
    pub fn new(
        config: Config,
        credentials: CredentialStore,
        oauth: OauthFlow,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let resolver: Arc<dyn IntentResolver> = match (config.strategy, llm) {
            (ResolverStrategy::Model, Some(llm)) => Arc::new(ModelResolver::new(llm)),
            (ResolverStrategy::Model, None) => {
                warn!("Model resolver selected but no LLM client configured; using patterns");
                Arc::new(PatternResolver::new())
            }
            (ResolverStrategy::Pattern, _) => Arc::new(PatternResolver::new()),
        };

        Self {
            config,
            credentials,
            oauth,
            resolver,
        }
    }

    /// Handles one user message end to end. Never returns an error: every
    /// failure is rendered as chat text.
    pub async fn handle(&self, user_id: &str, text: &str) -> AgentReply {
        let Some(record) = self.credentials.valid_record(user_id).await else {
            debug!(user_id, "No valid credential; prompting for authentication");
            let url = self.oauth.authorize_url(user_id).await;
            return AgentReply::text_only(format!(
                "{} Visit this link to sign in: {}",
                HubchatError::MissingCredential.user_message(),
                url
            ));
        };

        let fallback_owner = self.fallback_owner(user_id, &record).await;

        // A fresh client per message, carrying this user's token: no
        // cross-request connection state to race on.
        let client = match McpClient::builder()
            .with_endpoint(&self.config.mcp_endpoint)
            .with_bearer(record.access_token)
            .build()
        {
            Ok(client) => client,
            Err(e) => return AgentReply::text_only(HubchatError::from(e).user_message()),
        };
        let client = Arc::new(Mutex::new(client));
        let remote: Arc<dyn RemoteTools> = Arc::new(SharedClient::new(client.clone()));
        let mut catalog = ToolCatalog::new(remote.clone(), self.config.default_repository());
        if let Some(owner) = fallback_owner {
            catalog = catalog.with_fallback_owner(owner);
        }

        let resolution = match self.resolver.resolve(text, &catalog).await {
            Ok(resolution) => resolution,
            Err(e) => {
                client.lock().await.disconnect().await;
                return AgentReply::text_only(HubchatError::from(e).user_message());
            }
        };

        let reply = match resolution {
            Resolution::NeedsMoreInfo(missing) => {
                AgentReply::text_only(format!("I need a bit more detail: {}", missing))
            }
            Resolution::ToolCalls(invocations) => {
                let notice = ToolExecutor::progress_notice(&invocations);
                let executor = ToolExecutor::new(remote);

                let mut results = Vec::with_capacity(invocations.len());
                for invocation in &invocations {
                    results.push(self.run_invocation(&executor, &catalog, invocation).await);
                }

                AgentReply {
                    notice: Some(notice),
                    text: render_results(&results),
                }
            }
        };

        client.lock().await.disconnect().await;
        reply
    }

    /// The owner bare repository names resolve against: the configured
    /// default owner, or the signed-in user's login. The login is looked
    /// up at most once per credential and cached on the stored record.
    async fn fallback_owner(&self, user_id: &str, record: &CredentialRecord) -> Option<String> {
        if let Some(owner) = &self.config.default_owner {
            return Some(owner.clone());
        }
        if let Some(login) = &record.login {
            return Some(login.clone());
        }
        match self.oauth.fetch_login(&record.access_token).await {
            Ok(login) => {
                let mut updated = record.clone();
                updated.login = Some(login.clone());
                self.credentials.put(user_id, updated).await;
                Some(login)
            }
            Err(e) => {
                warn!(error = %e, "Could not resolve the signed-in login");
                None
            }
        }
    }

    /// Executes one invocation, answering the tool-listing pseudo-tool
    /// locally from the catalog instead of going remote.
    async fn run_invocation(
        &self,
        executor: &ToolExecutor,
        catalog: &ToolCatalog,
        invocation: &ToolInvocation,
    ) -> InvocationResult {
        if invocation.tool_name == tool_names::LIST_AVAILABLE_TOOLS {
            let tools: Vec<_> = catalog
                .available_tools()
                .await
                .iter()
                .map(|tool| json!({"name": tool.name.clone(), "description": tool.description.clone()}))
                .collect();
            return InvocationResult::ok(tool_names::LIST_AVAILABLE_TOOLS, json!(tools));
        }
        executor.execute(invocation).await
    }
}

/// Joins per-invocation outcomes in resolver order. Failures are reported
/// in place without suppressing the successes around them.
fn render_results(results: &[InvocationResult]) -> String {
    results
        .iter()
        .map(|result| {
            if result.success {
                result
                    .formatted
                    .clone()
                    .unwrap_or_else(|| "Done.".to_string())
            } else {
                format!(
                    "Sorry, '{}' didn't work: {}. This is usually a permissions problem, \
                     a network hiccup, or the tool being unavailable.",
                    result.tool_name,
                    result.error.as_deref().unwrap_or("unknown error")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
