//! Unified error type for the pipeline boundary.

use thiserror::Error;

/// Everything that can go wrong while handling one message. All variants
/// are caught at the outermost handler and converted to chat text; none
/// may escape and take the process down.
#[derive(Debug, Error)]
pub enum HubchatError {
    /// Remote tool endpoint failure
    #[error("Tool endpoint error: {0}")]
    Mcp(#[from] crate::mcp::McpError),

    /// Language model failure
    #[error("LLM error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Intent resolution failure
    #[error("Resolve error: {0}")]
    Resolve(#[from] crate::resolver::ResolveError),

    /// OAuth collaborator failure
    #[error("Auth error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    /// No stored credential, or the stored one aged out
    #[error("Missing or expired credential")]
    MissingCredential,
}

impl HubchatError {
    /// The chat-facing rendering of this error: apologetic for transport
    /// failures, a clarification request for resolution failures.
    pub fn user_message(&self) -> String {
        match self {
            HubchatError::Mcp(e) => format!(
                "Sorry, I couldn't reach the GitHub tools ({}). This is usually a \
                 permissions problem, a network hiccup, or the tool being unavailable.",
                e
            ),
            HubchatError::Llm(_) | HubchatError::Resolve(_) => {
                "I couldn't work out what you'd like me to do. Try something like \
                 'list my repositories' or 'show issue #12 in octocat/hello-world'."
                    .to_string()
            }
            HubchatError::Auth(e) => format!("Sorry, signing you in failed: {}", e),
            HubchatError::MissingCredential => {
                "You'll need to connect your GitHub account first.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveError;

    #[test]
    fn resolve_errors_ask_for_clarification_with_examples() {
        let err = HubchatError::from(ResolveError::Parse("garbage".to_string()));
        let message = err.user_message();
        assert!(message.contains("list my repositories"));
        assert!(message.contains("issue #12"));
    }

    #[test]
    fn mcp_errors_name_the_likely_causes() {
        let err = HubchatError::from(crate::mcp::McpError::ListTools("timeout".to_string()));
        let message = err.user_message();
        assert!(message.contains("permissions"));
        assert!(message.contains("network"));
    }
}
