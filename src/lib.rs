//! # hubchat
//!
//! Chat middleware that routes natural-language requests to a
//! dynamically-discovered set of GitHub tools exposed over MCP.
//!
//! ## Pipeline
//!
//! - **Credential store**: per-user OAuth tokens with an age-based
//!   validity check
//! - **Remote tool client**: bearer-authenticated JSON-RPC client with
//!   transparent, idempotent connection handling
//! - **Tool catalog**: lazy, at-most-once tool discovery rendered as
//!   natural-language decision context
//! - **Intent resolver**: pattern-based or model-delegated mapping from
//!   free text to tool invocations
//! - **Tool executor**: sequential execution with independent
//!   per-invocation outcomes
//! - **Result formatter**: total rendering of arbitrary tool output into
//!   readable text
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hubchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let credentials = CredentialStore::new();
//!     let oauth = OauthFlow::new(config.oauth.clone())?;
//!
//!     let agent = ChatAgent::new(config, credentials, oauth, None);
//!     let reply = agent.handle("user-1", "list my repositories").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod llm;
pub mod mcp;
pub mod resolver;

// Re-exports for convenient usage
pub use agent::{AgentReply, ChatAgent};
pub use auth::{CredentialRecord, CredentialStore, OauthConfig, OauthFlow};
pub use catalog::ToolCatalog;
pub use config::{Config, ResolverStrategy};
pub use error::HubchatError;
pub use executor::{InvocationResult, ToolExecutor};
pub use format::format_result;
pub use llm::{LlmClient, LlmClientBuilder, LlmError, OpenAiClient};
pub use mcp::{McpClient, McpClientBuilder, McpError, RemoteTools, SharedClient, ToolInfo};
pub use resolver::{
    IntentResolver, ModelResolver, PatternResolver, Resolution, ResolveError, ToolInvocation,
};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::agent::{AgentReply, ChatAgent};
    pub use crate::auth::{CredentialRecord, CredentialStore, OauthConfig, OauthFlow};
    pub use crate::config::{Config, ResolverStrategy};
    pub use crate::llm::LlmClientBuilder;
    pub use crate::resolver::{IntentResolver, Resolution, ToolInvocation};
}
