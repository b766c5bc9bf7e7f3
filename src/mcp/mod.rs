pub mod client;

pub use client::{McpClient, McpClientBuilder, McpError, ToolInfo};

/// Names of the GitHub tools the resolver and formatter know by sight.
/// Anything else goes through shape-based formatting.
pub mod tool_names {
    pub const SEARCH_REPOSITORIES: &str = "search_repositories";
    pub const CREATE_REPOSITORY: &str = "create_repository";
    pub const LIST_PULL_REQUESTS: &str = "list_pull_requests";
    pub const CREATE_PULL_REQUEST: &str = "create_pull_request";
    pub const LIST_ISSUES: &str = "list_issues";
    pub const CREATE_ISSUE: &str = "create_issue";
    pub const GET_ISSUE: &str = "get_issue";
    pub const GET_FILE_CONTENTS: &str = "get_file_contents";
    pub const GET_ME: &str = "get_me";
    /// Pseudo-tool answered locally from the catalog, never sent remote.
    pub const LIST_AVAILABLE_TOOLS: &str = "list_available_tools";
}

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The surface the catalog and executor need from the remote endpoint.
/// Injected rather than taken as a concrete client so both can be
/// exercised without a live endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteTools: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, McpError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError>;
}

/// [`RemoteTools`] backed by a shared [`McpClient`].
#[derive(Debug, Clone)]
pub struct SharedClient {
    inner: Arc<Mutex<McpClient>>,
}

impl SharedClient {
    pub fn new(client: Arc<Mutex<McpClient>>) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl RemoteTools for SharedClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, McpError> {
        self.inner.lock().await.list_tools().await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        self.inner.lock().await.call_tool(name, arguments).await
    }
}
