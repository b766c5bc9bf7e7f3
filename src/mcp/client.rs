use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Errors from remote tool operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Could not establish the session
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },
    /// The tool inventory could not be fetched
    #[error("Failed to list tools: {0}")]
    ListTools(String),
    /// A tool invocation failed on transport, protocol, or the remote side
    #[error("Tool call '{tool}' failed: {reason}")]
    ToolCall { tool: String, reason: String },
}

/// A tool exposed by the remote endpoint: name, description, and a
/// JSON-schema description of its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ToolsListResponse {
    tools: Vec<ToolInfo>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Builder for [`McpClient`].
#[derive(Debug, Default)]
pub struct McpClientBuilder {
    endpoint: Option<String>,
    bearer: Option<String>,
    timeout: Option<Duration>,
}

impl McpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tool-serving endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the bearer token sent with every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<McpClient, McpError> {
        let endpoint = self.endpoint.ok_or_else(|| McpError::Connection {
            endpoint: String::new(),
            reason: "endpoint is required".to_string(),
        })?;

        Ok(McpClient {
            endpoint,
            bearer: self.bearer,
            timeout: self.timeout.unwrap_or_else(default_timeout),
            http: None,
            message_id: AtomicU64::new(1),
        })
    }
}

/// A client for a remote tool-invocation endpoint speaking JSON-RPC over
/// HTTP, optionally bearer-authenticated.
///
/// Every public call guarantees a live session: `list_tools` and
/// `call_tool` connect implicitly, and `connect` is a no-op when already
/// connected.
#[derive(Debug)]
pub struct McpClient {
    endpoint: String,
    bearer: Option<String>,
    timeout: Duration,
    http: Option<reqwest::Client>,
    message_id: AtomicU64,
}

impl McpClient {
    pub fn builder() -> McpClientBuilder {
        McpClientBuilder::new()
    }

    pub fn is_connected(&self) -> bool {
        self.http.is_some()
    }

    /// Establishes the session. Idempotent: calling when already connected
    /// is a no-op.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        if self.http.is_some() {
            return Ok(());
        }

        debug!(endpoint = %self.endpoint, "Connecting to tool endpoint");

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &self.bearer {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| self.connection_error(e.to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| self.connection_error(e.to_string()))?;

        let initialize = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "hubchat", "version": env!("CARGO_PKG_VERSION") }
            }
        });

        Self::post_rpc(&client, &self.endpoint, initialize)
            .await
            .map_err(|reason| self.connection_error(reason))?;

        self.http = Some(client);
        debug!(endpoint = %self.endpoint, "Tool endpoint session established");
        Ok(())
    }

    /// Returns the tool inventory, connecting first if needed.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, McpError> {
        self.connect().await.map_err(|e| match e {
            McpError::Connection { reason, .. } => McpError::ListTools(reason),
            other => other,
        })?;

        let request = self.next_request("tools/list", serde_json::json!({}));
        let result = self.rpc(request).await.map_err(McpError::ListTools)?;

        let listed: ToolsListResponse =
            serde_json::from_value(result).map_err(|e| McpError::ListTools(e.to_string()))?;
        debug!(count = listed.tools.len(), "Listed remote tools");
        Ok(listed.tools)
    }

    /// Invokes a named remote tool, connecting first if needed. Returns
    /// the raw structured result.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, McpError> {
        self.connect().await.map_err(|e| McpError::ToolCall {
            tool: name.to_string(),
            reason: e.to_string(),
        })?;

        let request = self.next_request(
            "tools/call",
            serde_json::json!({ "name": name, "arguments": arguments }),
        );

        debug!(tool = name, "Calling remote tool");
        self.rpc(request).await.map_err(|reason| McpError::ToolCall {
            tool: name.to_string(),
            reason,
        })
    }

    /// Best-effort close. Failures are logged, never returned, since this
    /// typically runs during cleanup on an already-degraded path.
    pub async fn disconnect(&mut self) {
        if self.http.take().is_some() {
            debug!(endpoint = %self.endpoint, "Disconnected from tool endpoint");
        }
    }

    fn connection_error(&self, reason: String) -> McpError {
        warn!(endpoint = %self.endpoint, %reason, "Connection failed");
        McpError::Connection {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }

    fn next_id(&self) -> u64 {
        self.message_id.fetch_add(1, Ordering::SeqCst)
    }

    fn next_request(&self, method: &str, params: Value) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params
        })
    }

    async fn rpc(&self, request: Value) -> Result<Value, String> {
        let client = self
            .http
            .as_ref()
            .ok_or_else(|| "not connected".to_string())?;
        Self::post_rpc(client, &self.endpoint, request).await
    }

    /// Posts one JSON-RPC request and extracts its `result`, folding HTTP
    /// status, remote `error` objects, and malformed envelopes into a
    /// reason string for the caller to classify.
    async fn post_rpc(
        client: &reqwest::Client,
        endpoint: &str,
        request: Value,
    ) -> Result<Value, String> {
        let response = client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, body));
        }

        let envelope: Value = response.json().await.map_err(|e| e.to_string())?;

        if let Some(error) = envelope.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(message);
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| "no result in response".to_string())
    }
}
