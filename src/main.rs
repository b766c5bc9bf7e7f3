use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hubchat::prelude::*;

/// Resolve and execute one chat message against a GitHub MCP endpoint.
#[derive(Debug, Parser)]
#[command(name = "hubchat", version)]
struct Cli {
    /// The message to handle
    message: String,

    /// Tool-serving endpoint URL (overrides HUBCHAT_MCP_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Resolver strategy: pattern or model
    #[arg(long)]
    strategy: Option<ResolverStrategy>,

    /// GitHub token to act with, skipping the OAuth round trip
    /// (overrides GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(endpoint) = cli.endpoint {
        config.mcp_endpoint = endpoint;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }

    let credentials = CredentialStore::new();
    if let Some(token) = cli.token.or_else(|| std::env::var("GITHUB_TOKEN").ok()) {
        credentials
            .put("cli-user", CredentialRecord::new(token, "bearer", "repo"))
            .await;
    }

    let llm = match config.strategy {
        ResolverStrategy::Model => Some(LlmClientBuilder::new().build_openai()?),
        ResolverStrategy::Pattern => None,
    };

    let oauth = OauthFlow::new(config.oauth.clone())?;
    let agent = ChatAgent::new(config, credentials, oauth, llm);

    let reply = agent.handle("cli-user", &cli.message).await;
    if let Some(notice) = reply.notice {
        println!("{}", notice);
    }
    println!("{}", reply.text);

    Ok(())
}
