use crate::auth::OauthConfig;

/// Which intent-resolution algorithm the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverStrategy {
    /// Keyword/pattern matching over a fixed set of intent categories
    #[default]
    Pattern,
    /// Delegate the decision to a language model returning structured JSON
    Model,
}

impl std::str::FromStr for ResolverStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" => Ok(Self::Pattern),
            "model" | "llm" => Ok(Self::Model),
            other => Err(format!("unknown resolver strategy: {}", other)),
        }
    }
}

/// Deployment configuration consumed by the core pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tool-serving endpoint URL
    pub mcp_endpoint: String,
    /// Optional default repository owner used when the user names none
    pub default_owner: Option<String>,
    /// Optional default repository name used when the user names none
    pub default_repo: Option<String>,
    pub strategy: ResolverStrategy,
    pub oauth: OauthConfig,
}

impl Config {
    /// Reads configuration from the environment. Missing optional values
    /// stay unset; the default repository is only honored when both owner
    /// and name are present.
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            mcp_endpoint: env("HUBCHAT_MCP_ENDPOINT")
                .unwrap_or_else(|| "https://api.githubcopilot.com/mcp/".to_string()),
            default_owner: env("GITHUB_DEFAULT_OWNER"),
            default_repo: env("GITHUB_DEFAULT_REPO"),
            strategy: env("HUBCHAT_RESOLVER")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            oauth: OauthConfig {
                client_id: env("GITHUB_CLIENT_ID").unwrap_or_default(),
                client_secret: env("GITHUB_CLIENT_SECRET").unwrap_or_default(),
                callback_url: env("HUBCHAT_CALLBACK_URL")
                    .unwrap_or_else(|| "http://localhost:3000/auth/github/callback".to_string()),
            },
        }
    }

    /// The configured default repository, only when both halves are set.
    pub fn default_repository(&self) -> Option<(String, String)> {
        match (&self.default_owner, &self.default_repo) {
            (Some(owner), Some(repo)) => Some((owner.clone(), repo.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_known_names() {
        assert_eq!(
            "pattern".parse::<ResolverStrategy>().unwrap(),
            ResolverStrategy::Pattern
        );
        assert_eq!(
            "Model".parse::<ResolverStrategy>().unwrap(),
            ResolverStrategy::Model
        );
        assert!("magic".parse::<ResolverStrategy>().is_err());
    }

    #[test]
    fn default_repository_requires_both_halves() {
        let mut config = Config {
            mcp_endpoint: "https://api.example.com/mcp".to_string(),
            default_owner: Some("octocat".to_string()),
            default_repo: None,
            strategy: ResolverStrategy::Pattern,
            oauth: OauthConfig {
                client_id: String::new(),
                client_secret: String::new(),
                callback_url: String::new(),
            },
        };
        assert!(config.default_repository().is_none());

        config.default_repo = Some("hello-world".to_string());
        assert_eq!(
            config.default_repository(),
            Some(("octocat".to_string(), "hello-world".to_string()))
        );
    }
}
