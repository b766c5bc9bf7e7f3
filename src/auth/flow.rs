use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::auth::store::CredentialRecord;

/// How long an issued state token stays redeemable.
const STATE_TTL_MINUTES: i64 = 10;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// Errors from the OAuth collaborator boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the code exchange
    #[error("Token exchange failed: {0}")]
    Exchange(String),
    /// A network error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// OAuth application settings.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Full callback URL registered with the provider
    pub callback_url: String,
}

#[derive(Debug, Clone)]
struct PendingState {
    user_id: String,
    issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    scope: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Issues authorize URLs and exchanges callback codes for credentials.
///
/// State tokens are bound to a user id, expire after ten minutes, and are
/// consumed on first use.
#[derive(Debug, Clone)]
pub struct OauthFlow {
    config: OauthConfig,
    exchange_client: reqwest::Client,
    user_client: reqwest::Client,
    pending: Arc<Mutex<HashMap<String, PendingState>>>,
}

impl OauthFlow {
    /// Builds the flow and its two HTTP clients: a 10 s one for the
    /// token exchange and a 5 s one for profile lookups.
    pub fn new(config: OauthConfig) -> Result<Self, AuthError> {
        let exchange_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()?;
        let user_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(5))
            .user_agent("hubchat")
            .build()?;

        Ok(Self {
            config,
            exchange_client,
            user_client,
            pending: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Issues a fresh state token bound to `user_id` and returns the
    /// provider authorize URL the user should visit.
    pub async fn authorize_url(&self, user_id: &str) -> String {
        let state = Uuid::new_v4().to_string();
        self.pending.lock().await.insert(
            state.clone(),
            PendingState {
                user_id: user_id.to_string(),
                issued_at: Utc::now(),
            },
        );
        debug!(user_id, "Issued OAuth state token");

        format!(
            "{}?client_id={}&redirect_uri={}&scope=repo%20read%3Auser&state={}",
            AUTHORIZE_URL, self.config.client_id, self.config.callback_url, state
        )
    }

    /// Redeems a state token, returning the bound user id. A token can be
    /// consumed once; expired or unknown tokens yield `None`.
    pub async fn consume_state(&self, state: &str) -> Option<String> {
        let entry = self.pending.lock().await.remove(state)?;
        if Utc::now() - entry.issued_at >= Duration::minutes(STATE_TTL_MINUTES) {
            debug!("Rejected expired OAuth state token");
            return None;
        }
        Some(entry.user_id)
    }

    /// Exchanges a callback code for a credential record.
    pub async fn exchange_code(&self, code: &str) -> Result<CredentialRecord, AuthError> {
        let response: TokenResponse = self
            .exchange_client
            .post(TOKEN_URL)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await?
            .json()
            .await?;

        match response.access_token {
            Some(token) => Ok(CredentialRecord::new(
                token,
                response.token_type,
                response.scope,
            )),
            None => Err(AuthError::Exchange(
                response
                    .error_description
                    .unwrap_or_else(|| "provider returned no access token".to_string()),
            )),
        }
    }

    /// Looks up the authenticated login for a token.
    pub async fn fetch_login(&self, access_token: &str) -> Result<String, AuthError> {
        let user: UserResponse = self
            .user_client
            .get(USER_URL)
            .bearer_auth(access_token)
            .send()
            .await?
            .json()
            .await?;
        Ok(user.login)
    }

    #[cfg(test)]
    async fn insert_state(&self, state: &str, user_id: &str, issued_at: DateTime<Utc>) {
        self.pending.lock().await.insert(
            state.to_string(),
            PendingState {
                user_id: user_id.to_string(),
                issued_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> OauthFlow {
        OauthFlow::new(OauthConfig {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            callback_url: "http://localhost:3000/auth/github/callback".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn construction_yields_configured_clients() {
        assert!(OauthFlow::new(OauthConfig {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            callback_url: "http://localhost:3000/auth/github/callback".to_string(),
        })
        .is_ok());
    }

    #[tokio::test]
    async fn authorize_url_carries_client_id_and_state() {
        let flow = flow();
        let url = flow.authorize_url("alice").await;
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state="));
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let flow = flow();
        let url = flow.authorize_url("alice").await;
        let state = url.rsplit("state=").next().unwrap().to_string();

        assert_eq!(flow.consume_state(&state).await.as_deref(), Some("alice"));
        assert!(flow.consume_state(&state).await.is_none());
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let flow = flow();
        assert!(flow.consume_state("nope").await.is_none());
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let flow = flow();
        flow.insert_state("old", "alice", Utc::now() - Duration::minutes(11))
            .await;
        assert!(flow.consume_state("old").await.is_none());
    }
}
