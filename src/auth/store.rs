use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum age of a stored credential before re-authentication is required.
const MAX_CREDENTIAL_AGE_DAYS: i64 = 30;

/// An OAuth access token plus metadata, scoped to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// The bearer token used against the tool-serving endpoint
    pub access_token: String,
    /// Token type as reported by the provider (typically "bearer")
    pub token_type: String,
    /// Space-separated scopes granted to the token
    pub scope: String,
    /// When the token was obtained
    pub obtained_at: DateTime<Utc>,
    /// The login this token authenticates as, once resolved
    #[serde(default)]
    pub login: Option<String>,
}

impl CredentialRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            scope: scope.into(),
            obtained_at: Utc::now(),
            login: None,
        }
    }

    /// Attaches the resolved login.
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }
}

/// Shared store of per-user credentials.
///
/// The only cross-message state in the pipeline. Records are replaced
/// wholesale, never patched, so per-key updates need no coordination
/// beyond the map lock itself.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for a user, if one is stored. Absence is a
    /// normal outcome, not a failure.
    pub async fn get(&self, user_id: &str) -> Option<CredentialRecord> {
        self.records.read().await.get(user_id).cloned()
    }

    /// Stores or replaces the record for a user.
    pub async fn put(&self, user_id: impl Into<String>, record: CredentialRecord) {
        self.records.write().await.insert(user_id.into(), record);
    }

    /// Removes the record for a user.
    pub async fn delete(&self, user_id: &str) {
        self.records.write().await.remove(user_id);
    }

    /// A record is valid iff it is younger than 30 days.
    pub fn is_valid(record: &CredentialRecord) -> bool {
        Utc::now() - record.obtained_at < Duration::days(MAX_CREDENTIAL_AGE_DAYS)
    }

    /// Returns the record for a user only if it passes the age check.
    pub async fn valid_record(&self, user_id: &str) -> Option<CredentialRecord> {
        self.get(user_id).await.filter(Self::is_valid)
    }
}
