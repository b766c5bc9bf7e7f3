pub mod flow;
pub mod store;

pub use flow::{AuthError, OauthConfig, OauthFlow};
pub use store::{CredentialRecord, CredentialStore};
