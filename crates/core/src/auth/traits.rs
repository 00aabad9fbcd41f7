use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    /// No identity was presented at all.
    #[error("Authentication required")]
    NotAuthenticated,

    /// An identity was presented but cannot be accepted, e.g. an unknown role.
    #[error("Invalid identity: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Resolves the teller (or administrator) behind a request.
///
/// The returned [`Identity`] carries the role that decides which step the
/// caller may work.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name reported in logs and the public config view
    fn method_name(&self) -> &'static str;
}
