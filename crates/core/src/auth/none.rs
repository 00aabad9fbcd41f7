use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Treats every caller as the anonymous administrator. All workstations then
/// share one teller session, so this is only for local development and has to
/// be selected explicitly with `method = "none"`.
#[derive(Default)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
