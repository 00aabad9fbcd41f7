//! Identity asserted by an upstream gateway.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity, Role};

/// Authenticator that reads the caller's user id and role from request headers.
///
/// The gateway in front of the server is responsible for authenticating the
/// user and must strip these headers from client requests.
pub struct TrustedHeaderAuthenticator {
    user_header: String,
    role_header: String,
}

impl TrustedHeaderAuthenticator {
    pub fn new(user_header: &str, role_header: &str) -> Self {
        Self {
            user_header: user_header.trim().to_ascii_lowercase(),
            role_header: role_header.trim().to_ascii_lowercase(),
        }
    }

    fn header<'a>(request: &'a AuthRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl Authenticator for TrustedHeaderAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let user_id = Self::header(request, &self.user_header).ok_or(AuthError::NotAuthenticated)?;

        let role: Role = Self::header(request, &self.role_header)
            .ok_or_else(|| AuthError::InvalidCredentials("missing role".to_string()))?
            .parse()
            .map_err(AuthError::InvalidCredentials)?;

        Ok(Identity {
            user_id: user_id.to_string(),
            role,
            method: "trusted_header".to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "trusted_header"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    fn authenticator() -> TrustedHeaderAuthenticator {
        TrustedHeaderAuthenticator::new("X-User-Id", "X-User-Role")
    }

    #[tokio::test]
    async fn test_valid_headers() {
        let request = make_request(vec![("X-User-Id", "teller-1"), ("X-User-Role", "Teller-Step1")]);

        let identity = authenticator().authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "teller-1");
        assert_eq!(identity.role, Role::TellerStep1);
        assert_eq!(identity.method, "trusted_header");
    }

    #[tokio::test]
    async fn test_missing_user_header() {
        let request = make_request(vec![("X-User-Role", "Administrator")]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_blank_user_header() {
        let request = make_request(vec![("X-User-Id", "  "), ("X-User-Role", "Administrator")]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let request = make_request(vec![("X-User-Id", "teller-1"), ("X-User-Role", "Janitor")]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_role() {
        let request = make_request(vec![("X-User-Id", "teller-1")]);
        let result = authenticator().authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn test_method_name() {
        assert_eq!(authenticator().method_name(), "trusted_header");
    }
}
