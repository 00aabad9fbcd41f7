mod none;
mod traits;
mod trusted_header;
mod types;

pub use none::*;
pub use traits::*;
pub use trusted_header::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::TrustedHeader => {
            if config.user_header.trim().is_empty() || config.role_header.trim().is_empty() {
                return Err(AuthError::ConfigurationError(
                    "user_header and role_header must be set when using trusted_header auth"
                        .to_string(),
                ));
            }
            Ok(Box::new(TrustedHeaderAuthenticator::new(
                &config.user_header,
                &config.role_header,
            )))
        }
    }
}
