use std::collections::HashSet;

use super::{types::Config, AuthMethod, ConfigError};

/// Largest list the board may be configured to return.
const MAX_BOARD_LIMIT: u32 = 1000;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Trusted-header names are present when that auth method is selected
/// - Claim retries and board limits are within range
/// - Transaction type ids are unique and names non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::TrustedHeader
        && (config.auth.user_header.trim().is_empty() || config.auth.role_header.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.user_header and auth.role_header must be set for trusted_header".to_string(),
        ));
    }

    if config.queue.claim_max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "queue.claim_max_attempts must be at least 1".to_string(),
        ));
    }

    for (name, value) in [
        ("board.serving_limit", config.board.serving_limit),
        ("board.waiting_limit", config.board.waiting_limit),
    ] {
        if value == 0 || value > MAX_BOARD_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 1 and {}",
                name, MAX_BOARD_LIMIT
            )));
        }
    }

    let mut seen = HashSet::new();
    for tt in &config.transaction_types {
        if tt.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "transaction type {} has an empty name",
                tt.id
            )));
        }
        if !seen.insert(tt.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate transaction type id {}",
                tt.id
            )));
        }
    }

    Ok(())
}
