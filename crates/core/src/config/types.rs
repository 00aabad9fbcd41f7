use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::ticket::{SequencePolicy, SequenceReset, DEFAULT_SEQUENCE_POLICY, DEFAULT_SEQUENCE_RESET};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub transaction_types: Vec<TransactionTypeConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Header carrying the caller's user id (trusted_header only).
    #[serde(default = "default_user_header")]
    pub user_header: String,
    /// Header carrying the caller's role (trusted_header only).
    #[serde(default = "default_role_header")]
    pub role_header: String,
}

impl AuthConfig {
    pub fn new(method: AuthMethod) -> Self {
        Self {
            method,
            user_header: default_user_header(),
            role_header: default_role_header(),
        }
    }
}

fn default_user_header() -> String {
    "x-user-id".to_string()
}

fn default_role_header() -> String {
    "x-user-role".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Every caller is an anonymous administrator. Development only.
    None,
    /// Identity is asserted by an upstream gateway through request headers.
    TrustedHeader,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::TrustedHeader => "trusted_header",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pila.db")
}

/// Ticket numbering and dispatch settings
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct QueueConfig {
    #[serde(default = "default_sequence_policy")]
    pub sequence_policy: SequencePolicy,
    #[serde(default = "default_sequence_reset")]
    pub sequence_reset: SequenceReset,
    /// How many times a grab re-runs selection after losing a claim race.
    #[serde(default = "default_claim_max_attempts")]
    pub claim_max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            sequence_policy: default_sequence_policy(),
            sequence_reset: default_sequence_reset(),
            claim_max_attempts: default_claim_max_attempts(),
        }
    }
}

fn default_sequence_policy() -> SequencePolicy {
    DEFAULT_SEQUENCE_POLICY
}

fn default_sequence_reset() -> SequenceReset {
    DEFAULT_SEQUENCE_RESET
}

fn default_claim_max_attempts() -> u32 {
    3
}

/// Public display board limits
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct BoardConfig {
    #[serde(default = "default_serving_limit")]
    pub serving_limit: u32,
    #[serde(default = "default_waiting_limit")]
    pub waiting_limit: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            serving_limit: default_serving_limit(),
            waiting_limit: default_waiting_limit(),
        }
    }
}

fn default_serving_limit() -> u32 {
    20
}

fn default_waiting_limit() -> u32 {
    100
}

/// One entry of the transaction-type catalog
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransactionTypeConfig {
    pub id: i64,
    pub name: String,
}

/// Config view safe to return from the API (no filesystem paths)
#[derive(Debug, Clone, Serialize)]
pub struct PublicConfig {
    pub auth_method: String,
    pub queue: QueueConfig,
    pub board: BoardConfig,
    pub transaction_types: usize,
}

impl From<&Config> for PublicConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth_method: config.auth.method.as_str().to_string(),
            queue: config.queue,
            board: config.board,
            transaction_types: config.transaction_types.len(),
        }
    }
}
