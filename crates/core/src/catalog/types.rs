use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TransactionTypeConfig;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// A service a client can queue for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionType {
    pub id: i64,
    pub name: String,
}

impl From<&TransactionTypeConfig> for TransactionType {
    fn from(config: &TransactionTypeConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.trim().to_string(),
        }
    }
}
