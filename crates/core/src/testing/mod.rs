//! Test support shared by unit tests, integration tests and the server crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use pila_core::testing::{fixtures, RacingTicketStore};
//!
//! let store = Arc::new(RacingTicketStore::new(fixtures::memory_store(), "rival"));
//! store.lose_next_claims(2);
//! let service = fixtures::service_with(store.clone(), QueueConfig::default());
//! ```

mod racing_store;

pub use racing_store::RacingTicketStore;

/// Catalog, config and service builders.
pub mod fixtures {
    use std::sync::Arc;

    use crate::catalog::StaticTransactionTypes;
    use crate::config::{AuthConfig, AuthMethod, BoardConfig, Config, QueueConfig, TransactionTypeConfig};
    use crate::queue::QueueService;
    use crate::ticket::{SequencePolicy, SqliteTicketStore, TicketStore};

    pub const GENERAL: i64 = 1;
    pub const PERMIT: i64 = 2;
    pub const CEDULA: i64 = 3;

    /// The three transaction types every fixture catalog knows.
    pub fn transaction_types() -> Vec<TransactionTypeConfig> {
        vec![
            TransactionTypeConfig {
                id: GENERAL,
                name: "General Inquiry".to_string(),
            },
            TransactionTypeConfig {
                id: PERMIT,
                name: "Business Permit".to_string(),
            },
            TransactionTypeConfig {
                id: CEDULA,
                name: "Cedula".to_string(),
            },
        ]
    }

    pub fn catalog() -> Arc<StaticTransactionTypes> {
        Arc::new(StaticTransactionTypes::from_config(&transaction_types()))
    }

    /// Config with auth disabled and the fixture catalog.
    pub fn config() -> Config {
        Config {
            auth: AuthConfig::new(AuthMethod::None),
            server: Default::default(),
            database: Default::default(),
            queue: QueueConfig::default(),
            board: BoardConfig::default(),
            transaction_types: transaction_types(),
        }
    }

    pub fn memory_store() -> Arc<SqliteTicketStore> {
        Arc::new(SqliteTicketStore::in_memory().expect("in-memory store"))
    }

    /// Service over a fresh in-memory store with default settings.
    pub fn service() -> QueueService {
        service_with(memory_store(), QueueConfig::default())
    }

    /// Service with numbers kept per lane.
    pub fn per_lane_service() -> QueueService {
        let queue = QueueConfig {
            sequence_policy: SequencePolicy::PerLane,
            ..QueueConfig::default()
        };
        service_with(memory_store(), queue)
    }

    pub fn service_with(store: Arc<dyn TicketStore>, queue: QueueConfig) -> QueueService {
        QueueService::new(store, catalog(), &queue, BoardConfig::default())
    }
}
