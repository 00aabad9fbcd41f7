pub mod audit;
pub mod auth;
pub mod board;
pub mod catalog;
pub mod config;
pub mod metrics;
pub mod queue;
pub mod teller;
pub mod testing;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditOrder,
    AuditRecord, AuditStore, AuditWriter, AuditWriterReport, SqliteAuditStore,
};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    Role, TrustedHeaderAuthenticator,
};
pub use board::{BoardEntry, BoardSnapshot};
pub use catalog::{CatalogError, StaticTransactionTypes, TransactionType, TransactionTypeCatalog};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod,
    BoardConfig, Config, ConfigError, DatabaseConfig, PublicConfig, QueueConfig, ServerConfig,
    TransactionTypeConfig,
};
pub use queue::{GrabOutcome, QueueError, QueueService};
pub use teller::{TellerSession, TellerSessions};
pub use ticket::{
    PriorityClass, QueueStats, SqliteTicketStore, Status, Step, Ticket, TicketError,
    TicketEvent, TicketFilter, TicketState, TicketStore,
};
