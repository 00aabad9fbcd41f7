use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pila_core::{
    config_path, create_audit_system, create_authenticator, load_config, validate_config,
    AuditEvent, AuditStore, Authenticator, QueueService, SqliteAuditStore, SqliteTicketStore,
    StaticTransactionTypes, TicketStore, TransactionTypeCatalog,
};
use pila_server::api::create_router;
use pila_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = config_path();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);
    info!(
        "Numbering: {:?}, reset {:?}",
        config.queue.sequence_policy, config.queue.sequence_reset
    );

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite audit store
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Audit store initialized");

    // Create SQLite ticket store
    let ticket_store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::new(&config.database.path).context("Failed to create ticket store")?,
    );
    info!("Ticket store initialized");

    // Transaction types come from config
    let catalog: Arc<dyn TransactionTypeCatalog> =
        Arc::new(StaticTransactionTypes::from_config(&config.transaction_types));
    info!(
        "Loaded {} transaction types",
        config.transaction_types.len()
    );

    // Create audit system
    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);

    // Spawn audit writer task
    let writer_handle = tokio::spawn(audit_writer.run());

    // Emit ServiceStarted event
    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let queue = QueueService::new(ticket_store, catalog, &config.queue, config.board)
        .with_audit(audit_handle.clone());

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), authenticator, queue));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Emit ServiceStopped event
    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The router (and the queue's handle clone) is gone once serve returns.
    // Dropping the last handle closes the writer's channel.
    drop(audit_handle);

    // Wait for writer to finish processing remaining events
    match writer_handle.await {
        Ok(report) => info!(
            written = report.written,
            failed = report.failed,
            "Audit writer stopped"
        ),
        Err(e) => error!("Audit writer task failed: {}", e),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
