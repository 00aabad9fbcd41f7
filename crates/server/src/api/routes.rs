use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{board, handlers, teller, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Authenticated API routes
    let api_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/transaction-types", get(handlers::transaction_types))
        .route("/stats", get(handlers::stats))
        // Tickets
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        // Teller workstation
        .route("/teller/grab", post(teller::grab_next))
        .route("/teller/complete", post(teller::complete))
        .route("/teller/no-show", post(teller::no_show))
        .route("/teller/override", post(teller::manual_override))
        .route("/teller/reset", post(teller::reset))
        .route("/teller/session", get(teller::get_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Public
        .route("/health", get(handlers::health))
        .route("/board", get(board::get_board));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
