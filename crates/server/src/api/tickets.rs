//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pila_core::{Status, Step, Ticket, TicketFilter};

use super::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for issuing a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub transaction_type: i64,
    #[serde(default)]
    pub is_priority: bool,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// Filter by status (`waiting`, `serving`, `no_show`, `done`)
    pub status: Option<String>,
    /// Filter by step (1 or 2)
    pub step: Option<u8>,
    /// Filter by the transaction type the ticket is queued under
    pub transaction_type: Option<i64>,
    /// Maximum number of tickets to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// A ticket with its printed code.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub display_code: String,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            display_code: ticket.display_code(),
            ticket,
        }
    }
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Issue a new ticket at the intake kiosk
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let ticket = state
        .queue()
        .create_ticket(body.transaction_type, body.is_priority)?;
    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = state.queue().get_ticket(id)?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// List tickets with optional filters
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status: Status = status
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("{}", e)))?;
        filter = filter.with_status(status);
    }

    if let Some(step) = params.step {
        let step = Step::try_from(step).map_err(|e| ApiError::BadRequest(format!("{}", e)))?;
        filter = filter.with_step(step);
    }

    if let Some(transaction_type) = params.transaction_type {
        filter = filter.with_transaction_type(transaction_type);
    }

    let tickets = state.queue().list_tickets(&filter)?;

    // Total ignores pagination
    let count_filter = TicketFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };
    let total = state.queue().count_tickets(&count_filter)?;

    Ok(Json(ListTicketsResponse {
        tickets: tickets.into_iter().map(TicketResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}
