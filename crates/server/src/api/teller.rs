//! Teller workstation handlers.
//!
//! The acting teller is always the authenticated caller; request bodies never
//! name one.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use pila_core::{GrabOutcome, PriorityClass, Step, TellerSession};

use super::middleware::AuthUser;
use super::tickets::TicketResponse;
use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrabBody {
    pub step: Step,
    pub transaction_type: i64,
    /// Serve the priority lane instead of the regular one.
    #[serde(default)]
    pub is_priority: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub step: Step,
    /// Transaction type for step 2. Required at step 1.
    pub classification: Option<i64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StepBody {
    pub step: Step,
}

#[derive(Debug, Deserialize)]
pub struct OverrideBody {
    pub step: Step,
    /// Number as the client reads it, e.g. `7`, `0007` or `P0007`.
    pub ticket_number: String,
    /// Queue to look in; defaults to the teller's current filter.
    pub transaction_type: Option<i64>,
}

/// Claim the next ticket from the teller's chosen queue
pub async fn grab_next(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<GrabBody>,
) -> Result<Json<GrabOutcome>, ApiError> {
    user.require_step(body.step)?;
    let outcome = state.queue().grab_next(
        &user.0.user_id,
        body.step,
        body.transaction_type,
        PriorityClass::from_flag(body.is_priority),
    )?;
    Ok(Json(outcome))
}

/// Finish the teller's current ticket
pub async fn complete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CompleteBody>,
) -> Result<Json<TicketResponse>, ApiError> {
    user.require_step(body.step)?;
    let ticket = state.queue().complete_current(
        &user.0.user_id,
        body.step,
        body.classification,
        body.remarks,
    )?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// Mark the teller's current client as absent
pub async fn no_show(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<StepBody>,
) -> Result<Json<TicketResponse>, ApiError> {
    user.require_step(body.step)?;
    let ticket = state.queue().mark_no_show(&user.0.user_id, body.step)?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// Put a no-show ticket back in line by its number
pub async fn manual_override(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<OverrideBody>,
) -> Result<Json<TicketResponse>, ApiError> {
    user.require_step(body.step)?;
    let ticket = state.queue().manual_override(
        &user.0.user_id,
        body.step,
        &body.ticket_number,
        body.transaction_type,
    )?;
    Ok(Json(TicketResponse::from(ticket)))
}

/// Clear the teller's filters and current ticket
pub async fn reset(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.queue().reset_session(&user.0.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Json<TellerSession> {
    Json(state.queue().session(&user.0.user_id))
}
