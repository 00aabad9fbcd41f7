//! Public display board.

use axum::{extract::State, Json};
use std::sync::Arc;

use pila_core::BoardSnapshot;

use super::ApiError;
use crate::state::AppState;

/// Tickets being served and waiting, for the lobby screens. No auth required.
pub async fn get_board(State(state): State<Arc<AppState>>) -> Result<Json<BoardSnapshot>, ApiError> {
    Ok(Json(state.queue().board_snapshot()?))
}
