use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::Booking;
use crate::services::tickets;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/{id}", get(single_ticket))
        .route("/tickets/batch", post(batch_tickets))
}

// GET /api/tickets/{id}
async fn single_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = state.store.snapshot().await;
    let booking = snapshot
        .booking(id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;
    user.ensure_owns(booking)?;
    Ok(Html(tickets::render_single(&state.config.tickets, booking)))
}

// POST /api/tickets/batch
// Порядок билетов совпадает с порядком id в запросе.
#[derive(Debug, Deserialize, Validate)]
struct BatchRequest {
    #[validate(length(min = 1, max = 400, message = "between 1 and 400 bookings per batch"))]
    ids: Vec<Uuid>,
}

async fn batch_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BatchRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let snapshot = state.store.snapshot().await;

    let mut selected: Vec<&Booking> = Vec::with_capacity(req.ids.len());
    for id in &req.ids {
        let booking = snapshot
            .booking(*id)
            .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;
        user.ensure_owns(booking)?;
        selected.push(booking);
    }

    tracing::debug!("Rendering {} tickets on {} pages", selected.len(), tickets::page_count(selected.len()));
    Ok(Html(tickets::render_batch(&state.config.tickets, &selected)))
}
