use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::middleware::RequireAdmin;
use crate::store::Outcome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/resync", post(resync))
}

#[derive(Debug, Serialize)]
struct ResyncResponse {
    applied: bool,
    version: u64,
    bookings: usize,
    orphaned: usize,
    conflicts: usize,
}

// POST /api/admin/resync
// Полная перезагрузка всех таблиц в память.
async fn resync(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.feed.resync().await?;
    tracing::info!("Manual resync by {}: {:?}", admin.claims.sub, outcome);

    let snapshot = state.store.snapshot().await;
    Ok(Json(ResyncResponse {
        applied: outcome == Outcome::Applied,
        version: snapshot.version,
        bookings: snapshot.bookings.len(),
        orphaned: snapshot.seat_map.orphaned.len(),
        conflicts: snapshot.seat_map.conflicts.len(),
    }))
}
