//! reports.rs
//!
//! Сводный отчет для администратора и CSV-выгрузка броней.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, RequireAdmin};
use crate::services::export::{self, BookingFilter};
use crate::services::reports::{self, ReportQuery};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/export/bookings.csv", get(export_bookings))
}

// GET /api/reports/summary?tour=&from=&to=
async fn summary(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(q): Query<ReportQuery>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    Json(reports::summarize(&snapshot.tours, &snapshot.bookings, &snapshot.expenses, &q))
}

// GET /api/export/bookings.csv?tour=&agent=&status=&q=
async fn export_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<BookingFilter>,
) -> ApiResult<impl IntoResponse> {
    let csv = {
        let snapshot = state.store.snapshot().await;
        let rows = filter
            .apply(&snapshot.bookings)
            .into_iter()
            .filter(|b| user.can_access(&b.agent_code));
        export::bookings_csv(rows)
            .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?
    };

    let filename = export::export_filename(filter.tour.as_deref(), Utc::now().date_naive());
    tracing::debug!("Exporting {} ({} bytes)", filename, csv.len());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        csv,
    ))
}
