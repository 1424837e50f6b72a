use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::controllers::Ack;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, RequireAdmin};
use crate::realtime::{ChangeEvent, Record, Table};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tours", get(list_tours).post(create_tour))
        .route("/tours/{name}", put(update_tour).delete(delete_tour))
}

#[derive(Debug, Deserialize, Validate)]
struct TourRequest {
    #[validate(length(min = 1, max = 120, message = "tour name is required"))]
    name: String,
    #[validate(range(min = 0, max = 10_000_000, message = "fee is out of range"))]
    fee: i64,
    departure: Option<NaiveDate>,
}

// GET /api/tours
async fn list_tours(State(state): State<Arc<AppState>>, _user: AuthUser) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    Json(snapshot.tours.clone())
}

// POST /api/tours
async fn create_tour(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(req): Json<TourRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let name = req.name.trim();
    if state.store.snapshot().await.tour(name).is_some() {
        return Err(ApiError::Conflict(format!("Tour `{}` already exists", name)));
    }

    let tour = state.gateway.upsert_tour(name, req.fee, req.departure).await?;
    tracing::info!("Tour {} created with fee {}", tour.name, tour.fee);
    state.feed.publish(ChangeEvent::upserted(Record::Tour(tour.clone()))).await;
    Ok((StatusCode::CREATED, Json(tour)))
}

// PUT /api/tours/{name}
// Смена имени переносит брони и расходы на новое имя.
async fn update_tour(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(name): Path<String>,
    Json(req): Json<TourRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let new_name = req.name.trim();

    if new_name == name {
        if state.store.snapshot().await.tour(&name).is_none() {
            return Err(ApiError::NotFound(format!("Tour `{}` not found", name)));
        }
        let tour = state.gateway.upsert_tour(&name, req.fee, req.departure).await?;
        state.feed.publish(ChangeEvent::upserted(Record::Tour(tour.clone()))).await;
        return Ok(Json(tour));
    }

    if state.store.snapshot().await.tour(new_name).is_some() {
        return Err(ApiError::Conflict(format!("Tour `{}` already exists", new_name)));
    }
    let tour = state
        .gateway
        .rename_tour(&name, new_name, req.fee, req.departure)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tour `{}` not found", name)))?;

    state
        .feed
        .publish(ChangeEvent::TourRenamed { from: name, tour: tour.clone() })
        .await;
    Ok(Json(tour))
}

// DELETE /api/tours/{name}
async fn delete_tour(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let booked = state.gateway.count_bookings_for_tour(&name).await?;
    if booked > 0 {
        return Err(ApiError::Conflict(format!(
            "Tour `{}` still has {} bookings",
            name, booked
        )));
    }
    if !state.gateway.delete_tour(&name).await? {
        return Err(ApiError::NotFound(format!("Tour `{}` not found", name)));
    }

    tracing::info!("Tour {} deleted", name);
    state.feed.publish(ChangeEvent::deleted(Table::Tours, name)).await;
    Ok(Json(Ack::ok()))
}
