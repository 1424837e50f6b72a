//! buses.rs
//!
//! Карта мест по турам и предварительный расчет стоимости брони.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::Bus;
use crate::services::pricing::{self, Derivation};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/buses", get(list_buses))
        .route("/buses/{tour}", get(get_bus))
        .route("/quote", get(quote))
}

#[derive(Debug, Serialize)]
struct BusesResponse {
    buses: Vec<Bus>,
    orphaned: usize,
    conflicts: usize,
    version: u64,
}

// GET /api/buses
async fn list_buses(State(state): State<Arc<AppState>>, _user: AuthUser) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    Json(BusesResponse {
        buses: snapshot.seat_map.buses.clone(),
        orphaned: snapshot.seat_map.orphaned.len(),
        conflicts: snapshot.seat_map.conflicts.len(),
        version: snapshot.version,
    })
}

// GET /api/buses/{tour}
async fn get_bus(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(tour): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = state.store.snapshot().await;
    let bus = snapshot
        .seat_map
        .bus(&tour)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Tour `{}` not found", tour)))?;
    Ok(Json(bus))
}

// GET /api/quote?tour=..&customer_type=..&discount=..&advance=..
#[derive(Debug, Deserialize, Validate)]
pub struct QuoteQuery {
    pub tour: String,
    pub customer_type: Option<String>,
    #[validate(range(min = 0, max = 10_000_000, message = "discount is out of range"))]
    #[serde(default)]
    pub discount: i64,
    #[validate(range(min = 0, max = 10_000_000, message = "advance is out of range"))]
    #[serde(default)]
    pub advance: i64,
}

async fn quote(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<Json<Derivation>> {
    q.validate()?;
    let snapshot = state.store.snapshot().await;
    let tour = snapshot
        .tour(&q.tour)
        .ok_or_else(|| ApiError::NotFound(format!("Tour `{}` not found", q.tour)))?;
    let type_fee = match q.customer_type.as_deref().filter(|c| !c.is_empty()) {
        Some(label) => {
            snapshot
                .customer_type(label)
                .ok_or_else(|| ApiError::Validation(format!("Unknown customer type `{}`", label)))?
                .fee
        }
        None => 0,
    };
    Ok(Json(pricing::derive(tour.fee, type_fee, q.discount, q.advance)?))
}
