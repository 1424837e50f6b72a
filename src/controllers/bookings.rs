//! bookings.rs
//!
//! Брони пассажиров:
//! - создание с проверкой тура, места и типа клиента и с расчетом долга;
//! - список с фильтрами (агент видит только свои брони);
//! - редактирование, удаление и прием оплаты. `due` и `status` каждый раз
//!   пересчитываются на сервере, клиентские значения не принимаются.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::Ack;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Booking, PaymentStatus};
use crate::realtime::{ChangeEvent, Record, Table};
use crate::services::export::BookingFilter;
use crate::services::layout;
use crate::store::Snapshot;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/bookings/{id}/payments", post(record_payment))
}

/* ---------- helpers ---------- */

fn tour_fee(snapshot: &Snapshot, tour: &str) -> ApiResult<i64> {
    snapshot
        .tour(tour)
        .map(|t| t.fee)
        .ok_or_else(|| ApiError::Validation(format!("Unknown tour `{}`", tour)))
}

fn type_fee(snapshot: &Snapshot, label: Option<&str>) -> ApiResult<i64> {
    match label {
        Some(label) => snapshot
            .customer_type(label)
            .map(|c| c.fee)
            .ok_or_else(|| ApiError::Validation(format!("Unknown customer type `{}`", label))),
        None => Ok(0),
    }
}

/// Место должно быть в шаблоне и свободно (или занято этой же бронью).
fn check_seat(snapshot: &Snapshot, tour: &str, seat_id: &str, booking_id: Uuid) -> ApiResult<()> {
    if !layout::is_valid_seat(seat_id) {
        return Err(ApiError::Validation(format!("Seat `{}` does not exist", seat_id)));
    }
    let taken = snapshot
        .seat_map
        .bus(tour)
        .and_then(|bus| bus.seat(seat_id))
        .and_then(|seat| seat.booking.as_ref())
        .is_some_and(|holder| holder.id != booking_id);
    if taken {
        return Err(ApiError::Conflict(format!("Seat {} on {} is already booked", seat_id, tour)));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn load_owned(state: &AppState, user: &AuthUser, id: Uuid) -> ApiResult<Booking> {
    let booking = state
        .gateway
        .find_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;
    user.ensure_owns(&booking)?;
    Ok(booking)
}

async fn save(state: &AppState, booking: &Booking) -> ApiResult<Booking> {
    let saved = state.gateway.upsert_booking(booking).await?;
    state.feed.publish(ChangeEvent::upserted(Record::Booking(saved.clone()))).await;
    Ok(saved)
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    #[validate(length(min = 1, max = 120, message = "passenger name is required"))]
    passenger_name: String,
    #[validate(length(min = 5, max = 20, message = "mobile number looks wrong"))]
    mobile: String,
    address: Option<String>,
    nid: Option<String>,
    #[validate(length(min = 1, message = "tour is required"))]
    tour_name: String,
    customer_type: Option<String>,
    #[validate(length(min = 2, max = 3, message = "seat is required"))]
    seat_id: String,
    #[validate(range(min = 0, max = 10_000_000, message = "discount is out of range"))]
    #[serde(default)]
    discount: i64,
    #[validate(range(min = 0, max = 10_000_000, message = "advance is out of range"))]
    #[serde(default)]
    advance: i64,
    /// Только для администратора: оформить бронь от имени агента
    agent_code: Option<String>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let id = Uuid::new_v4();
    let seat_id = req.seat_id.trim().to_uppercase();
    let customer_type = non_empty(req.customer_type);

    let booking = {
        let snapshot = state.store.snapshot().await;
        let tour_fee = tour_fee(&snapshot, &req.tour_name)?;
        let type_fee = type_fee(&snapshot, customer_type.as_deref())?;
        check_seat(&snapshot, &req.tour_name, &seat_id, id)?;

        let (agent_name, agent_code) = match non_empty(req.agent_code) {
            Some(code) if user.is_admin() => {
                let agent = snapshot
                    .agents
                    .iter()
                    .find(|a| a.matches_code(&code))
                    .ok_or_else(|| ApiError::Validation(format!("Unknown agent `{}`", code)))?;
                (agent.name.clone(), agent.code.clone())
            }
            _ => user.attribution(),
        };

        let mut booking = Booking {
            id,
            passenger_name: req.passenger_name.trim().to_string(),
            mobile: req.mobile.trim().to_string(),
            address: non_empty(req.address),
            nid: non_empty(req.nid),
            tour_name: req.tour_name,
            customer_type,
            tour_fee,
            type_fee,
            discount: req.discount,
            advance: req.advance,
            due: 0,
            status: PaymentStatus::Due,
            seat_id,
            agent_name,
            agent_code,
            created_at: Utc::now(),
        };
        booking.rederive()?;
        booking
    };

    let saved = save(&state, &booking).await?;
    tracing::info!(
        "Booking {} created: {} seat {} by {} (due {})",
        saved.id, saved.tour_name, saved.seat_id, saved.agent_code, saved.due
    );
    Ok((StatusCode::CREATED, Json(saved)))
}

// GET /api/bookings?tour=&agent=&status=&q=
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<BookingFilter>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    let rows: Vec<Booking> = filter
        .apply(&snapshot.bookings)
        .into_iter()
        .filter(|b| user.can_access(&b.agent_code))
        .cloned()
        .collect();
    Json(rows)
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = state.store.snapshot().await;
    let booking = snapshot
        .booking(id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;
    user.ensure_owns(booking)?;
    Ok(Json(booking.clone()))
}

// PUT /api/bookings/{id}
// Частичное обновление: отсутствующие поля не меняются.
#[derive(Debug, Deserialize, Validate)]
struct UpdateBookingRequest {
    #[validate(length(min = 1, max = 120, message = "passenger name must not be empty"))]
    passenger_name: Option<String>,
    #[validate(length(min = 5, max = 20, message = "mobile number looks wrong"))]
    mobile: Option<String>,
    address: Option<String>,
    nid: Option<String>,
    tour_name: Option<String>,
    /// Пустая строка снимает тип клиента
    customer_type: Option<String>,
    seat_id: Option<String>,
    #[validate(range(min = 0, max = 10_000_000, message = "discount is out of range"))]
    discount: Option<i64>,
    #[validate(range(min = 0, max = 10_000_000, message = "advance is out of range"))]
    advance: Option<i64>,
}

async fn update_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let seat_id = req.seat_id.map(|s| s.trim().to_uppercase());
    let customer_type = req.customer_type.map(|c| non_empty(Some(c)));

    // цены и место сверяются со снимком, сама запись идет под блокировкой строки
    let (new_tour, new_type) = {
        let snapshot = state.store.snapshot().await;
        let current = snapshot
            .booking(id)
            .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;
        user.ensure_owns(current)?;

        // переезд в другой тур берет текущую цену нового тура
        let new_tour = match req.tour_name.filter(|t| *t != current.tour_name) {
            Some(tour) => Some((tour_fee(&snapshot, &tour)?, tour)),
            None => None,
        };
        let new_type = match customer_type {
            Some(label) => Some((type_fee(&snapshot, label.as_deref())?, label)),
            None => None,
        };
        let tour = new_tour.as_ref().map_or(current.tour_name.as_str(), |(_, t)| t.as_str());
        let seat = seat_id.as_deref().unwrap_or(current.seat_id.as_str());
        check_seat(&snapshot, tour, seat, id)?;
        (new_tour, new_type)
    };

    let saved = state
        .gateway
        .modify_booking(id, |booking| {
            user.ensure_owns(booking)?;
            if let Some(name) = req.passenger_name {
                booking.passenger_name = name.trim().to_string();
            }
            if let Some(mobile) = req.mobile {
                booking.mobile = mobile.trim().to_string();
            }
            if req.address.is_some() {
                booking.address = non_empty(req.address);
            }
            if req.nid.is_some() {
                booking.nid = non_empty(req.nid);
            }
            if let Some((fee, tour)) = new_tour {
                booking.tour_fee = fee;
                booking.tour_name = tour;
            }
            if let Some((fee, label)) = new_type {
                booking.type_fee = fee;
                booking.customer_type = label;
            }
            if let Some(seat) = seat_id {
                booking.seat_id = seat;
            }
            if !layout::is_valid_seat(&booking.seat_id) {
                return Err(ApiError::Validation(format!("Seat `{}` does not exist", booking.seat_id)));
            }
            if let Some(discount) = req.discount {
                booking.discount = discount;
            }
            if let Some(advance) = req.advance {
                booking.advance = advance;
            }
            booking.rederive()?;
            Ok::<_, ApiError>(())
        })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;

    state.feed.publish(ChangeEvent::upserted(Record::Booking(saved.clone()))).await;
    tracing::info!("Booking {} updated (due {}, {})", saved.id, saved.due, saved.status);
    Ok(Json(saved))
}

// DELETE /api/bookings/{id}
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let booking = load_owned(&state, &user, id).await?;
    if !state.gateway.delete_booking(id).await? {
        return Err(ApiError::NotFound(format!("Booking {} not found", id)));
    }

    tracing::info!("Booking {} cancelled, seat {} on {} released", id, booking.seat_id, booking.tour_name);
    state.feed.publish(ChangeEvent::deleted(Table::Bookings, id.to_string())).await;
    Ok(Json(Ack::ok()))
}

/* ---------- PAYMENTS ---------- */

// POST /api/bookings/{id}/payments
#[derive(Debug, Deserialize, Validate)]
struct PaymentRequest {
    #[validate(range(min = 1, max = 10_000_000, message = "payment amount is out of range"))]
    amount: i64,
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let saved = state
        .gateway
        .modify_booking(id, |booking| {
            user.ensure_owns(booking)?;
            booking.apply_payment(req.amount)?;
            Ok::<_, ApiError>(())
        })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", id)))?;

    state.feed.publish(ChangeEvent::upserted(Record::Booking(saved.clone()))).await;
    tracing::info!(
        "Payment of {} on booking {} (advance {}, due {}, {})",
        req.amount, saved.id, saved.advance, saved.due, saved.status
    );
    Ok(Json(saved))
}
