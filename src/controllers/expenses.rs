use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::Ack;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::expense::{canonical_category, EXPENSE_CATEGORIES};
use crate::models::Expense;
use crate::realtime::{ChangeEvent, Record, Table};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/{id}", put(update_expense).delete(delete_expense))
}

#[derive(Debug, Deserialize, Validate)]
struct ExpenseRequest {
    #[validate(length(min = 1, message = "category is required"))]
    category: String,
    #[validate(range(min = 1, max = 10_000_000, message = "amount is out of range"))]
    amount: i64,
    #[serde(default)]
    description: String,
    /// По умолчанию сегодняшняя дата
    date: Option<NaiveDate>,
    tour_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExpenseQuery {
    tour: Option<String>,
    agent: Option<String>,
    category: Option<String>,
}

fn category(raw: &str) -> ApiResult<&'static str> {
    canonical_category(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "Unknown category `{}`, expected one of {}",
            raw,
            EXPENSE_CATEGORIES.join(", ")
        ))
    })
}

async fn check_tour(state: &AppState, tour: Option<&str>) -> ApiResult<()> {
    if let Some(tour) = tour {
        if state.store.snapshot().await.tour(tour).is_none() {
            return Err(ApiError::Validation(format!("Unknown tour `{}`", tour)));
        }
    }
    Ok(())
}

fn tour_of(req: &ExpenseRequest) -> Option<String> {
    req.tour_name.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

// GET /api/expenses?tour=&agent=&category=
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(q): Query<ExpenseQuery>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    let rows: Vec<Expense> = snapshot
        .expenses
        .iter()
        .filter(|e| user.can_access(&e.agent_code))
        .filter(|e| q.tour.as_deref().is_none_or(|t| e.tour_name.as_deref() == Some(t)))
        .filter(|e| q.agent.as_deref().is_none_or(|a| e.agent_code.eq_ignore_ascii_case(a)))
        .filter(|e| q.category.as_deref().is_none_or(|c| e.category.eq_ignore_ascii_case(c)))
        .cloned()
        .collect();
    Json(rows)
}

// POST /api/expenses
async fn create_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let category = category(&req.category)?;
    let tour_name = tour_of(&req);
    check_tour(&state, tour_name.as_deref()).await?;

    let (agent_name, agent_code) = user.attribution();
    let expense = Expense {
        id: Uuid::new_v4(),
        category: category.to_string(),
        amount: req.amount,
        description: req.description.trim().to_string(),
        date: req.date.unwrap_or_else(|| Utc::now().date_naive()),
        agent_code,
        agent_name,
        tour_name,
        created_at: Utc::now(),
    };

    let saved = state.gateway.upsert_expense(&expense).await?;
    tracing::info!("Expense {} logged: {} {} by {}", saved.id, saved.category, saved.amount, saved.agent_code);
    state.feed.publish(ChangeEvent::upserted(Record::Expense(saved.clone()))).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

// PUT /api/expenses/{id}
async fn update_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let category = category(&req.category)?;
    let tour_name = tour_of(&req);
    check_tour(&state, tour_name.as_deref()).await?;

    let mut expense = state
        .store
        .snapshot()
        .await
        .expense(id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Expense {} not found", id)))?;
    if !user.can_access(&expense.agent_code) {
        return Err(ApiError::Forbidden("Expense belongs to another agent".to_string()));
    }

    expense.category = category.to_string();
    expense.amount = req.amount;
    expense.description = req.description.trim().to_string();
    if let Some(date) = req.date {
        expense.date = date;
    }
    expense.tour_name = tour_name;

    let saved = state.gateway.upsert_expense(&expense).await?;
    state.feed.publish(ChangeEvent::upserted(Record::Expense(saved.clone()))).await;
    Ok(Json(saved))
}

// DELETE /api/expenses/{id}
async fn delete_expense(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let owner = state
        .store
        .snapshot()
        .await
        .expense(id)
        .map(|e| e.agent_code.clone())
        .ok_or_else(|| ApiError::NotFound(format!("Expense {} not found", id)))?;
    if !user.can_access(&owner) {
        return Err(ApiError::Forbidden("Expense belongs to another agent".to_string()));
    }
    if !state.gateway.delete_expense(id).await? {
        return Err(ApiError::NotFound(format!("Expense {} not found", id)));
    }

    state.feed.publish(ChangeEvent::deleted(Table::Expenses, id.to_string())).await;
    Ok(Json(Ack::ok()))
}
