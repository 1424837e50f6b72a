use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, RequireAdmin};
use crate::models::CustomerType;
use crate::realtime::{ChangeEvent, RecordSet};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/customer-types", get(list_customer_types).put(replace_customer_types))
}

#[derive(Debug, Deserialize, Validate)]
struct CustomerTypeInput {
    #[validate(length(min = 1, max = 60, message = "label is required"))]
    label: String,
    #[validate(range(min = 0, max = 10_000_000, message = "fee is out of range"))]
    fee: i64,
}

#[derive(Debug, Deserialize, Validate)]
struct ReplaceCustomerTypesRequest {
    #[validate(nested)]
    types: Vec<CustomerTypeInput>,
}

// GET /api/customer-types
async fn list_customer_types(State(state): State<Arc<AppState>>, _user: AuthUser) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    Json(snapshot.customer_types.clone())
}

// PUT /api/customer-types
async fn replace_customer_types(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(req): Json<ReplaceCustomerTypesRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let mut seen = HashSet::new();
    let mut types = Vec::with_capacity(req.types.len());
    for t in req.types {
        let label = t.label.trim().to_string();
        if !seen.insert(label.clone()) {
            return Err(ApiError::Validation(format!("Duplicate customer type `{}`", label)));
        }
        types.push(CustomerType { label, fee: t.fee });
    }

    let types = state.gateway.replace_customer_types(types).await?;
    state
        .feed
        .publish(ChangeEvent::Replaced { records: RecordSet::CustomerTypes(types.clone()) })
        .await;
    Ok(Json(types))
}
