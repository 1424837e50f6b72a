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
use crate::gateway::agents::AgentRow;
use crate::middleware::RequireAdmin;
use crate::realtime::{ChangeEvent, RecordSet};
use crate::services::auth::hash_pin;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/agents", get(list_agents).put(replace_agents))
}

#[derive(Debug, Deserialize, Validate)]
struct AgentInput {
    #[validate(length(min = 1, max = 32, message = "agent code is required"))]
    code: String,
    #[validate(length(min = 1, max = 120, message = "agent name is required"))]
    name: String,
    phone: Option<String>,
    /// Новый PIN; без поля сохраняется прежний
    #[validate(length(min = 4, max = 12, message = "pin must be 4-12 characters"))]
    pin: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct ReplaceAgentsRequest {
    #[validate(nested)]
    agents: Vec<AgentInput>,
}

// GET /api/agents
async fn list_agents(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    Json(snapshot.agents.clone())
}

// PUT /api/agents
// Полная замена справочника.
async fn replace_agents(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Json(req): Json<ReplaceAgentsRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let mut seen = HashSet::new();
    for a in &req.agents {
        if !seen.insert(a.code.trim().to_lowercase()) {
            return Err(ApiError::Validation(format!("Duplicate agent code `{}`", a.code.trim())));
        }
    }

    let rows = tokio::task::spawn_blocking(move || {
        req.agents
            .into_iter()
            .map(|a| {
                let pin_hash = a.pin.as_deref().map(hash_pin).transpose()?;
                Ok::<_, bcrypt::BcryptError>(AgentRow {
                    code: a.code.trim().to_string(),
                    name: a.name.trim().to_string(),
                    phone: a.phone.filter(|p| !p.trim().is_empty()),
                    pin_hash,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let agents = state.gateway.replace_agents(rows).await?;
    tracing::info!("Agent list replaced ({} agents)", agents.len());
    state
        .feed
        .publish(ChangeEvent::Replaced { records: RecordSet::Agents(agents.clone()) })
        .await;
    Ok(Json(agents))
}
