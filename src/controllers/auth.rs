//! auth.rs
//!
//! Вход администратора и агентов, выход и информация о текущей сессии.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::controllers::Ack;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::services::auth::{AuthError, Claims};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/admin", post(login_admin))
        .route("/auth/agent", post(login_agent))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/* ---------- helpers ---------- */

fn login_error(e: AuthError) -> ApiError {
    match e {
        AuthError::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".to_string()),
        other => ApiError::Internal(other.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    #[serde(flatten)]
    session: Claims,
}

/* ---------- LOGIN ---------- */

// POST /api/auth/admin
#[derive(Debug, Deserialize, Validate)]
struct AdminLoginRequest {
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

async fn login_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    // bcrypt медленный, не держим на нем рабочий поток рантайма
    let auth = state.auth.clone();
    let (token, session) = tokio::task::spawn_blocking(move || auth.login_admin(&req.password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(login_error)?;

    tracing::info!("Admin signed in");
    Ok((StatusCode::OK, Json(LoginResponse { token, session })))
}

// POST /api/auth/agent
#[derive(Debug, Deserialize, Validate)]
struct AgentLoginRequest {
    #[validate(length(min = 1, max = 32, message = "agent code is required"))]
    code: String,
    pin: Option<String>,
}

async fn login_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentLoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let agent = state.gateway.find_agent_by_code(&req.code).await?;
    let auth = state.auth.clone();
    let (token, session) =
        tokio::task::spawn_blocking(move || auth.login_agent(agent.as_ref(), req.pin.as_deref()))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|e| {
                tracing::warn!("Agent login rejected for code {}", req.code);
                login_error(e)
            })?;

    tracing::info!("Agent {} signed in", session.sub);
    Ok((StatusCode::OK, Json(LoginResponse { token, session })))
}

/* ---------- SESSION ---------- */

// POST /api/auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let ttl = (user.claims.exp - Utc::now().timestamp()).max(1) as u64;
    state.cache.revoke_session(&user.claims.jti, ttl).await?;
    Ok(Json(Ack::ok()))
}

// GET /api/auth/me
async fn me(user: AuthUser) -> impl IntoResponse {
    Json(user.claims)
}
