use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::Booking;
use crate::services::auth::{Claims, Role};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.claims.role == Role::Admin
    }

    pub fn agent_code(&self) -> Option<&str> {
        self.claims.agent_code.as_deref()
    }

    /// Имя и код, под которыми агент подписывает брони и расходы.
    pub fn attribution(&self) -> (String, String) {
        match (&self.claims.agent_name, &self.claims.agent_code) {
            (Some(name), Some(code)) => (name.clone(), code.clone()),
            _ => ("Admin".to_string(), "ADMIN".to_string()),
        }
    }

    /// Агенту видны только собственные записи.
    pub fn can_access(&self, owner_code: &str) -> bool {
        self.is_admin() || self.agent_code().is_some_and(|c| c.eq_ignore_ascii_case(owner_code))
    }

    pub fn ensure_owns(&self, booking: &Booking) -> Result<(), ApiError> {
        if self.can_access(&booking.agent_code) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Booking belongs to another agent".to_string()))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return value.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    // Браузерный WebSocket не умеет ставить заголовки, токен приходит в ?token=
    parts.uri.query().and_then(|q| {
        serde_urlencoded::from_str::<Vec<(String, String)>>(q)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v)
    })
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state
            .auth
            .verify(&token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

        if state.cache.is_session_revoked(&claims.jti).await? {
            return Err(ApiError::Unauthorized("Session has been logged out".to_string()));
        }

        Ok(AuthUser { claims })
    }
}

/// Только администратор.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<Arc<crate::AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    fn user(role: Role, code: Option<&str>) -> AuthUser {
        AuthUser {
            claims: Claims {
                sub: code.unwrap_or("admin").to_string(),
                role,
                agent_code: code.map(str::to_string),
                agent_name: code.map(|_| "Karim".to_string()),
                jti: "j".into(),
                iat: 0,
                exp: 0,
            },
        }
    }

    #[test]
    fn token_from_header_or_query() {
        let p = parts(Request::builder().header("Authorization", "Bearer abc").body(()).unwrap());
        assert_eq!(bearer_token(&p).as_deref(), Some("abc"));

        let p = parts(Request::builder().uri("/api/ws?tables=bookings&token=xyz").body(()).unwrap());
        assert_eq!(bearer_token(&p).as_deref(), Some("xyz"));

        let p = parts(Request::builder().header("Authorization", "Basic abc").body(()).unwrap());
        assert_eq!(bearer_token(&p), None);
    }

    #[test]
    fn agents_only_reach_their_own_records() {
        let agent = user(Role::Agent, Some("KS101"));
        assert!(agent.can_access("ks101"));
        assert!(!agent.can_access("KS102"));
        assert!(user(Role::Admin, None).can_access("KS102"));
    }

    #[test]
    fn admin_attribution_falls_back() {
        assert_eq!(user(Role::Admin, None).attribution(), ("Admin".to_string(), "ADMIN".to_string()));
        assert_eq!(
            user(Role::Agent, Some("KS101")).attribution(),
            ("Karim".to_string(), "KS101".to_string())
        );
    }
}
