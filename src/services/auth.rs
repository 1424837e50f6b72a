//! auth.rs
//!
//! Вход администратора (пароль против bcrypt-хеша из конфига) и агента
//! (код без учета регистра плюс, если задан, персональный PIN). Успешный вход
//! выдает подписанный JWT; сервер проверяет подпись и срок на каждом запросе,
//! а выход отзывает токен по его `jti`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub agent_code: Option<String>,
    pub agent_name: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("password hash check failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    admin_password_hash: String,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::hours(config.expires_in_hours),
            admin_password_hash: config.admin_password_hash.clone(),
        }
    }

    pub fn login_admin(&self, password: &str) -> Result<(String, Claims), AuthError> {
        if !bcrypt::verify(password, &self.admin_password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue("admin".to_string(), Role::Admin, None)
    }

    /// `agent` - результат поиска по коду без учета регистра.
    pub fn login_agent(&self, agent: Option<&Agent>, pin: Option<&str>) -> Result<(String, Claims), AuthError> {
        let agent = agent.ok_or(AuthError::InvalidCredentials)?;
        if let Some(hash) = &agent.pin_hash {
            let pin = pin.ok_or(AuthError::InvalidCredentials)?;
            if !bcrypt::verify(pin, hash)? {
                return Err(AuthError::InvalidCredentials);
            }
        }
        self.issue(agent.code.clone(), Role::Agent, Some(agent))
    }

    fn issue(&self, sub: String, role: Role, agent: Option<&Agent>) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            role,
            agent_code: agent.map(|a| a.code.clone()),
            agent_name: agent.map(|a| a.name.clone()),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

pub fn hash_pin(pin: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(pin, bcrypt::DEFAULT_COST)
}
