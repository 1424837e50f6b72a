use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub tickets: TicketConfig,
    pub sync: SyncConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis: канал изменений для realtime
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub change_channel: String,
}

// Настройки сессий
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub expires_in_hours: i64,
    /// bcrypt-хеш пароля администратора
    pub admin_password_hash: String,
}

// Настройки печати билетов
#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    pub qr_endpoint: String,
    pub qr_size: String,
    pub operator_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Период полной пересинхронизации; 0 отключает
    pub resync_interval_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn or_default(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    or_default(key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "tour_booking=debug,tower_http=debug"),
                log_format: parsed("LOG_FORMAT", "pretty")?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                change_channel: or_default("CHANGE_CHANNEL", "tour_booking:changes"),
            },
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                expires_in_hours: parsed("JWT_EXPIRES_IN_HOURS", "12")?,
                admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
            },
            tickets: TicketConfig {
                qr_endpoint: or_default("QR_ENDPOINT", "https://api.qrserver.com/v1/create-qr-code/"),
                qr_size: or_default("QR_SIZE", "120x120"),
                operator_name: or_default("OPERATOR_NAME", "Tour Booking"),
            },
            sync: SyncConfig {
                resync_interval_secs: parsed("RESYNC_INTERVAL_SECS", "300")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
