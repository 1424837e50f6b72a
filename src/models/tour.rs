use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Тур: имя уникально и одновременно служит идентификатором автобуса
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Tour {
    pub name: String,
    pub fee: i64,
    pub departure: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}
