use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Тарифная надбавка (Student, VIP, Child...) - фиксированная сумма к цене тура
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CustomerType {
    pub label: String,
    pub fee: i64,
}
