use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Допустимые категории расходов.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Fuel", "Food", "Hotel", "Driver", "Guide", "Toll", "Ticket", "Other",
];

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub category: String,
    pub amount: i64,
    pub description: String,
    pub date: NaiveDate,
    pub agent_code: String,
    pub agent_name: String,
    pub tour_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Нормализует категорию к каноническому написанию; `None` если категория неизвестна.
pub fn canonical_category(raw: &str) -> Option<&'static str> {
    EXPENSE_CATEGORIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(raw.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_matched_loosely() {
        assert_eq!(canonical_category("fuel"), Some("Fuel"));
        assert_eq!(canonical_category(" HOTEL "), Some("Hotel"));
        assert_eq!(canonical_category("bribes"), None);
    }
}
