//! gateway
//!
//! Доступ к пяти таблицам хранилища: туры, агенты, типы клиентов, брони, расходы.
//! Чтение всегда целиком (без пагинации), запись - upsert по ключу, удаление по ключу,
//! а справочники (агенты, типы клиентов) заменяются целиком в одной транзакции.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::models::{Agent, Booking, CustomerType, Expense, Tour};

pub mod agents;
pub mod bookings;
pub mod customer_types;
pub mod expenses;
pub mod tours;

/// Полный снимок всех таблиц.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub tours: Vec<Tour>,
    pub agents: Vec<Agent>,
    pub customer_types: Vec<CustomerType>,
    pub bookings: Vec<Booking>,
    pub expenses: Vec<Expense>,
}

#[derive(Clone)]
pub struct Gateway {
    pool: PgPool,
}

impl Gateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Пять запросов параллельно; любая ошибка отменяет весь снимок.
    pub async fn fetch_all(&self) -> Result<Dataset, sqlx::Error> {
        let (tours, agents, customer_types, bookings, expenses) = tokio::try_join!(
            self.fetch_tours(),
            self.fetch_agents(),
            self.fetch_customer_types(),
            self.fetch_bookings(),
            self.fetch_expenses(),
        )?;

        debug!(
            "Fetched {} tours, {} agents, {} customer types, {} bookings, {} expenses",
            tours.len(),
            agents.len(),
            customer_types.len(),
            bookings.len(),
            expenses.len()
        );

        Ok(Dataset { tours, agents, customer_types, bookings, expenses })
    }
}
