use uuid::Uuid;

use crate::gateway::Gateway;
use crate::models::Expense;

impl Gateway {
    pub async fn fetch_expenses(&self) -> Result<Vec<Expense>, sqlx::Error> {
        sqlx::query_as::<_, Expense>(
            "SELECT id, category, amount, description, date, agent_code, agent_name, tour_name, created_at
             FROM expenses
             ORDER BY date DESC, created_at DESC"
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn upsert_expense(&self, e: &Expense) -> Result<Expense, sqlx::Error> {
        sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (id, category, amount, description, date, agent_code, agent_name, tour_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                category = EXCLUDED.category,
                amount = EXCLUDED.amount,
                description = EXCLUDED.description,
                date = EXCLUDED.date,
                tour_name = EXCLUDED.tour_name
            RETURNING id, category, amount, description, date, agent_code, agent_name, tour_name, created_at
            "#
        )
        .bind(e.id)
        .bind(&e.category)
        .bind(e.amount)
        .bind(&e.description)
        .bind(e.date)
        .bind(&e.agent_code)
        .bind(&e.agent_name)
        .bind(&e.tour_name)
        .bind(e.created_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_expense(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
