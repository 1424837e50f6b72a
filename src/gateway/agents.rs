use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::gateway::Gateway;
use crate::models::Agent;

/// Строка справочника агентов для полной замены. `pin_hash = None` сохраняет прежний PIN агента.
#[derive(Debug, Clone)]
pub struct AgentRow {
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub pin_hash: Option<String>,
}

impl Gateway {
    pub async fn fetch_agents(&self) -> Result<Vec<Agent>, sqlx::Error> {
        sqlx::query_as::<_, Agent>("SELECT code, name, phone, pin_hash FROM agents ORDER BY code")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_agent_by_code(&self, code: &str) -> Result<Option<Agent>, sqlx::Error> {
        sqlx::query_as::<_, Agent>(
            "SELECT code, name, phone, pin_hash FROM agents WHERE LOWER(code) = LOWER($1)"
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
    }

    /// delete-all + bulk insert в одной транзакции.
    pub async fn replace_agents(&self, rows: Vec<AgentRow>) -> Result<Vec<Agent>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: HashMap<String, Option<String>> =
            sqlx::query_as::<_, (String, Option<String>)>("SELECT LOWER(code), pin_hash FROM agents")
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();

        sqlx::query("DELETE FROM agents").execute(&mut *tx).await?;

        let agents: Vec<Agent> = rows
            .into_iter()
            .map(|row| {
                let pin_hash = row
                    .pin_hash
                    .or_else(|| existing.get(&row.code.to_lowercase()).cloned().flatten());
                Agent { code: row.code, name: row.name, phone: row.phone, pin_hash }
            })
            .collect();

        if !agents.is_empty() {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO agents (code, name, phone, pin_hash) ");
            qb.push_values(&agents, |mut b, a| {
                b.push_bind(&a.code)
                    .push_bind(&a.name)
                    .push_bind(&a.phone)
                    .push_bind(&a.pin_hash);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(agents)
    }
}
