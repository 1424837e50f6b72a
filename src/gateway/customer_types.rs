use sqlx::{Postgres, QueryBuilder};

use crate::gateway::Gateway;
use crate::models::CustomerType;

impl Gateway {
    pub async fn fetch_customer_types(&self) -> Result<Vec<CustomerType>, sqlx::Error> {
        sqlx::query_as::<_, CustomerType>("SELECT label, fee FROM customer_types ORDER BY fee, label")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn replace_customer_types(
        &self,
        types: Vec<CustomerType>,
    ) -> Result<Vec<CustomerType>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_types").execute(&mut *tx).await?;

        if !types.is_empty() {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO customer_types (label, fee) ");
            qb.push_values(&types, |mut b, t| {
                b.push_bind(&t.label).push_bind(t.fee);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(types)
    }
}
