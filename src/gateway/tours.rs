use chrono::NaiveDate;

use crate::gateway::Gateway;
use crate::models::Tour;

impl Gateway {
    pub async fn fetch_tours(&self) -> Result<Vec<Tour>, sqlx::Error> {
        sqlx::query_as::<_, Tour>(
            "SELECT name, fee, departure, created_at FROM tours ORDER BY created_at, name"
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn upsert_tour(
        &self,
        name: &str,
        fee: i64,
        departure: Option<NaiveDate>,
    ) -> Result<Tour, sqlx::Error> {
        sqlx::query_as::<_, Tour>(
            r#"
            INSERT INTO tours (name, fee, departure)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET fee = EXCLUDED.fee, departure = EXCLUDED.departure
            RETURNING name, fee, departure, created_at
            "#
        )
        .bind(name)
        .bind(fee)
        .bind(departure)
        .fetch_one(&self.pool)
        .await
    }

    /// Переименование тура. Брони и расходы переходят на новое имя через
    /// `ON UPDATE CASCADE` в той же транзакции. Цена в уже оформленных бронях не меняется.
    pub async fn rename_tour(
        &self,
        from: &str,
        to: &str,
        fee: i64,
        departure: Option<NaiveDate>,
    ) -> Result<Option<Tour>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE tour_name = $1")
            .bind(from)
            .fetch_one(&mut *tx)
            .await?;

        let tour = sqlx::query_as::<_, Tour>(
            r#"
            UPDATE tours SET name = $2, fee = $3, departure = $4
            WHERE name = $1
            RETURNING name, fee, departure, created_at
            "#
        )
        .bind(from)
        .bind(to)
        .bind(fee)
        .bind(departure)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(tour) = tour else {
            tx.rollback().await?;
            return Ok(None);
        };

        tx.commit().await?;

        tracing::info!("Tour renamed {} -> {}, {} bookings migrated", from, to, moved);
        Ok(Some(tour))
    }

    pub async fn count_bookings_for_tour(&self, name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE tour_name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    /// Удаление запрещено внешним ключом, пока на тур ссылаются брони или расходы
    /// (foreign_key_violation превращается в 409).
    pub async fn delete_tour(&self, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM tours WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
