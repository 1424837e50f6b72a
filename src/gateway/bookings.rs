use uuid::Uuid;

use crate::gateway::Gateway;
use crate::models::Booking;

const BOOKING_COLUMNS: &str = "id, passenger_name, mobile, address, nid, tour_name, customer_type, \
     tour_fee, type_fee, discount, advance, due, status, seat_id, agent_name, agent_code, created_at";

impl Gateway {
    pub async fn fetch_bookings(&self) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Upsert по id. Занятое место (tour_name, seat_id) дает unique_violation.
    pub async fn upsert_booking(&self, b: &Booking) -> Result<Booking, sqlx::Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings ({BOOKING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                passenger_name = EXCLUDED.passenger_name,
                mobile = EXCLUDED.mobile,
                address = EXCLUDED.address,
                nid = EXCLUDED.nid,
                tour_name = EXCLUDED.tour_name,
                customer_type = EXCLUDED.customer_type,
                tour_fee = EXCLUDED.tour_fee,
                type_fee = EXCLUDED.type_fee,
                discount = EXCLUDED.discount,
                advance = EXCLUDED.advance,
                due = EXCLUDED.due,
                status = EXCLUDED.status,
                seat_id = EXCLUDED.seat_id,
                agent_name = EXCLUDED.agent_name,
                agent_code = EXCLUDED.agent_code
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(b.id)
        .bind(&b.passenger_name)
        .bind(&b.mobile)
        .bind(&b.address)
        .bind(&b.nid)
        .bind(&b.tour_name)
        .bind(&b.customer_type)
        .bind(b.tour_fee)
        .bind(b.type_fee)
        .bind(b.discount)
        .bind(b.advance)
        .bind(b.due)
        .bind(b.status.as_str())
        .bind(&b.seat_id)
        .bind(&b.agent_name)
        .bind(&b.agent_code)
        .bind(b.created_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Изменение брони под `SELECT ... FOR UPDATE`: параллельные платежи и правки
    /// одной брони выполняются по очереди и не затирают друг друга.
    /// `None`, если брони нет; ошибка из `change` откатывает транзакцию.
    pub async fn modify_booking<F, E>(&self, id: Uuid, change: F) -> Result<Option<Booking>, E>
    where
        F: FnOnce(&mut Booking) -> Result<(), E>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut booking) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        change(&mut booking)?;

        let saved = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings SET
                passenger_name = $2,
                mobile = $3,
                address = $4,
                nid = $5,
                tour_name = $6,
                customer_type = $7,
                tour_fee = $8,
                type_fee = $9,
                discount = $10,
                advance = $11,
                due = $12,
                status = $13,
                seat_id = $14
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&booking.passenger_name)
        .bind(&booking.mobile)
        .bind(&booking.address)
        .bind(&booking.nid)
        .bind(&booking.tour_name)
        .bind(&booking.customer_type)
        .bind(booking.tour_fee)
        .bind(booking.type_fee)
        .bind(booking.discount)
        .bind(booking.advance)
        .bind(booking.due)
        .bind(booking.status.as_str())
        .bind(&booking.seat_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(saved))
    }

    pub async fn delete_booking(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
