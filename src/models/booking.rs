use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::services::pricing::{self, PricingError};

/// Статус оплаты брони. Всегда выводится из `due` и `advance`, не хранится как источник истины.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Partial,
    Due,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment status `{0}`")]
pub struct UnknownPaymentStatus(pub String);

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Due => "Due",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownPaymentStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(PaymentStatus::Paid),
            "partial" => Ok(PaymentStatus::Partial),
            "due" => Ok(PaymentStatus::Due),
            _ => Err(UnknownPaymentStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub passenger_name: String,
    pub mobile: String,
    pub address: Option<String>,
    pub nid: Option<String>,
    pub tour_name: String,
    pub customer_type: Option<String>,
    pub tour_fee: i64,
    pub type_fee: i64,
    pub discount: i64,
    pub advance: i64,
    pub due: i64,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub seat_id: String,
    pub agent_name: String,
    pub agent_code: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Полная стоимость до скидки: тур + надбавка типа клиента.
    pub fn total_fee(&self) -> i64 {
        self.tour_fee.saturating_add(self.type_fee)
    }

    /// Пересчитать `due` и `status` после изменения любого из слагаемых.
    pub fn rederive(&mut self) -> Result<(), PricingError> {
        let d = pricing::derive(self.tour_fee, self.type_fee, self.discount, self.advance)?;
        self.due = d.due;
        self.status = d.status;
        Ok(())
    }

    /// Платеж увеличивает аванс; при ошибке бронь не меняется.
    pub fn apply_payment(&mut self, amount: i64) -> Result<(), PricingError> {
        let advance = pricing::add_payment(self.advance, amount)?;
        let d = pricing::derive(self.tour_fee, self.type_fee, self.discount, advance)?;
        self.advance = advance;
        self.due = d.due;
        self.status = d.status;
        Ok(())
    }

    pub fn is_owned_by(&self, agent_code: &str) -> bool {
        self.agent_code.eq_ignore_ascii_case(agent_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!("PARTIAL".parse::<PaymentStatus>().unwrap(), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::try_from("Due".to_string()).unwrap(), PaymentStatus::Due);
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    fn booking(tour_fee: i64, advance: i64) -> Booking {
        let mut b = Booking {
            id: Uuid::new_v4(),
            passenger_name: "Rahim".into(),
            mobile: "01711000000".into(),
            address: None,
            nid: None,
            tour_name: "Sajek".into(),
            customer_type: None,
            tour_fee,
            type_fee: 0,
            discount: 0,
            advance,
            due: 0,
            status: PaymentStatus::Due,
            seat_id: "A1".into(),
            agent_name: "Karim".into(),
            agent_code: "KS101".into(),
            created_at: Utc::now(),
        };
        b.rederive().unwrap();
        b
    }

    #[test]
    fn payments_move_booking_through_statuses() {
        let mut b = booking(4500, 0);
        assert_eq!((b.due, b.status), (4500, PaymentStatus::Due));

        b.apply_payment(1000).unwrap();
        assert_eq!((b.advance, b.due, b.status), (1000, 3500, PaymentStatus::Partial));

        b.apply_payment(3500).unwrap();
        assert_eq!((b.advance, b.due, b.status), (4500, 0, PaymentStatus::Paid));
    }

    #[test]
    fn rejected_payment_leaves_booking_untouched() {
        let mut b = booking(4500, 2000);
        let before = b.clone();
        assert!(b.apply_payment(i64::MAX).is_err());
        assert!(b.apply_payment(0).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn status_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&PaymentStatus::Partial).unwrap(), "\"Partial\"");
        assert_eq!(PaymentStatus::Paid.to_string(), "Paid");
    }
}
