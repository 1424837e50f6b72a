use serde::Serialize;

use crate::models::PaymentStatus;

/// Верхняя граница любой денежной величины в запросе (цена, скидка, аванс, платеж).
pub const MAX_AMOUNT: i64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("amount must be between 0 and 10000000")]
    OutOfRange,
}

/// Результат расчета стоимости брони.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Derivation {
    pub total: i64,
    pub due: i64,
    pub status: PaymentStatus,
}

fn in_range(value: i64) -> Result<i64, PricingError> {
    if (0..=MAX_AMOUNT).contains(&value) {
        Ok(value)
    } else {
        Err(PricingError::OutOfRange)
    }
}

/// total = тур + надбавка, due = total - скидка - аванс.
/// Paid если due <= 0, иначе Partial если аванс > 0, иначе Due.
pub fn derive(
    tour_fee: i64,
    type_fee: i64,
    discount: i64,
    advance: i64,
) -> Result<Derivation, PricingError> {
    let total = in_range(tour_fee)?
        .checked_add(in_range(type_fee)?)
        .ok_or(PricingError::OutOfRange)?;
    let due = total
        .checked_sub(in_range(discount)?)
        .and_then(|rest| rest.checked_sub(advance))
        .ok_or(PricingError::OutOfRange)?;
    in_range(advance)?;
    Ok(Derivation {
        total,
        due,
        status: status_for(due, advance),
    })
}

/// Аванс после очередного платежа.
pub fn add_payment(advance: i64, amount: i64) -> Result<i64, PricingError> {
    if amount <= 0 {
        return Err(PricingError::OutOfRange);
    }
    advance
        .checked_add(amount)
        .ok_or(PricingError::OutOfRange)
        .and_then(in_range)
}

pub fn status_for(due: i64, advance: i64) -> PaymentStatus {
    if due <= 0 {
        PaymentStatus::Paid
    } else if advance > 0 {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Due
    }
}
