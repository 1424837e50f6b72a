use serde::{Deserialize, Serialize};

use crate::models::Booking;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub booking: Option<Booking>,
}

impl Seat {
    pub fn vacant(id: impl Into<String>) -> Self {
        Self { id: id.into(), booking: None }
    }

    pub fn is_booked(&self) -> bool {
        self.booking.is_some()
    }
}

/// Автобус тура: шаблон из 45 мест с наложенными бронями.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    pub tour_name: String,
    pub tour_fee: i64,
    pub seats: Vec<Seat>,
}

impl Bus {
    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn booked_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_booked()).count()
    }

    pub fn vacant_count(&self) -> usize {
        self.seats.len() - self.booked_count()
    }
}
