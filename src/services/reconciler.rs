//! reconciler.rs
//!
//! Строит представление "автобусы и места": для каждого тура берется свежий шаблон
//! из 45 мест, затем поверх него раскладываются брони с совпадающим именем тура и id места.
//!
//! Брони, ссылающиеся на неизвестный тур или место вне шаблона, ни на какое место
//! не попадают и возвращаются в `orphaned`. Если несколько броней претендуют на
//! одно место, место достается первой, остальные попадают в `conflicts`.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Booking, Bus, Tour};
use crate::services::layout;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeatMap {
    pub buses: Vec<Bus>,
    pub orphaned: Vec<Uuid>,
    pub conflicts: Vec<Uuid>,
}

impl SeatMap {
    pub fn bus(&self, tour_name: &str) -> Option<&Bus> {
        self.buses.iter().find(|b| b.tour_name == tour_name)
    }
}

pub fn reconcile(tours: &[Tour], bookings: &[Booking]) -> SeatMap {
    let mut buses: Vec<Bus> = tours
        .iter()
        .map(|t| Bus {
            tour_name: t.name.clone(),
            tour_fee: t.fee,
            seats: layout::seat_template(),
        })
        .collect();

    // tour_name -> индекс автобуса; при дублях имен побеждает первый тур
    let mut by_tour: HashMap<&str, usize> = HashMap::with_capacity(tours.len());
    for (idx, tour) in tours.iter().enumerate() {
        by_tour.entry(tour.name.as_str()).or_insert(idx);
    }

    let mut orphaned = Vec::new();
    let mut conflicts = Vec::new();

    for booking in bookings {
        let Some(&bus_idx) = by_tour.get(booking.tour_name.as_str()) else {
            orphaned.push(booking.id);
            continue;
        };
        let Some(seat) = buses[bus_idx]
            .seats
            .iter_mut()
            .find(|s| s.id == booking.seat_id)
        else {
            orphaned.push(booking.id);
            continue;
        };
        if seat.booking.is_some() {
            conflicts.push(booking.id);
            continue;
        }
        seat.booking = Some(booking.clone());
    }

    if !orphaned.is_empty() {
        tracing::warn!("{} bookings reference a missing tour or seat: {:?}", orphaned.len(), orphaned);
    }
    if !conflicts.is_empty() {
        tracing::warn!("{} bookings collide on an occupied seat: {:?}", conflicts.len(), conflicts);
    }

    SeatMap { buses, orphaned, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::Utc;

    fn tour(name: &str, fee: i64) -> Tour {
        Tour { name: name.into(), fee, departure: None, created_at: Utc::now() }
    }

    fn booking(tour: &str, seat: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            passenger_name: "Rahim".into(),
            mobile: "01700000000".into(),
            address: None,
            nid: None,
            tour_name: tour.into(),
            customer_type: None,
            tour_fee: 4500,
            type_fee: 0,
            discount: 0,
            advance: 0,
            due: 4500,
            status: PaymentStatus::Due,
            seat_id: seat.into(),
            agent_name: "Karim".into(),
            agent_code: "KS101".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn one_bus_per_tour_with_bookings_overlaid() {
        let tours = vec![tour("Sajek", 4500), tour("Cox's Bazar", 6500)];
        let b1 = booking("Sajek", "A1");
        let b2 = booking("Cox's Bazar", "K5");
        let map = reconcile(&tours, &[b1.clone(), b2.clone()]);

        assert_eq!(map.buses.len(), 2);
        let sajek = map.bus("Sajek").unwrap();
        assert_eq!(sajek.tour_fee, 4500);
        assert_eq!(sajek.seats.len(), 45);
        assert_eq!(sajek.seat("A1").unwrap().booking.as_ref(), Some(&b1));
        assert_eq!(sajek.booked_count(), 1);
        assert!(!sajek.seat("K5").unwrap().is_booked());

        let cox = map.bus("Cox's Bazar").unwrap();
        assert_eq!(cox.seat("K5").unwrap().booking.as_ref(), Some(&b2));
        assert!(map.orphaned.is_empty());
    }

    #[test]
    fn unknown_tour_or_seat_is_dropped_silently() {
        let tours = vec![tour("Sajek", 4500)];
        let ghost_tour = booking("Bandarban", "A1");
        let ghost_seat = booking("Sajek", "Z9");
        let map = reconcile(&tours, &[ghost_tour.clone(), ghost_seat.clone()]);

        assert_eq!(map.bus("Sajek").unwrap().booked_count(), 0);
        assert_eq!(map.orphaned, vec![ghost_tour.id, ghost_seat.id]);
    }

    #[test]
    fn first_booking_keeps_a_contested_seat() {
        let tours = vec![tour("Sajek", 4500)];
        let first = booking("Sajek", "B2");
        let second = booking("Sajek", "B2");
        let map = reconcile(&tours, &[first.clone(), second.clone()]);

        let seat = map.bus("Sajek").unwrap().seat("B2").unwrap();
        assert_eq!(seat.booking.as_ref().map(|b| b.id), Some(first.id));
        assert_eq!(map.conflicts, vec![second.id]);
    }

    #[test]
    fn tour_matching_is_exact() {
        let tours = vec![tour("Sajek", 4500)];
        let map = reconcile(&tours, &[booking("sajek", "A1")]);
        assert_eq!(map.bus("Sajek").unwrap().booked_count(), 0);
        assert_eq!(map.orphaned.len(), 1);
    }

    #[test]
    fn no_tours_means_no_buses() {
        let map = reconcile(&[], &[booking("Sajek", "A1")]);
        assert!(map.buses.is_empty());
        assert_eq!(map.orphaned.len(), 1);
    }
}
