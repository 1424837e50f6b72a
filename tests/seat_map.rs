use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

use tour_booking::models::{Booking, PaymentStatus, Tour};
use tour_booking::services::layout;
use tour_booking::services::reconciler::reconcile;

fn tour(name: String, fee: i64) -> Tour {
    Tour { name, fee, departure: None, created_at: Utc::now() }
}

fn booking(tour_name: String, seat_id: String) -> Booking {
    let mut b = Booking {
        id: Uuid::new_v4(),
        passenger_name: "Passenger".into(),
        mobile: "01700000000".into(),
        address: None,
        nid: None,
        tour_name,
        customer_type: None,
        tour_fee: 4500,
        type_fee: 0,
        discount: 0,
        advance: 1000,
        due: 0,
        status: PaymentStatus::Due,
        seat_id,
        agent_name: "Karim".into(),
        agent_code: "KS101".into(),
        created_at: Utc::now(),
    };
    b.rederive().unwrap();
    b
}

const TOUR_NAMES: [&str; 4] = ["Sajek", "Bandarban", "Cox's Bazar", "Sylhet"];

fn seat_strategy() -> impl Strategy<Value = String> {
    // в основном настоящие места, иногда мусор
    prop_oneof![
        9 => (0..layout::SEATS_PER_BUS).prop_map(|i| layout::seat_ids()[i].clone()),
        1 => prop::sample::select(vec!["A5", "K6", "Z1", "a1", "A01", ""]).prop_map(str::to_string),
    ]
}

fn input_strategy() -> impl Strategy<Value = (Vec<Tour>, Vec<Booking>)> {
    let tours = prop::sample::subsequence(TOUR_NAMES.to_vec(), 0..=TOUR_NAMES.len())
        .prop_map(|names| names.into_iter().map(|n| tour(n.to_string(), 4500)).collect::<Vec<_>>());
    let bookings = prop::collection::vec(
        (prop::sample::select(TOUR_NAMES.to_vec()), seat_strategy())
            .prop_map(|(t, s)| booking(t.to_string(), s)),
        0..60,
    );
    (tours, bookings)
}

proptest! {
    #[test]
    fn one_bus_per_tour_with_45_seats((tours, bookings) in input_strategy()) {
        let map = reconcile(&tours, &bookings);
        prop_assert_eq!(map.buses.len(), tours.len());
        for (bus, tour) in map.buses.iter().zip(&tours) {
            prop_assert_eq!(&bus.tour_name, &tour.name);
            prop_assert_eq!(bus.seats.len(), 45);
            let ids: Vec<String> = bus.seats.iter().map(|s| s.id.clone()).collect();
            prop_assert_eq!(ids, layout::seat_ids());
        }
    }

    #[test]
    fn seat_is_booked_iff_a_booking_matches((tours, bookings) in input_strategy()) {
        let map = reconcile(&tours, &bookings);
        for bus in &map.buses {
            for seat in &bus.seats {
                let claimant = bookings
                    .iter()
                    .find(|b| b.tour_name == bus.tour_name && b.seat_id == seat.id);
                match (claimant, &seat.booking) {
                    (Some(first), Some(placed)) => prop_assert_eq!(first.id, placed.id),
                    (None, None) => {}
                    _ => prop_assert!(false, "seat {} on {} mismatched", seat.id, bus.tour_name),
                }
            }
        }
    }

    #[test]
    fn every_booking_is_placed_orphaned_or_conflicting((tours, bookings) in input_strategy()) {
        let map = reconcile(&tours, &bookings);
        let placed: HashSet<Uuid> = map
            .buses
            .iter()
            .flat_map(|bus| bus.seats.iter().filter_map(|s| s.booking.as_ref().map(|b| b.id)))
            .collect();
        let orphaned: HashSet<Uuid> = map.orphaned.iter().copied().collect();
        let conflicts: HashSet<Uuid> = map.conflicts.iter().copied().collect();

        prop_assert_eq!(placed.len() + orphaned.len() + conflicts.len(), bookings.len());
        for b in &bookings {
            let known_tour = tours.iter().any(|t| t.name == b.tour_name);
            let valid_seat = layout::is_valid_seat(&b.seat_id);
            prop_assert_eq!(orphaned.contains(&b.id), !(known_tour && valid_seat));
        }
    }

    #[test]
    fn reconcile_is_idempotent((tours, bookings) in input_strategy()) {
        prop_assert_eq!(reconcile(&tours, &bookings), reconcile(&tours, &bookings));
    }
}
