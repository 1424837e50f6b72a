use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use tour_booking::models::{Booking, PaymentStatus};
use tour_booking::services::pricing::{derive, status_for, PricingError, MAX_AMOUNT};

fn amount() -> impl Strategy<Value = i64> {
    0..=MAX_AMOUNT
}

fn booking(tour_fee: i64, type_fee: i64, discount: i64) -> Booking {
    let mut b = Booking {
        id: Uuid::new_v4(),
        passenger_name: "Passenger".into(),
        mobile: "01700000000".into(),
        address: None,
        nid: None,
        tour_name: "Sajek".into(),
        customer_type: None,
        tour_fee,
        type_fee,
        discount,
        advance: 0,
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

proptest! {
    #[test]
    fn derivation_follows_the_formula(
        tour_fee in amount(),
        type_fee in amount(),
        discount in amount(),
        advance in amount(),
    ) {
        let d = derive(tour_fee, type_fee, discount, advance).unwrap();
        prop_assert_eq!(d.total, tour_fee + type_fee);
        prop_assert_eq!(d.due, tour_fee + type_fee - discount - advance);
        prop_assert_eq!(d.status, status_for(d.due, advance));
        match d.status {
            PaymentStatus::Paid => prop_assert!(d.due <= 0),
            PaymentStatus::Partial => prop_assert!(d.due > 0 && advance > 0),
            PaymentStatus::Due => prop_assert!(d.due > 0 && advance == 0),
        }
    }

    #[test]
    fn out_of_range_inputs_are_rejected(
        good in amount(),
        bad in prop_oneof![MAX_AMOUNT + 1..=i64::MAX, i64::MIN..0],
        slot in 0usize..4,
    ) {
        let mut args = [good; 4];
        args[slot] = bad;
        prop_assert_eq!(
            derive(args[0], args[1], args[2], args[3]),
            Err(PricingError::OutOfRange)
        );
    }

    #[test]
    fn payments_keep_derived_fields_consistent(
        tour_fee in 0..=100_000i64,
        type_fee in 0..=10_000i64,
        discount in 0..=5_000i64,
        payments in prop::collection::vec(1..=20_000i64, 0..8),
    ) {
        let mut b = booking(tour_fee, type_fee, discount);
        for amount in &payments {
            b.apply_payment(*amount).unwrap();
        }
        let paid: i64 = payments.iter().sum();
        prop_assert_eq!(b.advance, paid);
        prop_assert_eq!(b.due, tour_fee + type_fee - discount - paid);
        prop_assert_eq!(b.status, status_for(b.due, b.advance));
    }
}
