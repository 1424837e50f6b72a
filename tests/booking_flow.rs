use chrono::Utc;
use uuid::Uuid;

use tour_booking::config::{AuthConfig, TicketConfig};
use tour_booking::gateway::Dataset;
use tour_booking::models::{Agent, Booking, CustomerType, PaymentStatus, Tour};
use tour_booking::realtime::{ChangeEvent, Record, Table};
use tour_booking::services::auth::{AuthService, Role};
use tour_booking::services::export::{bookings_csv, BookingFilter, CSV_HEADER};
use tour_booking::services::pricing::derive;
use tour_booking::services::tickets;
use tour_booking::store::{Action, AppStore, Outcome};

fn tour(name: &str, fee: i64) -> Tour {
    Tour { name: name.into(), fee, departure: None, created_at: Utc::now() }
}

fn agent(code: &str, name: &str) -> Agent {
    Agent { code: code.into(), name: name.into(), phone: None, pin_hash: None }
}

/// Бронь так, как ее собирает обработчик создания.
fn book(tour: &Tour, ct: Option<&CustomerType>, seat: &str, discount: i64, advance: i64) -> Booking {
    let mut b = Booking {
        id: Uuid::new_v4(),
        passenger_name: "Rahim Uddin".into(),
        mobile: "01711111111".into(),
        address: Some("Dhaka".into()),
        nid: None,
        tour_name: tour.name.clone(),
        customer_type: ct.map(|c| c.label.clone()),
        tour_fee: tour.fee,
        type_fee: ct.map_or(0, |c| c.fee),
        discount,
        advance,
        due: 0,
        status: PaymentStatus::Due,
        seat_id: seat.into(),
        agent_name: "Karim".into(),
        agent_code: "KS101".into(),
        created_at: Utc::now(),
    };
    b.rederive().unwrap();
    b
}

async fn loaded_store(dataset: Dataset) -> AppStore {
    let store = AppStore::new();
    let ticket = store.begin_fetch().await;
    assert_eq!(store.dispatch(Action::Loaded(ticket, dataset)).await, Outcome::Applied);
    store
}

#[test]
fn derivation_examples() {
    let full = derive(4500, 0, 0, 4500).unwrap();
    assert_eq!((full.total, full.due, full.status), (4500, 0, PaymentStatus::Paid));

    let vip = derive(6500, 1500, 500, 0).unwrap();
    assert_eq!((vip.total, vip.due, vip.status), (8000, 7500, PaymentStatus::Due));

    let partial = derive(4500, 0, 0, 2000).unwrap();
    assert_eq!((partial.due, partial.status), (2500, PaymentStatus::Partial));
}

#[tokio::test]
async fn created_booking_appears_on_its_seat() {
    let sajek = tour("Sajek", 4500);
    let vip = CustomerType { label: "VIP".into(), fee: 1500 };
    let store = loaded_store(Dataset {
        tours: vec![sajek.clone()],
        customer_types: vec![vip.clone()],
        ..Default::default()
    })
    .await;

    let booking = book(&sajek, Some(&vip), "C3", 500, 2000);
    assert_eq!(booking.due, 3500);
    assert_eq!(booking.status, PaymentStatus::Partial);

    store
        .dispatch(Action::Changed(ChangeEvent::upserted(Record::Booking(booking.clone()))))
        .await;

    let snapshot = store.snapshot().await;
    let seat = snapshot.seat_map.bus("Sajek").unwrap().seat("C3").unwrap();
    let placed = seat.booking.as_ref().unwrap();
    assert_eq!(placed.id, booking.id);
    assert_eq!(placed.due, 3500);
    assert_eq!(placed.status, PaymentStatus::Partial);
    assert_eq!(snapshot.seat_map.bus("Sajek").unwrap().booked_count(), 1);
}

#[tokio::test]
async fn cancelling_frees_the_seat_everywhere() {
    let sajek = tour("Sajek", 4500);
    let b = book(&sajek, None, "K5", 0, 0);
    let store = loaded_store(Dataset {
        tours: vec![sajek],
        bookings: vec![b.clone()],
        ..Default::default()
    })
    .await;

    store
        .dispatch(Action::Changed(ChangeEvent::deleted(Table::Bookings, b.id.to_string())))
        .await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.bookings.is_empty());
    assert!(!snapshot.seat_map.bus("Sajek").unwrap().seat("K5").unwrap().is_booked());
}

#[tokio::test]
async fn renamed_tour_keeps_its_passengers_and_prices() {
    let sajek = tour("Sajek", 4500);
    let b = book(&sajek, None, "A1", 0, 1000);
    let store = loaded_store(Dataset {
        tours: vec![sajek],
        bookings: vec![b.clone()],
        ..Default::default()
    })
    .await;

    let renamed = tour("Sajek Valley", 5000);
    store
        .dispatch(Action::Changed(ChangeEvent::TourRenamed { from: "Sajek".into(), tour: renamed }))
        .await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.seat_map.bus("Sajek").is_none());
    let seat = snapshot.seat_map.bus("Sajek Valley").unwrap().seat("A1").unwrap();
    let moved = seat.booking.as_ref().unwrap();
    assert_eq!(moved.id, b.id);
    assert_eq!(moved.tour_fee, 4500);
    assert_eq!(moved.due, 3500);
    assert!(snapshot.seat_map.orphaned.is_empty());
}

#[test]
fn agent_login_ignores_code_case() {
    let auth = AuthService::new(&AuthConfig {
        jwt_secret: "integration-secret".into(),
        expires_in_hours: 1,
        admin_password_hash: bcrypt::hash("pw", 4).unwrap(),
    });
    let agents = vec![agent("KS101", "Karim"), agent("KS102", "Salma")];

    for typed in ["ks101", "KS101", "Ks101 "] {
        let found = agents.iter().find(|a| a.matches_code(typed));
        let (token, _) = auth.login_agent(found, None).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.agent_code.as_deref(), Some("KS101"));
    }
    assert!(auth.login_agent(agents.iter().find(|a| a.matches_code("ks999")), None).is_err());
}

#[test]
fn csv_has_eleven_columns_for_any_filter() {
    let sajek = tour("Sajek", 4500);
    let cox = tour("Cox", 3000);
    let all = vec![
        book(&sajek, None, "A1", 0, 4500),
        book(&sajek, None, "A2", 0, 0),
        book(&cox, None, "A1", 200, 100),
    ];

    let filters = [
        BookingFilter::default(),
        BookingFilter { tour: Some("Sajek".into()), ..Default::default() },
        BookingFilter { status: Some(PaymentStatus::Paid), ..Default::default() },
        BookingFilter { tour: Some("Nowhere".into()), ..Default::default() },
    ];
    for filter in &filters {
        let rows = filter.apply(&all);
        let expected_rows = rows.len();
        let csv = String::from_utf8(bookings_csv(rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), expected_rows + 1);
        for line in lines {
            assert_eq!(line.split(',').count(), CSV_HEADER.len());
        }
    }
}

#[test]
fn ticket_batch_pages() {
    let config = TicketConfig {
        qr_endpoint: "https://api.qrserver.com/v1/create-qr-code/".into(),
        qr_size: "120x120".into(),
        operator_name: "Tours".into(),
    };
    let sajek = tour("Sajek", 4500);
    let bookings: Vec<Booking> = (0..19).map(|_| book(&sajek, None, "A1", 0, 0)).collect();
    let refs: Vec<&Booking> = bookings.iter().collect();

    let html = tickets::render_batch(&config, &refs);
    assert_eq!(tickets::page_count(refs.len()), 3);
    assert_eq!(html.matches("class=\"page\"").count(), 3);
    assert_eq!(html.matches("class=\"ticket\"").count(), 19);
}
