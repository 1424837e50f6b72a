//! export.rs
//!
//! CSV выгрузка броней. Набор и порядок колонок фиксированы и не зависят от фильтра.

use serde::Deserialize;

use crate::models::{Booking, PaymentStatus};

pub const CSV_HEADER: [&str; 11] = [
    "Seat",
    "Name",
    "Mobile",
    "Tour",
    "Total Fee",
    "Advance",
    "Due",
    "Status",
    "Agent Name",
    "Agent Code",
    "Date",
];

/// Фильтр списка броней: тур сравнивается точно, поиск - по подстроке без учета регистра.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub tour: Option<String>,
    pub agent: Option<String>,
    pub status: Option<PaymentStatus>,
    pub q: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, b: &Booking) -> bool {
        if let Some(tour) = self.tour.as_deref().filter(|t| !t.is_empty()) {
            if b.tour_name != tour {
                return false;
            }
        }
        if let Some(agent) = self.agent.as_deref().filter(|a| !a.is_empty()) {
            if !b.agent_code.eq_ignore_ascii_case(agent) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if b.status != status {
                return false;
            }
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            let hit = b.passenger_name.to_lowercase().contains(&q)
                || b.mobile.contains(&q)
                || b.seat_id.to_lowercase() == q
                || b.id.to_string().starts_with(&q);
            if !hit {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, bookings: &'a [Booking]) -> Vec<&'a Booking> {
        bookings.iter().filter(|b| self.matches(b)).collect()
    }
}

fn row(b: &Booking) -> [String; 11] {
    [
        b.seat_id.clone(),
        b.passenger_name.clone(),
        b.mobile.clone(),
        b.tour_name.clone(),
        b.total_fee().to_string(),
        b.advance.to_string(),
        b.due.to_string(),
        b.status.to_string(),
        b.agent_name.clone(),
        b.agent_code.clone(),
        b.created_at.format("%Y-%m-%d").to_string(),
    ]
}

/// CSV в UTF-8, строки через `\n`, кавычки только где нужно.
pub fn bookings_csv<'a>(
    bookings: impl IntoIterator<Item = &'a Booking>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for b in bookings {
        writer.write_record(row(b))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Имя файла выгрузки, например `bookings-sajek-valley-2025-01-31.csv`.
pub fn export_filename(tour: Option<&str>, date: chrono::NaiveDate) -> String {
    let scope = match tour.filter(|t| !t.is_empty()) {
        Some(t) => t
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-"),
        None => "all".to_string(),
    };
    format!("bookings-{}-{}.csv", scope, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn booking(name: &str, tour: &str, seat: &str, agent: &str) -> Booking {
        let mut b = Booking {
            id: Uuid::new_v4(),
            passenger_name: name.into(),
            mobile: "01711111111".into(),
            address: None,
            nid: None,
            tour_name: tour.into(),
            customer_type: None,
            tour_fee: 4500,
            type_fee: 500,
            discount: 0,
            advance: 2000,
            due: 0,
            status: PaymentStatus::Due,
            seat_id: seat.into(),
            agent_name: "Karim".into(),
            agent_code: agent.into(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap(),
        };
        b.rederive().unwrap();
        b
    }

    fn csv_text<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> String {
        String::from_utf8(bookings_csv(bookings).unwrap()).unwrap()
    }

    #[test]
    fn header_and_row_layout_are_fixed() {
        let csv = csv_text(&[booking("Rahim", "Sajek", "A1", "KS101")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Seat,Name,Mobile,Tour,Total Fee,Advance,Due,Status,Agent Name,Agent Code,Date");
        assert_eq!(lines[1], "A1,Rahim,01711111111,Sajek,5000,2000,3000,Partial,Karim,KS101,2025-03-09");
    }

    #[test]
    fn column_count_does_not_depend_on_filter() {
        let all = vec![
            booking("Rahim", "Sajek", "A1", "KS101"),
            booking("Salma", "Cox's Bazar", "B1", "KS102"),
        ];
        let filter = BookingFilter { tour: Some("Sajek".into()), ..Default::default() };
        for csv in [csv_text(&all), csv_text(filter.apply(&all))] {
            for line in csv.lines() {
                assert_eq!(line.split(',').count(), CSV_HEADER.len());
            }
        }
    }

    #[test]
    fn tour_filter_is_exact() {
        let all = vec![
            booking("Rahim", "Sajek", "A1", "KS101"),
            booking("Salma", "Sajek Valley", "A1", "KS101"),
            booking("Jamal", "sajek", "A2", "KS101"),
        ];
        let filter = BookingFilter { tour: Some("Sajek".into()), ..Default::default() };
        let rows = filter.apply(&all);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].passenger_name, "Rahim");
    }

    #[test]
    fn other_filters_combine() {
        let all = vec![
            booking("Rahim", "Sajek", "A1", "KS101"),
            booking("Salma", "Sajek", "A2", "KS102"),
        ];
        let by_agent = BookingFilter { agent: Some("ks102".into()), ..Default::default() };
        assert_eq!(by_agent.apply(&all)[0].passenger_name, "Salma");

        let by_text = BookingFilter { q: Some("rah".into()), ..Default::default() };
        assert_eq!(by_text.apply(&all).len(), 1);

        let by_status = BookingFilter { status: Some(PaymentStatus::Paid), ..Default::default() };
        assert!(by_status.apply(&all).is_empty());
    }

    #[test]
    fn awkward_fields_are_quoted() {
        let csv = csv_text(&[booking("Khan, \"Babu\"", "Sajek", "A1", "KS101")]);
        assert!(csv.contains("\"Khan, \"\"Babu\"\"\""));

        // кавычки и переводы строк не ломают разбор обратно
        let text = csv_text(&[booking("Line\nBreak", "Sajek", "A1", "KS101")]);
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), CSV_HEADER.len());
        assert_eq!(&record[1], "Line\nBreak");
    }

    #[test]
    fn filename_is_slugged() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(export_filename(Some("Cox's Bazar"), d), "bookings-cox-s-bazar-2025-01-31.csv");
        assert_eq!(export_filename(None, d), "bookings-all-2025-01-31.csv");
    }
}
