//! layout.rs
//!
//! Фиксированный шаблон мест автобуса: ряды A-J по 4 места и задний ряд K на 5 мест.
//! Шаблон одинаков для всех туров, поэтому топология мест не зависит от истории броней.

use crate::models::Seat;

/// Ряды по 4 места.
const FOUR_SEAT_ROWS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];
/// Задний ряд.
const BACK_ROW: char = 'K';
const BACK_ROW_SEATS: usize = 5;

pub const SEATS_PER_BUS: usize = FOUR_SEAT_ROWS.len() * 4 + BACK_ROW_SEATS;

/// Идентификаторы мест в порядке шаблона: A1..A4, B1..B4, ..., J1..J4, K1..K5.
pub fn seat_ids() -> Vec<String> {
    let mut ids = Vec::with_capacity(SEATS_PER_BUS);
    for row in FOUR_SEAT_ROWS {
        for n in 1..=4 {
            ids.push(format!("{row}{n}"));
        }
    }
    for n in 1..=BACK_ROW_SEATS {
        ids.push(format!("{BACK_ROW}{n}"));
    }
    ids
}

/// Свежий шаблон из 45 свободных мест.
pub fn seat_template() -> Vec<Seat> {
    seat_ids().into_iter().map(Seat::vacant).collect()
}

pub fn is_valid_seat(seat_id: &str) -> bool {
    let mut chars = seat_id.chars();
    let Some(row) = chars.next() else {
        return false;
    };
    let number = chars.as_str();
    // "A01" и "A+1" не считаются валидными id
    if number.starts_with('0') || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Ok(n) = number.parse::<usize>() else {
        return false;
    };
    if FOUR_SEAT_ROWS.contains(&row) {
        (1..=4).contains(&n)
    } else if row == BACK_ROW {
        (1..=BACK_ROW_SEATS).contains(&n)
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_45_vacant_seats_in_order() {
        let seats = seat_template();
        assert_eq!(seats.len(), 45);
        assert_eq!(SEATS_PER_BUS, 45);
        assert!(seats.iter().all(|s| !s.is_booked()));
        assert_eq!(seats[0].id, "A1");
        assert_eq!(seats[3].id, "A4");
        assert_eq!(seats[4].id, "B1");
        assert_eq!(seats[39].id, "J4");
        assert_eq!(seats[40].id, "K1");
        assert_eq!(seats[44].id, "K5");
    }

    #[test]
    fn template_is_deterministic() {
        assert_eq!(seat_template(), seat_template());
    }

    #[test]
    fn every_template_id_is_valid() {
        for id in seat_ids() {
            assert!(is_valid_seat(&id), "{id} should be valid");
        }
    }

    #[test]
    fn rejects_ids_outside_template() {
        for id in ["A5", "K6", "L1", "A0", "A01", "A+1", "a1", "", "K", "11"] {
            assert!(!is_valid_seat(id), "{id} should be invalid");
        }
    }
}
