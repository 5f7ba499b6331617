//! Week grid arithmetic: which dates a week shows, its half-hour slots,
//! and where reservations and the current time land on it.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::limits::{DAY_END_MINUTE, DAY_START_MINUTE, SLOT_MINUTES};
use crate::model::*;
use crate::time::{self, TimeOfDay};

/// Monday of the week containing `date`. Sunday belongs to the week that
/// started six days earlier.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    time::sub_days(date, back).unwrap_or(date)
}

/// Monday through Friday of `date`'s week.
pub fn weekdays(date: NaiveDate) -> [NaiveDate; 5] {
    let monday = monday_of(date);
    let mut days = [monday; 5];
    for (offset, day) in days.iter_mut().enumerate().skip(1) {
        *day = time::add_days(monday, offset as u64).unwrap_or(monday);
    }
    days
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn day_start() -> TimeOfDay {
    TimeOfDay::from_minutes(DAY_START_MINUTE).unwrap_or(TimeOfDay::MIDNIGHT)
}

fn day_end() -> TimeOfDay {
    TimeOfDay::from_minutes(DAY_END_MINUTE).unwrap_or(TimeOfDay::MIDNIGHT)
}

/// Slot starts from 08:00 through 18:00 inclusive.
pub fn time_slots() -> Vec<TimeOfDay> {
    (DAY_START_MINUTE..=DAY_END_MINUTE)
        .step_by(SLOT_MINUTES as usize)
        .filter_map(TimeOfDay::from_minutes)
        .collect()
}

/// Times the form's pickers offer, every ten minutes across the day.
pub fn time_options() -> Vec<TimeOfDay> {
    (DAY_START_MINUTE..=DAY_END_MINUTE)
        .step_by(10)
        .filter_map(TimeOfDay::from_minutes)
        .collect()
}

/// End preset for a click on `start`: one slot later, never past 18:00.
pub fn default_end(start: TimeOfDay) -> TimeOfDay {
    start.plus_clamped(SLOT_MINUTES, day_end())
}

/// Index of the slot that contains `t`, if it lies on the grid.
pub fn slot_of(t: TimeOfDay) -> Option<usize> {
    let m = t.minutes();
    if !(DAY_START_MINUTE..DAY_END_MINUTE + SLOT_MINUTES).contains(&m) {
        return None;
    }
    Some(((m - DAY_START_MINUTE) / SLOT_MINUTES) as usize)
}

/// A reservation as drawn in one room's column for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub reservation: Reservation,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub past: bool,
}

/// Finished strictly before `now`.
pub fn is_past(r: &Reservation, now: Ms) -> bool {
    r.end < now
}

/// Reservations of `room_id` starting on `date`, by start.
pub fn room_day(room_id: RoomId, date: NaiveDate, reservations: &[Reservation], now: Ms) -> Vec<Block> {
    let mut blocks: Vec<Block> = reservations
        .iter()
        .filter(|r| r.room_id == room_id && time::date_of(r.start) == date)
        .map(|r| Block {
            reservation: r.clone(),
            start: time::time_of(r.start),
            end: time::time_of(r.end),
            past: is_past(r, now),
        })
        .collect();
    blocks.sort_by_key(|b| (b.reservation.start, b.reservation.id));
    blocks
}

/// Where the "now" line sits: the slot it falls in and how far into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NowMarker {
    pub slot: usize,
    pub offset_minutes: u16,
}

/// Only drawn when `selected` is today and the time is on the grid.
pub fn now_marker(selected: NaiveDate, now: Ms) -> Option<NowMarker> {
    if time::date_of(now) != selected {
        return None;
    }
    let t = time::time_of(now);
    if t < day_start() || t > day_end() {
        return None;
    }
    let slot = slot_of(t)?;
    Some(NowMarker {
        slot,
        offset_minutes: (t.minutes() - DAY_START_MINUTE) % SLOT_MINUTES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn d(s: &str) -> NaiveDate {
        time::parse_date(s).unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn booking(room_id: RoomId, date: &str, start: &str, end: &str) -> Reservation {
        NewReservation {
            room_id,
            title: "1:1".into(),
            reserver_name: "Yoon".into(),
            reserver_team: "Data".into(),
            start: time::at(d(date), t(start)),
            end: time::at(d(date), t(end)),
            created_by: None,
        }
        .into_reservation(Ulid::new())
    }

    #[test]
    fn monday_of_week() {
        // 2024-06-03 is a Monday.
        assert_eq!(monday_of(d("2024-06-03")), d("2024-06-03"));
        assert_eq!(monday_of(d("2024-06-07")), d("2024-06-03"));
        assert_eq!(monday_of(d("2024-06-08")), d("2024-06-03"));
        assert_eq!(monday_of(d("2024-06-09")), d("2024-06-03"));
        assert_eq!(monday_of(d("2024-06-10")), d("2024-06-10"));
    }

    #[test]
    fn weekdays_span_month_end() {
        let days = weekdays(d("2024-07-02"));
        assert_eq!(days[0], d("2024-07-01"));
        assert_eq!(days[4], d("2024-07-05"));

        let days = weekdays(d("2024-02-29"));
        assert_eq!(days, [
            d("2024-02-26"),
            d("2024-02-27"),
            d("2024-02-28"),
            d("2024-02-29"),
            d("2024-03-01"),
        ]);
        assert!(days.iter().all(|day| is_weekday(*day)));
        assert!(!is_weekday(d("2024-03-02")));
    }

    #[test]
    fn grid_has_21_slots() {
        let slots = time_slots();
        assert_eq!(slots.len(), 21);
        assert_eq!(slots[0], t("08:00"));
        assert_eq!(slots[1], t("08:30"));
        assert_eq!(slots[20], t("18:00"));
        assert_eq!(time_options().len(), 61);
    }

    #[test]
    fn default_end_clamps_at_close() {
        assert_eq!(default_end(t("09:00")), t("09:30"));
        assert_eq!(default_end(t("17:40")), t("18:00"));
        assert_eq!(default_end(t("18:00")), t("18:00"));
    }

    #[test]
    fn slot_lookup() {
        assert_eq!(slot_of(t("08:00")), Some(0));
        assert_eq!(slot_of(t("08:29")), Some(0));
        assert_eq!(slot_of(t("12:45")), Some(9));
        assert_eq!(slot_of(t("18:00")), Some(20));
        assert_eq!(slot_of(t("07:59")), None);
        assert_eq!(slot_of(t("18:30")), None);
    }

    #[test]
    fn room_day_filters_and_flags_past() {
        let room = Ulid::new();
        let other = Ulid::new();
        let rs = vec![
            booking(room, "2024-06-04", "13:00", "14:00"),
            booking(room, "2024-06-04", "09:00", "10:00"),
            booking(other, "2024-06-04", "09:00", "10:00"),
            booking(room, "2024-06-05", "09:00", "10:00"),
        ];
        let now = time::at(d("2024-06-04"), t("10:00"));
        let blocks = room_day(room, d("2024-06-04"), &rs, now);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start, t("09:00"));
        // Ends exactly now: not past yet.
        assert!(!blocks[0].past);
        assert!(!blocks[1].past);

        let later = now + 1;
        assert!(room_day(room, d("2024-06-04"), &rs, later)[0].past);
    }

    #[test]
    fn now_marker_only_today() {
        let now = time::at(d("2024-06-04"), t("10:40"));
        let marker = now_marker(d("2024-06-04"), now).unwrap();
        assert_eq!(marker, NowMarker { slot: 5, offset_minutes: 10 });
        assert_eq!(now_marker(d("2024-06-05"), now), None);

        let evening = time::at(d("2024-06-04"), t("19:00"));
        assert_eq!(now_marker(d("2024-06-04"), evening), None);
    }
}
