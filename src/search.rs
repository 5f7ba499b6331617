//! Free-text reservation search.

use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::limits::SEARCH_PREVIEW_LEN;
use crate::model::*;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Badge {
    Today,
    Upcoming,
    Past,
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Badge::Today => "today",
            Badge::Upcoming => "upcoming",
            Badge::Past => "past",
        })
    }
}

/// Classified by the start date against `today`.
pub fn badge(r: &Reservation, today: NaiveDate) -> Badge {
    let date = time::date_of(r.start);
    match date.cmp(&today) {
        std::cmp::Ordering::Equal => Badge::Today,
        std::cmp::Ordering::Greater => Badge::Upcoming,
        std::cmp::Ordering::Less => Badge::Past,
    }
}

/// Case-insensitive substring match on title, reserver and team. A blank
/// query matches everything.
pub fn matches(r: &Reservation, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    [&r.title, &r.reserver_name, &r.reserver_team]
        .iter()
        .any(|field| field.to_lowercase().contains(&q))
}

pub fn filter<'a>(reservations: &'a [Reservation], query: &str) -> Vec<&'a Reservation> {
    reservations.iter().filter(|r| matches(r, query)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub reservation: Reservation,
    pub badge: Badge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub hits: Vec<Hit>,
    /// Matches before the preview cut.
    pub total: usize,
    /// Matches cut by the preview.
    pub hidden: usize,
}

/// Matches of `query`: today first, then upcoming, both earliest first,
/// then past with the most recent first.
pub fn search(reservations: &[Reservation], query: &str, today: NaiveDate, show_all: bool) -> SearchView {
    let mut hits: Vec<Hit> = filter(reservations, query)
        .into_iter()
        .map(|r| Hit {
            badge: badge(r, today),
            reservation: r.clone(),
        })
        .collect();
    hits.sort_by_key(|h| {
        let start = h.reservation.start;
        let (ascending, descending) = match h.badge {
            Badge::Past => (0, Reverse(start)),
            _ => (start, Reverse(0)),
        };
        (h.badge, ascending, descending, h.reservation.id)
    });

    let total = hits.len();
    if !show_all {
        hits.truncate(SEARCH_PREVIEW_LEN);
    }
    SearchView {
        hidden: total - hits.len(),
        total,
        hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeOfDay;
    use ulid::Ulid;

    fn d(s: &str) -> NaiveDate {
        time::parse_date(s).unwrap()
    }

    fn on(date: &str, start: &str, title: &str) -> Reservation {
        let start: TimeOfDay = start.parse().unwrap();
        let at = time::at(d(date), start);
        NewReservation {
            room_id: Ulid::new(),
            title: title.into(),
            reserver_name: "Baek Ji-min".into(),
            reserver_team: "Platform".into(),
            start: at,
            end: at + 1_800_000,
            created_by: None,
        }
        .into_reservation(Ulid::new())
    }

    #[test]
    fn match_is_case_insensitive_across_fields() {
        let r = on("2024-06-04", "10:00", "Sprint Review");
        assert!(matches(&r, "sprint"));
        assert!(matches(&r, "JI-MIN"));
        assert!(matches(&r, "platf"));
        assert!(matches(&r, "   "));
        assert!(!matches(&r, "retro"));
    }

    #[test]
    fn ordering_today_then_upcoming_then_recent_past() {
        let today = d("2024-06-04");
        let rs = vec![
            on("2024-06-01", "10:00", "old"),
            on("2024-06-10", "10:00", "far"),
            on("2024-06-04", "15:00", "today late"),
            on("2024-06-03", "10:00", "yesterday"),
            on("2024-06-05", "09:00", "tomorrow"),
            on("2024-06-04", "09:00", "today early"),
        ];
        let view = search(&rs, "", today, false);
        let titles: Vec<&str> = view.hits.iter().map(|h| h.reservation.title.as_str()).collect();
        assert_eq!(
            titles,
            ["today early", "today late", "tomorrow", "far", "yesterday", "old"]
        );
        let badges: Vec<Badge> = view.hits.iter().map(|h| h.badge).collect();
        assert_eq!(badges[0], Badge::Today);
        assert_eq!(badges[2], Badge::Upcoming);
        assert_eq!(badges[5], Badge::Past);
        assert_eq!(view.total, 6);
        assert_eq!(view.hidden, 0);
    }

    #[test]
    fn preview_cuts_at_ten() {
        let rs: Vec<Reservation> = (10..25)
            .map(|day| on(&format!("2024-06-{day}"), "10:00", "Standup"))
            .collect();
        let view = search(&rs, "stand", d("2024-06-01"), false);
        assert_eq!(view.hits.len(), SEARCH_PREVIEW_LEN);
        assert_eq!(view.total, 15);
        assert_eq!(view.hidden, 5);

        let all = search(&rs, "stand", d("2024-06-01"), true);
        assert_eq!(all.hits.len(), 15);
        assert_eq!(all.hidden, 0);
    }

    #[test]
    fn badge_labels() {
        assert_eq!(Badge::Upcoming.to_string(), "upcoming");
        let r = on("2024-06-04", "23:30", "late");
        assert_eq!(badge(&r, d("2024-06-04")), Badge::Today);
        assert_eq!(badge(&r, d("2024-06-05")), Badge::Past);
    }
}
