use std::fmt;

use chrono::NaiveDate;

use crate::model::*;
use crate::time;

/// Repeat rule of a booking request or an inferred series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Cadence {
    #[default]
    None,
    Daily,
    Weekly,
}

impl Cadence {
    /// Days between consecutive occurrences, `None` for a one-off.
    pub fn step_days(self) -> Option<u64> {
        match self {
            Cadence::None => None,
            Cadence::Daily => Some(1),
            Cadence::Weekly => Some(7),
        }
    }

    pub fn repeats(self) -> bool {
        self != Cadence::None
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cadence::None => "none",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
        })
    }
}

/// Reservations inferred to belong together, recomputed on every call.
///
/// Membership is field equality plus date cadence. Two independently created
/// reservations with identical fields on consecutive days are
/// indistinguishable from a booked daily series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub target: ReservationId,
    /// All candidates, target included, ordered by start.
    pub members: Vec<Reservation>,
    pub cadence: Cadence,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl Series {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_recurring(&self) -> bool {
        self.cadence.repeats()
    }

    /// Rows an edit of this series replaces: every member of a daily or
    /// weekly run, otherwise the target alone.
    pub fn affected_ids(&self) -> Vec<ReservationId> {
        if self.is_recurring() {
            self.members.iter().map(|r| r.id).collect()
        } else {
            vec![self.target]
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count() <= 1 {
            return f.write_str("does not repeat");
        }
        let label = match self.cadence {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::None => "irregular",
        };
        write!(
            f,
            "{label} · {} ~ {} · {} occurrences",
            self.first_date.format("%b %-d"),
            self.last_date.format("%b %-d"),
            self.count()
        )
    }
}

/// Same room, title, reserver, team and start time of day.
pub fn same_series(a: &Reservation, b: &Reservation) -> bool {
    a.room_id == b.room_id
        && a.title == b.title
        && a.reserver_name == b.reserver_name
        && a.reserver_team == b.reserver_team
        && time::time_of(a.start) == time::time_of(b.start)
}

pub fn infer_series(target: &Reservation, all: &[Reservation]) -> Series {
    let mut members: Vec<Reservation> = all
        .iter()
        .filter(|r| r.id == target.id || same_series(target, r))
        .cloned()
        .collect();
    if !members.iter().any(|r| r.id == target.id) {
        members.push(target.clone());
    }
    members.sort_by_key(|r| (r.start, r.id));

    let target_date = time::date_of(target.start);
    if members.len() < 2 {
        return Series {
            target: target.id,
            members,
            cadence: Cadence::None,
            first_date: target_date,
            last_date: target_date,
        };
    }

    let mut dates: Vec<NaiveDate> = members.iter().map(|r| time::date_of(r.start)).collect();
    dates.sort();
    dates.dedup();

    let gaps: Vec<i64> = dates
        .windows(2)
        .map(|w| time::days_between(w[0], w[1]))
        .collect();
    // Same-day duplicates have no gaps and form no run.
    let cadence = if gaps.is_empty() {
        Cadence::None
    } else if gaps.iter().all(|&g| g == 1) {
        Cadence::Daily
    } else if gaps.iter().all(|&g| g == 7) {
        Cadence::Weekly
    } else {
        Cadence::None
    };

    Series {
        target: target.id,
        cadence,
        first_date: dates[0],
        last_date: dates[dates.len() - 1],
        members,
    }
}
