use std::collections::HashSet;

use chrono::NaiveDate;

use crate::limits::PAST_GRACE_MS;
use crate::model::*;
use crate::time::{self, TimeOfDay};

use super::ValidationError;

/// True if `span` in `room_id` overlaps any reservation not in `exclude`.
pub fn conflicts(
    room_id: RoomId,
    span: &Span,
    existing: &[Reservation],
    exclude: &HashSet<ReservationId>,
) -> bool {
    first_conflict(room_id, span, existing, exclude).is_some()
}

/// The first reservation (in snapshot order) that blocks `span`.
pub fn first_conflict<'a>(
    room_id: RoomId,
    span: &Span,
    existing: &'a [Reservation],
    exclude: &HashSet<ReservationId>,
) -> Option<&'a Reservation> {
    existing
        .iter()
        .filter(|r| r.room_id == room_id && !exclude.contains(&r.id))
        .find(|r| r.end > span.start && r.start < span.end)
}

/// Reject a start that lies more than the grace window before `now`.
pub fn check_not_past(date: NaiveDate, start: TimeOfDay, now: Ms) -> Result<(), ValidationError> {
    if time::at(date, start) + PAST_GRACE_MS < now {
        return Err(ValidationError::PastStart);
    }
    Ok(())
}
