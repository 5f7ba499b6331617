use std::collections::HashSet;

use chrono::NaiveDate;

use crate::limits::MAX_OCCURRENCES;
use crate::model::*;
use crate::time::{self, TimeOfDay};

use super::conflict::first_conflict;
use super::series::{Cadence, Series};
use super::{EngineError, ValidationError};

/// Room plus the time-of-day window every occurrence uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySlot {
    pub room_id: RoomId,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl DailySlot {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end <= self.start {
            return Err(ValidationError::EndNotAfterStart);
        }
        Ok(())
    }

    pub fn span_on(&self, date: NaiveDate) -> Span {
        Span::new(time::at(date, self.start), time::at(date, self.end))
    }
}

/// Columns copied onto every occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFields {
    pub title: String,
    pub reserver_name: String,
    pub reserver_team: String,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub to_delete: Vec<ReservationId>,
    pub to_create: Vec<NewReservation>,
}

/// Dates from `start` through `end` inclusive. A one-off ignores `end`.
pub fn expand(start: NaiveDate, end: NaiveDate, cadence: Cadence) -> Result<Vec<NaiveDate>, EngineError> {
    let Some(step) = cadence.step_days() else {
        return Ok(vec![start]);
    };
    let mut dates = Vec::new();
    let mut cursor = Some(start);
    while let Some(date) = cursor
        && date <= end
    {
        if dates.len() == MAX_OCCURRENCES {
            return Err(EngineError::LimitExceeded("too many occurrences"));
        }
        dates.push(date);
        cursor = time::add_days(date, step);
    }
    Ok(dates)
}

/// Occurrences for `dates`, all-or-nothing against `existing`.
pub fn plan_create(
    slot: &DailySlot,
    dates: &[NaiveDate],
    fields: &ReservationFields,
    existing: &[Reservation],
) -> Result<Vec<NewReservation>, EngineError> {
    materialize(slot, dates, fields, existing, &HashSet::new())
}

/// Replace the series (or the lone target) with occurrences for `dates`.
/// The rows being replaced never conflict with their replacements.
pub fn plan_edit(
    series: &Series,
    slot: &DailySlot,
    dates: &[NaiveDate],
    fields: &ReservationFields,
    existing: &[Reservation],
) -> Result<EditPlan, EngineError> {
    let to_delete = series.affected_ids();
    let exclude: HashSet<ReservationId> = to_delete.iter().copied().collect();
    let to_create = materialize(slot, dates, fields, existing, &exclude)?;
    Ok(EditPlan { to_delete, to_create })
}

/// Move a single occurrence in place. Only the target itself is excluded
/// from the overlap check.
pub fn plan_update(
    target: &Reservation,
    slot: &DailySlot,
    date: NaiveDate,
    fields: &ReservationFields,
    existing: &[Reservation],
) -> Result<ReservationPatch, EngineError> {
    slot.validate()?;
    let span = slot.span_on(date);
    let exclude = HashSet::from([target.id]);
    if let Some(hit) = first_conflict(slot.room_id, &span, existing, &exclude) {
        return Err(EngineError::Conflict {
            date,
            start: slot.start,
            end: slot.end,
            existing: hit.id,
        });
    }
    Ok(ReservationPatch {
        room_id: Some(slot.room_id),
        title: Some(fields.title.clone()),
        reserver_name: Some(fields.reserver_name.clone()),
        reserver_team: Some(fields.reserver_team.clone()),
        start: Some(span.start),
        end: Some(span.end),
        created_by: None,
    })
}

fn materialize(
    slot: &DailySlot,
    dates: &[NaiveDate],
    fields: &ReservationFields,
    existing: &[Reservation],
    exclude: &HashSet<ReservationId>,
) -> Result<Vec<NewReservation>, EngineError> {
    slot.validate()?;
    if dates.len() > MAX_OCCURRENCES {
        return Err(EngineError::LimitExceeded("too many occurrences"));
    }

    let mut records = Vec::with_capacity(dates.len());
    for &date in dates {
        let span = slot.span_on(date);
        if let Some(hit) = first_conflict(slot.room_id, &span, existing, exclude) {
            return Err(EngineError::Conflict {
                date,
                start: slot.start,
                end: slot.end,
                existing: hit.id,
            });
        }
        records.push(NewReservation {
            room_id: slot.room_id,
            title: fields.title.clone(),
            reserver_name: fields.reserver_name.clone(),
            reserver_team: fields.reserver_team.clone(),
            start: span.start,
            end: span.end,
            created_by: fields.created_by.clone(),
        });
    }
    Ok(records)
}
