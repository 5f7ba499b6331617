use chrono::NaiveDate;

use crate::model::ReservationId;
use crate::time::TimeOfDay;

/// A booking request that is rejected before anything is checked against
/// existing reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingRoom,
    MissingTitle,
    MissingTime,
    MissingStartDate,
    /// Repeating requests need an end date.
    MissingEndDate,
    EndNotAfterStart,
    EndDateBeforeStart,
    PastStart,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ValidationError::MissingRoom => "no room selected",
            ValidationError::MissingTitle => "title is required",
            ValidationError::MissingTime => "start and end time are required",
            ValidationError::MissingStartDate => "start date is required",
            ValidationError::MissingEndDate => "end date is required for a repeating reservation",
            ValidationError::EndNotAfterStart => "end time must be later than start time",
            ValidationError::EndDateBeforeStart => "end date must not be before start date",
            ValidationError::PastStart => "cannot book a time that has already passed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Invalid(ValidationError),
    /// The occurrence on `date` from `start` to `end` overlaps `existing`.
    Conflict {
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        existing: ReservationId,
    },
    LimitExceeded(&'static str),
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Invalid(e)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Invalid(e) => write!(f, "invalid request: {e}"),
            EngineError::Conflict {
                date,
                start,
                end,
                existing,
            } => write!(
                f,
                "{date} {start}~{end} overlaps reservation {existing} in this room"
            ),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
