//! Booking modal: the form, its validation and the open/close transitions.

use chrono::NaiveDate;

use crate::engine::{
    check_not_past, expand, Cadence, DailySlot, EngineError, ReservationFields, Series, ValidationError,
};
use crate::model::*;
use crate::time::{self, TimeOfDay};

/// Tag the desk writes into `created_by`.
pub const CREATED_BY_DESK: &str = "manual";

/// Field values of the booking modal as the user left them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub room_id: Option<RoomId>,
    pub title: String,
    pub reserver_name: String,
    pub reserver_team: String,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
    pub cadence: Cadence,
    pub start_date: Option<NaiveDate>,
    /// Only read when `cadence` repeats.
    pub end_date: Option<NaiveDate>,
}

/// A form that passed validation, ready for the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub slot: DailySlot,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub fields: ReservationFields,
}

impl BookingForm {
    /// Form for an existing reservation, every field taken from it.
    pub fn from_reservation(r: &Reservation) -> Self {
        let date = time::date_of(r.start);
        Self {
            room_id: Some(r.room_id),
            title: r.title.clone(),
            reserver_name: r.reserver_name.clone(),
            reserver_team: r.reserver_team.clone(),
            start: Some(time::time_of(r.start)),
            end: Some(time::time_of(r.end)),
            cadence: Cadence::None,
            start_date: Some(date),
            end_date: Some(date),
        }
    }

    /// Checks run in the order the user sees them: required fields, time
    /// order, date order, then the past-start rule against `now`.
    pub fn validate_request(&self, now: Ms) -> Result<BookingRequest, EngineError> {
        let room_id = self.room_id.ok_or(ValidationError::MissingRoom)?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle.into());
        }
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(ValidationError::MissingTime.into());
        };
        let start_date = self.start_date.ok_or(ValidationError::MissingStartDate)?;
        let end_date = if self.cadence.repeats() {
            self.end_date.ok_or(ValidationError::MissingEndDate)?
        } else {
            start_date
        };

        let slot = DailySlot { room_id, start, end };
        slot.validate()?;
        if end_date < start_date {
            return Err(ValidationError::EndDateBeforeStart.into());
        }
        check_not_past(start_date, start, now)?;

        Ok(BookingRequest {
            slot,
            cadence: self.cadence,
            start_date,
            dates: expand(start_date, end_date, self.cadence)?,
            fields: ReservationFields {
                title: self.title.clone(),
                reserver_name: self.reserver_name.clone(),
                reserver_team: self.reserver_team.clone(),
                created_by: Some(CREATED_BY_DESK.to_string()),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Closed,
    Creating,
    Viewing,
    Editing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Creating {
        form: BookingForm,
    },
    Viewing {
        target: Reservation,
    },
    Editing {
        target: Reservation,
        series: Series,
        form: BookingForm,
    },
}

/// A transition that the current mode does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: Mode,
    pub action: &'static str,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} while the booking modal is {:?}", self.action, self.from)
    }
}

impl std::error::Error for TransitionError {}

impl Modal {
    pub fn mode(&self) -> Mode {
        match self {
            Modal::Closed => Mode::Closed,
            Modal::Creating { .. } => Mode::Creating,
            Modal::Viewing { .. } => Mode::Viewing,
            Modal::Editing { .. } => Mode::Editing,
        }
    }

    fn refuse<T>(&self, action: &'static str) -> Result<T, TransitionError> {
        Err(TransitionError {
            from: self.mode(),
            action,
        })
    }

    /// Start a new booking. Any half-filled form is discarded.
    pub fn create(&mut self, form: BookingForm) {
        *self = Modal::Creating { form };
    }

    pub fn view(&mut self, target: Reservation) {
        *self = Modal::Viewing { target };
    }

    /// `viewing -> editing`, prefilled from the inferred series.
    pub fn edit(&mut self, series: Series) -> Result<(), TransitionError> {
        let Modal::Viewing { target } = self else {
            return self.refuse("edit");
        };
        let mut form = BookingForm::from_reservation(target);
        form.cadence = series.cadence;
        if series.cadence.repeats() {
            form.end_date = Some(series.last_date);
        }
        *self = Modal::Editing {
            target: target.clone(),
            series,
            form,
        };
        Ok(())
    }

    /// The editable form, in `creating` or `editing`.
    pub fn form_mut(&mut self) -> Result<&mut BookingForm, TransitionError> {
        let from = self.mode();
        match self {
            Modal::Creating { form } | Modal::Editing { form, .. } => Ok(form),
            _ => Err(TransitionError {
                from,
                action: "change the form",
            }),
        }
    }

    pub fn form(&self) -> Option<&BookingForm> {
        match self {
            Modal::Creating { form } | Modal::Editing { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&Reservation> {
        match self {
            Modal::Viewing { target } | Modal::Editing { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn close(&mut self) {
        *self = Modal::Closed;
    }
}
