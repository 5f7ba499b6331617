//! Reservation conflict and repeat-series reasoning.
//!
//! Everything here is a pure function over a snapshot of reservations the
//! caller already holds. Nothing talks to the store.

mod conflict;
mod error;
mod plan;
mod series;

pub use conflict::{check_not_past, conflicts, first_conflict};
pub use error::{EngineError, ValidationError};
pub use plan::{expand, plan_create, plan_edit, plan_update, DailySlot, EditPlan, ReservationFields};
pub use series::{infer_series, same_series, Cadence, Series};
