use crate::model::Ms;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// A single reservation may not run longer than one day.
pub const MAX_SPAN_DURATION_MS: Ms = 86_400_000;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_TITLE_LEN: usize = 512;
pub const MAX_TAG_LEN: usize = 64;

pub const MAX_ROOMS: usize = 1_000;
pub const MAX_RESERVATIONS: usize = 1_000_000;

/// Rows per INSERT / ids per DELETE ... IN.
pub const MAX_BATCH_SIZE: usize = 1_000;

/// Upper bound on the dates one repeat rule may expand to.
pub const MAX_OCCURRENCES: usize = 366;

/// A start instant may lie this far in the past and still be booked.
pub const PAST_GRACE_MS: Ms = 30 * 60_000;

/// First and last bookable minute of the calendar grid (08:00, 18:00).
pub const DAY_START_MINUTE: u16 = 8 * 60;
pub const DAY_END_MINUTE: u16 = 18 * 60;
pub const SLOT_MINUTES: u16 = 30;

/// Search hits shown before "show all" is requested.
pub const SEARCH_PREVIEW_LEN: usize = 10;
