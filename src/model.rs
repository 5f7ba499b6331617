use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only instant type.
pub type Ms = i64;

pub type RoomId = Ulid;
pub type ReservationId = Ulid;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// `None` when the capacity is unknown.
    pub capacity: Option<u32>,
    pub is_active: bool,
    pub display_order: i32,
}

impl Room {
    pub fn apply(&mut self, patch: &RoomPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(order) = patch.display_order {
            self.display_order = order;
        }
    }
}

/// A room row before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub name: String,
    pub capacity: Option<u32>,
    pub is_active: bool,
    pub display_order: i32,
}

/// Partial room update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub capacity: Option<Option<u32>>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

impl RoomPatch {
    /// Every column of `room`, as the admin "save" button sends it.
    pub fn full(room: &Room) -> Self {
        Self {
            name: Some(room.name.clone()),
            capacity: Some(room.capacity),
            is_active: Some(room.is_active),
            display_order: Some(room.display_order),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.capacity.is_none()
            && self.is_active.is_none()
            && self.display_order.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_id: RoomId,
    pub title: String,
    pub reserver_name: String,
    pub reserver_team: String,
    pub start: Ms,
    pub end: Ms,
    /// Where the row came from, e.g. `"manual"` for the booking desk.
    pub created_by: Option<String>,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn apply(&mut self, patch: &ReservationPatch) {
        if let Some(room_id) = patch.room_id {
            self.room_id = room_id;
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(name) = &patch.reserver_name {
            self.reserver_name = name.clone();
        }
        if let Some(team) = &patch.reserver_team {
            self.reserver_team = team.clone();
        }
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(created_by) = &patch.created_by {
            self.created_by = created_by.clone();
        }
    }
}

/// A reservation row before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub room_id: RoomId,
    pub title: String,
    pub reserver_name: String,
    pub reserver_team: String,
    pub start: Ms,
    pub end: Ms,
    pub created_by: Option<String>,
}

impl NewReservation {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn into_reservation(self, id: ReservationId) -> Reservation {
        Reservation {
            id,
            room_id: self.room_id,
            title: self.title,
            reserver_name: self.reserver_name,
            reserver_team: self.reserver_team,
            start: self.start,
            end: self.end,
            created_by: self.created_by,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub room_id: Option<RoomId>,
    pub title: Option<String>,
    pub reserver_name: Option<String>,
    pub reserver_team: Option<String>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub created_by: Option<Option<String>>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        self.room_id.is_none()
            && self.title.is_none()
            && self.reserver_name.is_none()
            && self.reserver_team.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.created_by.is_none()
    }
}

/// Store mutations, flat with no nesting. This is the WAL record format.
///
/// Updates carry the full resulting row so replay never depends on
/// patch semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomInserted(Room),
    RoomUpdated(Room),
    RoomDeleted {
        id: RoomId,
    },
    ReservationsInserted(Vec<Reservation>),
    ReservationUpdated(Reservation),
    ReservationsDeleted {
        ids: Vec<ReservationId>,
    },
    /// Delete + insert committed as one record.
    ReservationsReplaced {
        deleted: Vec<ReservationId>,
        inserted: Vec<Reservation>,
    },
}
