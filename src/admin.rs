//! Room administration: the room list with local edits, and writes that
//! are refused while another write for the same room is in flight.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::backend::{Backend, BackendError};
use crate::model::*;

#[derive(Debug)]
pub enum AdminError {
    Backend(BackendError),
    BlankName,
    /// Capacity missing or zero.
    InvalidCapacity,
    UnknownRoom(RoomId),
    /// A write for this room has not finished yet.
    Busy(RoomId),
}

impl From<BackendError> for AdminError {
    fn from(e: BackendError) -> Self {
        AdminError::Backend(e)
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminError::Backend(e) => write!(f, "{e}"),
            AdminError::BlankName => write!(f, "room name is required"),
            AdminError::InvalidCapacity => write!(f, "capacity must be a positive number"),
            AdminError::UnknownRoom(id) => write!(f, "room {id} not found"),
            AdminError::Busy(id) => write!(f, "room {id} is already being saved"),
        }
    }
}

impl std::error::Error for AdminError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdminError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

/// Input of the "add room" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomDraft {
    pub name: String,
    pub capacity: Option<u32>,
    /// Defaults to one past the last room.
    pub display_order: Option<i32>,
}

/// Marks a room as saving until dropped.
struct SavingGuard<'a> {
    saving: &'a DashSet<RoomId>,
    id: RoomId,
}

impl<'a> SavingGuard<'a> {
    fn acquire(saving: &'a DashSet<RoomId>, id: RoomId) -> Result<Self, AdminError> {
        if !saving.insert(id) {
            tracing::debug!(%id, "room write refused, one is in flight");
            return Err(AdminError::Busy(id));
        }
        Ok(Self { saving, id })
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.saving.remove(&self.id);
    }
}

pub struct RoomAdmin<B: Backend> {
    backend: Arc<B>,
    /// Last loaded rows plus unsaved local edits.
    rooms: DashMap<RoomId, Room>,
    saving: DashSet<RoomId>,
}

impl<B: Backend> RoomAdmin<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            rooms: DashMap::new(),
            saving: DashSet::new(),
        }
    }

    /// Replace the local list with every room, active or not. Local edits
    /// are dropped.
    pub async fn load(&self) -> Result<(), AdminError> {
        let rooms = self.backend.rooms().await?;
        self.rooms.clear();
        for room in rooms {
            self.rooms.insert(room.id, room);
        }
        Ok(())
    }

    /// Rooms by display order.
    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|r| r.value().clone()).collect();
        rooms.sort_by(|a, b| {
            (a.display_order, &a.name, a.id).cmp(&(b.display_order, &b.name, b.id))
        });
        rooms
    }

    pub fn room(&self, id: RoomId) -> Option<Room> {
        self.rooms.get(&id).map(|r| r.value().clone())
    }

    pub fn is_saving(&self, id: RoomId) -> bool {
        self.saving.contains(&id)
    }

    pub async fn add_room(&self, draft: RoomDraft) -> Result<Room, AdminError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AdminError::BlankName);
        }
        let capacity = match draft.capacity {
            Some(c) if c > 0 => c,
            _ => return Err(AdminError::InvalidCapacity),
        };
        let display_order = draft.display_order.unwrap_or_else(|| {
            self.rooms()
                .last()
                .map(|r| r.display_order + 1)
                .unwrap_or(1)
        });
        let room = self
            .backend
            .insert_room(NewRoom {
                name: name.to_string(),
                capacity: Some(capacity),
                is_active: true,
                display_order,
            })
            .await?;
        tracing::info!(id = %room.id, name = %room.name, "room added");
        self.load().await?;
        Ok(room)
    }

    /// Change the local copy of a room. Nothing is written until `save_room`.
    pub fn edit(&self, id: RoomId, f: impl FnOnce(&mut Room)) -> Result<(), AdminError> {
        let mut room = self.rooms.get_mut(&id).ok_or(AdminError::UnknownRoom(id))?;
        f(room.value_mut());
        Ok(())
    }

    /// Write every column of the local copy.
    pub async fn save_room(&self, id: RoomId) -> Result<(), AdminError> {
        let _guard = SavingGuard::acquire(&self.saving, id)?;
        let patch = RoomPatch::full(&self.room(id).ok_or(AdminError::UnknownRoom(id))?);
        self.backend.update_room(id, &patch).await?;
        self.load().await
    }

    pub async fn toggle_active(&self, id: RoomId) -> Result<(), AdminError> {
        let _guard = SavingGuard::acquire(&self.saving, id)?;
        let room = self.room(id).ok_or(AdminError::UnknownRoom(id))?;
        let patch = RoomPatch {
            is_active: Some(!room.is_active),
            ..Default::default()
        };
        self.backend.update_room(id, &patch).await?;
        self.load().await
    }

    /// The room's reservations stay in the store.
    pub async fn delete_room(&self, id: RoomId) -> Result<(), AdminError> {
        let _guard = SavingGuard::acquire(&self.saving, id)?;
        if !self.rooms.contains_key(&id) {
            return Err(AdminError::UnknownRoom(id));
        }
        self.backend.delete_room(id).await?;
        tracing::info!(%id, "room deleted");
        self.load().await
    }
}
