//! The table store as the booking desk sees it.
//!
//! `Store` serves it in-process; `RemoteStore` speaks to a `Store` behind
//! the wire server.

mod local;
mod remote;

pub use remote::RemoteStore;

use async_trait::async_trait;

use crate::model::*;
use crate::store::StoreError;

#[derive(Debug)]
pub enum BackendError {
    Store(StoreError),
    /// Error reported by the remote server, verbatim.
    Remote(String),
    /// A row came back in a shape the client cannot read.
    Decode(String),
    /// The delete half of a non-atomic replace went through, the insert did not.
    PartialReplace {
        deleted: usize,
        source: Box<BackendError>,
    },
}

impl From<StoreError> for BackendError {
    fn from(e: StoreError) -> Self {
        BackendError::Store(e)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Store(e) => write!(f, "{e}"),
            BackendError::Remote(msg) => write!(f, "remote error: {msg}"),
            BackendError::Decode(msg) => write!(f, "unreadable row: {msg}"),
            BackendError::PartialReplace { deleted, source } => write!(
                f,
                "{deleted} reservations were deleted but their replacements were not created: {source}"
            ),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Store(e) => Some(e),
            BackendError::PartialReplace { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Every room, by display order.
    async fn rooms(&self) -> Result<Vec<Room>, BackendError>;

    /// Active rooms, by display order.
    async fn active_rooms(&self) -> Result<Vec<Room>, BackendError>;

    async fn insert_room(&self, room: NewRoom) -> Result<Room, BackendError>;

    async fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<(), BackendError>;

    async fn delete_room(&self, id: RoomId) -> Result<(), BackendError>;

    /// Every reservation, by start.
    async fn reservations(&self) -> Result<Vec<Reservation>, BackendError>;

    async fn insert_reservations(&self, batch: Vec<NewReservation>) -> Result<Vec<Reservation>, BackendError>;

    async fn update_reservation(&self, id: ReservationId, patch: &ReservationPatch) -> Result<(), BackendError>;

    async fn delete_reservations(&self, ids: &[ReservationId]) -> Result<usize, BackendError>;

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), BackendError> {
        self.delete_reservations(&[id]).await.map(|_| ())
    }

    /// Delete `ids`, then insert `batch`.
    ///
    /// This default is two calls: when the insert fails the deletions stay
    /// and the error is `PartialReplace`. Backends that can do both in one
    /// step override it.
    async fn replace_reservations(
        &self,
        ids: &[ReservationId],
        batch: Vec<NewReservation>,
    ) -> Result<Vec<Reservation>, BackendError> {
        let deleted = self.delete_reservations(ids).await?;
        self.insert_reservations(batch)
            .await
            .map_err(|e| BackendError::PartialReplace {
                deleted,
                source: Box::new(e),
            })
    }
}
