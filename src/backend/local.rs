use async_trait::async_trait;

use crate::model::*;
use crate::store::Store;

use super::{Backend, BackendError};

#[async_trait]
impl Backend for Store {
    async fn rooms(&self) -> Result<Vec<Room>, BackendError> {
        Ok(self.list_rooms(false).await)
    }

    async fn active_rooms(&self) -> Result<Vec<Room>, BackendError> {
        Ok(self.list_rooms(true).await)
    }

    async fn insert_room(&self, room: NewRoom) -> Result<Room, BackendError> {
        Ok(Store::insert_room(self, room).await?)
    }

    async fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<(), BackendError> {
        Store::update_room(self, id, patch).await?;
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), BackendError> {
        Ok(Store::delete_room(self, id).await?)
    }

    async fn reservations(&self) -> Result<Vec<Reservation>, BackendError> {
        Ok(self.list_reservations().await)
    }

    async fn insert_reservations(&self, batch: Vec<NewReservation>) -> Result<Vec<Reservation>, BackendError> {
        Ok(Store::insert_reservations(self, batch).await?)
    }

    async fn update_reservation(&self, id: ReservationId, patch: &ReservationPatch) -> Result<(), BackendError> {
        Store::update_reservation(self, id, patch).await?;
        Ok(())
    }

    async fn delete_reservations(&self, ids: &[ReservationId]) -> Result<usize, BackendError> {
        Ok(Store::delete_reservations(self, ids).await?)
    }

    async fn replace_reservations(
        &self,
        ids: &[ReservationId],
        batch: Vec<NewReservation>,
    ) -> Result<Vec<Reservation>, BackendError> {
        let (_, inserted) = Store::replace_reservations(self, ids, batch).await?;
        Ok(inserted)
    }
}
