use async_trait::async_trait;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use ulid::Ulid;

use crate::model::*;
use crate::sql;
use crate::time;

use super::{Backend, BackendError};

/// `Backend` over the PostgreSQL wire protocol, using plain simple queries.
#[derive(Debug)]
pub struct RemoteStore {
    client: Client,
}

fn remote_err(e: tokio_postgres::Error) -> BackendError {
    match e.as_db_error() {
        Some(db) => BackendError::Remote(db.message().to_string()),
        None => BackendError::Remote(e.to_string()),
    }
}

fn column<'a>(row: &'a SimpleQueryRow, name: &str) -> Result<Option<&'a str>, BackendError> {
    row.try_get(name)
        .map_err(|e| BackendError::Decode(format!("{name}: {e}")))
}

fn required<'a>(row: &'a SimpleQueryRow, name: &str) -> Result<&'a str, BackendError> {
    column(row, name)?.ok_or_else(|| BackendError::Decode(format!("{name} is NULL")))
}

fn decode_ulid(row: &SimpleQueryRow, name: &str) -> Result<Ulid, BackendError> {
    let s = required(row, name)?;
    Ulid::from_string(s).map_err(|e| BackendError::Decode(format!("{name} {s:?}: {e}")))
}

fn decode_number<T: std::str::FromStr>(row: &SimpleQueryRow, name: &str) -> Result<Option<T>, BackendError> {
    column(row, name)?
        .map(|s| {
            s.parse()
                .map_err(|_| BackendError::Decode(format!("{name} {s:?} is not a number")))
        })
        .transpose()
}

fn decode_instant(row: &SimpleQueryRow, name: &str) -> Result<Ms, BackendError> {
    time::parse_iso(required(row, name)?).map_err(|e| BackendError::Decode(format!("{name}: {e}")))
}

fn decode_room(row: &SimpleQueryRow) -> Result<Room, BackendError> {
    Ok(Room {
        id: decode_ulid(row, "id")?,
        name: required(row, "name")?.to_string(),
        capacity: decode_number(row, "capacity")?,
        is_active: matches!(required(row, "is_active")?, "t" | "true"),
        display_order: decode_number(row, "display_order")?.unwrap_or_default(),
    })
}

fn decode_reservation(row: &SimpleQueryRow) -> Result<Reservation, BackendError> {
    Ok(Reservation {
        id: decode_ulid(row, "id")?,
        room_id: decode_ulid(row, "room_id")?,
        title: required(row, "title")?.to_string(),
        reserver_name: required(row, "reserver_name")?.to_string(),
        reserver_team: required(row, "reserver_team")?.to_string(),
        start: decode_instant(row, "start_time")?,
        end: decode_instant(row, "end_time")?,
        created_by: column(row, "created_by")?.map(str::to_string),
    })
}

impl RemoteStore {
    /// Connect and drive the connection on a background task.
    pub async fn connect(config: &Config) -> Result<Self, BackendError> {
        let (client, connection) = config.connect(NoTls).await.map_err(remote_err)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("remote store connection closed: {e}");
            }
        });
        Ok(Self { client })
    }

    async fn query(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>, BackendError> {
        tracing::debug!("remote: {sql}");
        self.client.simple_query(sql).await.map_err(remote_err)
    }

    async fn rows<T>(
        &self,
        sql: &str,
        decode: fn(&SimpleQueryRow) -> Result<T, BackendError>,
    ) -> Result<Vec<T>, BackendError> {
        self.query(sql)
            .await?
            .iter()
            .filter_map(|msg| match msg {
                SimpleQueryMessage::Row(row) => Some(decode(row)),
                _ => None,
            })
            .collect()
    }

    /// Rows affected by the first completed command.
    async fn execute(&self, sql: &str) -> Result<usize, BackendError> {
        let affected = self.query(sql).await?.iter().find_map(|msg| match msg {
            SimpleQueryMessage::CommandComplete(n) => Some(*n as usize),
            _ => None,
        });
        Ok(affected.unwrap_or(0))
    }
}

#[async_trait]
impl Backend for RemoteStore {
    async fn rooms(&self) -> Result<Vec<Room>, BackendError> {
        self.rows("SELECT * FROM rooms ORDER BY display_order", decode_room)
            .await
    }

    async fn active_rooms(&self) -> Result<Vec<Room>, BackendError> {
        self.rows(
            "SELECT * FROM rooms WHERE is_active = true ORDER BY display_order",
            decode_room,
        )
        .await
    }

    async fn insert_room(&self, room: NewRoom) -> Result<Room, BackendError> {
        self.rows(&sql::render_insert_room(&room), decode_room)
            .await?
            .pop()
            .ok_or_else(|| BackendError::Decode("insert returned no row".into()))
    }

    async fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<(), BackendError> {
        if let Some(stmt) = sql::render_update_room(id, patch) {
            self.execute(&stmt).await?;
        }
        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), BackendError> {
        let stmt = format!("DELETE FROM rooms WHERE id = {}", sql::quote(&id.to_string()));
        self.execute(&stmt).await.map(|_| ())
    }

    async fn reservations(&self) -> Result<Vec<Reservation>, BackendError> {
        self.rows("SELECT * FROM reservations ORDER BY start_time", decode_reservation)
            .await
    }

    async fn insert_reservations(&self, batch: Vec<NewReservation>) -> Result<Vec<Reservation>, BackendError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.rows(&sql::render_insert_reservations(&batch), decode_reservation)
            .await
    }

    async fn update_reservation(&self, id: ReservationId, patch: &ReservationPatch) -> Result<(), BackendError> {
        if let Some(stmt) = sql::render_update_reservation(id, patch) {
            self.execute(&stmt).await?;
        }
        Ok(())
    }

    async fn delete_reservations(&self, ids: &[ReservationId]) -> Result<usize, BackendError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.execute(&sql::render_delete_reservations(ids)).await
    }

    /// Both statements go out as one simple query, which the server runs as
    /// a single replace.
    async fn replace_reservations(
        &self,
        ids: &[ReservationId],
        batch: Vec<NewReservation>,
    ) -> Result<Vec<Reservation>, BackendError> {
        match (ids.is_empty(), batch.is_empty()) {
            (true, _) => self.insert_reservations(batch).await,
            (false, true) => self.delete_reservations(ids).await.map(|_| Vec::new()),
            (false, false) => {
                self.rows(&sql::render_replace_reservations(ids, &batch), decode_reservation)
                    .await
            }
        }
    }
}
