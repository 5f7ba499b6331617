//! WAL-backed table store for rooms and reservations.
//!
//! The store validates rows (non-empty text, sane spans, size limits) but
//! knows nothing about overlapping reservations; that check belongs to the
//! client holding a snapshot.

mod error;
mod writer;

pub use error::StoreError;

use std::collections::HashMap;
use std::path::Path;

use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::wal::Wal;

use writer::{wal_writer_loop, WalCommand};

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Tables {
    /// Apply a committed event. Also the replay path, so it must accept
    /// events for rows that no longer exist.
    fn apply(&mut self, event: &Event) {
        match event {
            Event::RoomInserted(room) | Event::RoomUpdated(room) => {
                self.rooms.insert(room.id, room.clone());
            }
            Event::RoomDeleted { id } => {
                self.rooms.remove(id);
            }
            Event::ReservationsInserted(rows) => {
                for r in rows {
                    self.reservations.insert(r.id, r.clone());
                }
            }
            Event::ReservationUpdated(r) => {
                self.reservations.insert(r.id, r.clone());
            }
            Event::ReservationsDeleted { ids } => {
                for id in ids {
                    self.reservations.remove(id);
                }
            }
            Event::ReservationsReplaced { deleted, inserted } => {
                for id in deleted {
                    self.reservations.remove(id);
                }
                for r in inserted {
                    self.reservations.insert(r.id, r.clone());
                }
            }
        }
    }

    /// Events that rebuild exactly this state.
    fn snapshot(&self) -> Vec<Event> {
        let mut rooms: Vec<&Room> = self.rooms.values().collect();
        rooms.sort_by_key(|r| r.id);
        let mut events: Vec<Event> = rooms.into_iter().cloned().map(Event::RoomInserted).collect();

        let mut rows: Vec<Reservation> = self.reservations.values().cloned().collect();
        rows.sort_by_key(|r| (r.start, r.id));
        events.extend(
            rows.chunks(MAX_BATCH_SIZE)
                .map(|chunk| Event::ReservationsInserted(chunk.to_vec())),
        );
        events
    }
}

pub struct Store {
    tables: RwLock<Tables>,
    wal_tx: mpsc::Sender<WalCommand>,
}

fn validate_room(room: &Room) -> Result<(), StoreError> {
    if room.name.trim().is_empty() {
        return Err(StoreError::Blank("name"));
    }
    if room.name.len() > MAX_NAME_LEN {
        return Err(StoreError::LimitExceeded("room name too long"));
    }
    Ok(())
}

fn validate_reservation(r: &Reservation) -> Result<(), StoreError> {
    if r.start >= r.end
        || r.start < MIN_VALID_TIMESTAMP_MS
        || r.end > MAX_VALID_TIMESTAMP_MS
        || r.end - r.start > MAX_SPAN_DURATION_MS
    {
        return Err(StoreError::InvalidSpan { start: r.start, end: r.end });
    }
    if r.title.trim().is_empty() {
        return Err(StoreError::Blank("title"));
    }
    if r.title.len() > MAX_TITLE_LEN {
        return Err(StoreError::LimitExceeded("title too long"));
    }
    if r.reserver_name.len() > MAX_NAME_LEN || r.reserver_team.len() > MAX_NAME_LEN {
        return Err(StoreError::LimitExceeded("reserver name or team too long"));
    }
    if r.created_by.as_ref().is_some_and(|t| t.len() > MAX_TAG_LEN) {
        return Err(StoreError::LimitExceeded("created_by tag too long"));
    }
    Ok(())
}

impl Store {
    /// Replay the log at `wal_path` and start its writer task. Must be
    /// called inside a tokio runtime.
    pub fn open(wal_path: &Path) -> std::io::Result<Self> {
        let events = Wal::replay(wal_path)?;
        let wal = Wal::open(wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut tables = Tables::default();
        for event in &events {
            tables.apply(event);
        }
        tracing::info!(
            "store opened: {} events replayed, {} rooms, {} reservations",
            events.len(),
            tables.rooms.len(),
            tables.reservations.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            wal_tx,
        })
    }

    async fn wal_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    /// Log, then apply. Callers hold the write lock so log order is apply order.
    async fn persist_and_apply(&self, tables: &mut Tables, event: Event) -> Result<(), StoreError> {
        self.wal_append(&event).await?;
        tables.apply(&event);
        Ok(())
    }

    // ── Rooms ────────────────────────────────────────────────

    /// Rooms ordered by display order, then name.
    pub async fn list_rooms(&self, active_only: bool) -> Vec<Room> {
        let tables = self.tables.read().await;
        let mut rooms: Vec<Room> = tables
            .rooms
            .values()
            .filter(|r| !active_only || r.is_active)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| {
            (a.display_order, &a.name, a.id).cmp(&(b.display_order, &b.name, b.id))
        });
        rooms
    }

    pub async fn insert_room(&self, new: NewRoom) -> Result<Room, StoreError> {
        let room = Room {
            id: Ulid::new(),
            name: new.name,
            capacity: new.capacity,
            is_active: new.is_active,
            display_order: new.display_order,
        };
        validate_room(&room)?;

        let mut tables = self.tables.write().await;
        if tables.rooms.len() >= MAX_ROOMS {
            return Err(StoreError::LimitExceeded("too many rooms"));
        }
        self.persist_and_apply(&mut tables, Event::RoomInserted(room.clone()))
            .await?;
        Ok(room)
    }

    pub async fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<Room, StoreError> {
        let mut tables = self.tables.write().await;
        let mut room = tables.rooms.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(room);
        }
        room.apply(patch);
        validate_room(&room)?;
        self.persist_and_apply(&mut tables, Event::RoomUpdated(room.clone()))
            .await?;
        Ok(room)
    }

    /// Reservations pointing at the room are left in place.
    pub async fn delete_room(&self, id: RoomId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.rooms.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        self.persist_and_apply(&mut tables, Event::RoomDeleted { id })
            .await
    }

    // ── Reservations ─────────────────────────────────────────

    /// All reservations ordered by start.
    pub async fn list_reservations(&self) -> Vec<Reservation> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Reservation> = tables.reservations.values().cloned().collect();
        rows.sort_by_key(|r| (r.start, r.id));
        rows
    }

    fn prepare_rows(tables: &Tables, batch: Vec<NewReservation>, freed: usize) -> Result<Vec<Reservation>, StoreError> {
        if batch.len() > MAX_BATCH_SIZE {
            return Err(StoreError::LimitExceeded("batch too large"));
        }
        if tables.reservations.len() - freed + batch.len() > MAX_RESERVATIONS {
            return Err(StoreError::LimitExceeded("too many reservations"));
        }
        let rows: Vec<Reservation> = batch
            .into_iter()
            .map(|n| n.into_reservation(Ulid::new()))
            .collect();
        for r in &rows {
            validate_reservation(r)?;
            if !tables.rooms.contains_key(&r.room_id) {
                return Err(StoreError::NotFound(r.room_id));
            }
        }
        Ok(rows)
    }

    /// Insert every row or none. Returns the stored rows with their new ids.
    pub async fn insert_reservations(&self, batch: Vec<NewReservation>) -> Result<Vec<Reservation>, StoreError> {
        let mut tables = self.tables.write().await;
        let rows = Self::prepare_rows(&tables, batch, 0)?;
        if rows.is_empty() {
            return Ok(rows);
        }
        self.persist_and_apply(&mut tables, Event::ReservationsInserted(rows.clone()))
            .await?;
        Ok(rows)
    }

    pub async fn update_reservation(
        &self,
        id: ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation, StoreError> {
        let mut tables = self.tables.write().await;
        let mut row = tables
            .reservations
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(row);
        }
        row.apply(patch);
        validate_reservation(&row)?;
        if !tables.rooms.contains_key(&row.room_id) {
            return Err(StoreError::NotFound(row.room_id));
        }
        self.persist_and_apply(&mut tables, Event::ReservationUpdated(row.clone()))
            .await?;
        Ok(row)
    }

    /// Delete whichever of `ids` exist. Returns how many were removed.
    pub async fn delete_reservations(&self, ids: &[ReservationId]) -> Result<usize, StoreError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(StoreError::LimitExceeded("batch too large"));
        }
        let mut tables = self.tables.write().await;
        let present = existing_ids(&tables, ids);
        if present.is_empty() {
            return Ok(0);
        }
        let count = present.len();
        self.persist_and_apply(&mut tables, Event::ReservationsDeleted { ids: present })
            .await?;
        Ok(count)
    }

    /// Delete `ids` and insert `batch` as one logged event: both happen or
    /// neither does. Returns how many rows were removed, unknown ids not
    /// counted, and the stored new rows.
    pub async fn replace_reservations(
        &self,
        ids: &[ReservationId],
        batch: Vec<NewReservation>,
    ) -> Result<(usize, Vec<Reservation>), StoreError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(StoreError::LimitExceeded("batch too large"));
        }
        let mut tables = self.tables.write().await;
        let deleted = existing_ids(&tables, ids);
        let inserted = Self::prepare_rows(&tables, batch, deleted.len())?;
        if deleted.is_empty() && inserted.is_empty() {
            return Ok((0, inserted));
        }
        let count = deleted.len();
        let event = Event::ReservationsReplaced {
            deleted,
            inserted: inserted.clone(),
        };
        self.persist_and_apply(&mut tables, event).await?;
        Ok((count, inserted))
    }

    // ── Maintenance ──────────────────────────────────────────

    /// Rewrite the log as a snapshot of the current tables.
    pub async fn compact(&self) -> Result<(), StoreError> {
        // The read lock keeps writers out until the snapshot is on disk.
        let tables = self.tables.read().await;
        let events = tables.snapshot();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// `ids` that are present, deduplicated, in request order.
fn existing_ids(tables: &Tables, ids: &[ReservationId]) -> Vec<ReservationId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| tables.reservations.contains_key(id) && seen.insert(*id))
        .collect()
}
