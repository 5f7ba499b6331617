//! The booking desk: one user's view of the week grid, the booking modal
//! and search, driving a `Backend`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::backend::{Backend, BackendError};
use crate::calendar::{self, Block};
use crate::engine::{check_not_past, infer_series, plan_create, plan_edit, plan_update, EngineError};
use crate::model::*;
use crate::observability::BOOKING_CONFLICTS_TOTAL;
use crate::profile::{Profile, ProfileError};
use crate::search::{self, SearchView};
use crate::time::{self, TimeOfDay};
use crate::workflow::{BookingForm, Modal, Mode, TransitionError};

#[derive(Debug)]
pub enum DeskError {
    Backend(BackendError),
    /// Validation or conflict. The modal stays open.
    Engine(EngineError),
    Transition(TransitionError),
    Profile(ProfileError),
    UnknownRoom(RoomId),
    UnknownReservation(ReservationId),
}

impl From<BackendError> for DeskError {
    fn from(e: BackendError) -> Self {
        DeskError::Backend(e)
    }
}

impl From<EngineError> for DeskError {
    fn from(e: EngineError) -> Self {
        DeskError::Engine(e)
    }
}

impl From<TransitionError> for DeskError {
    fn from(e: TransitionError) -> Self {
        DeskError::Transition(e)
    }
}

impl From<ProfileError> for DeskError {
    fn from(e: ProfileError) -> Self {
        DeskError::Profile(e)
    }
}

impl std::fmt::Display for DeskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeskError::Backend(e) => write!(f, "{e}"),
            DeskError::Engine(e) => write!(f, "{e}"),
            DeskError::Transition(e) => write!(f, "{e}"),
            DeskError::Profile(e) => write!(f, "{e}"),
            DeskError::UnknownRoom(id) => write!(f, "room {id} is not on the grid"),
            DeskError::UnknownReservation(id) => write!(f, "reservation {id} not found"),
        }
    }
}

impl std::error::Error for DeskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeskError::Backend(e) => Some(e),
            DeskError::Engine(e) => Some(e),
            DeskError::Transition(e) => Some(e),
            DeskError::Profile(e) => Some(e),
            _ => None,
        }
    }
}

/// What a successful submit wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

pub struct Desk<B: Backend> {
    backend: Arc<B>,
    profile: Profile,
    selected_date: NaiveDate,
    modal: Modal,
    search_query: String,
    show_all: bool,
    rooms: Vec<Room>,
    reservations: Vec<Reservation>,
}

impl<B: Backend> Desk<B> {
    /// A desk on `today`. Call `reload` before reading the grid.
    pub fn new(backend: Arc<B>, profile: Profile, today: NaiveDate) -> Self {
        Self {
            backend,
            profile,
            selected_date: today,
            modal: Modal::Closed,
            search_query: String::new(),
            show_all: false,
            rooms: Vec::new(),
            reservations: Vec::new(),
        }
    }

    /// Active rooms by display order and every reservation by start.
    pub async fn reload(&mut self) -> Result<(), DeskError> {
        self.rooms = self.backend.active_rooms().await?;
        self.reservations = self.backend.reservations().await?;
        tracing::debug!(
            rooms = self.rooms.len(),
            reservations = self.reservations.len(),
            "desk reloaded"
        );
        Ok(())
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn mode(&self) -> Mode {
        self.modal.mode()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn set_display_name(&mut self, name: &str) -> Result<(), DeskError> {
        Ok(self.profile.set_display_name(name)?)
    }

    // ── week grid ───────────────────────────────────────────────

    pub fn week(&self) -> [NaiveDate; 5] {
        calendar::weekdays(self.selected_date)
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
    }

    pub fn prev_week(&mut self) {
        if let Some(date) = time::sub_days(self.selected_date, 7) {
            self.selected_date = date;
        }
    }

    pub fn next_week(&mut self) {
        if let Some(date) = time::add_days(self.selected_date, 7) {
            self.selected_date = date;
        }
    }

    pub fn go_today(&mut self, today: NaiveDate) {
        self.selected_date = today;
    }

    /// Blocks of one room's column on `date`. The grid shows only
    /// reservations matching the current search.
    pub fn day_blocks(&self, room_id: RoomId, date: NaiveDate, now: Ms) -> Vec<Block> {
        let visible: Vec<Reservation> = search::filter(&self.reservations, &self.search_query)
            .into_iter()
            .cloned()
            .collect();
        calendar::room_day(room_id, date, &visible, now)
    }

    // ── booking modal ───────────────────────────────────────────

    /// Open a new booking on an empty slot.
    pub fn open_slot(
        &mut self,
        room_id: RoomId,
        date: NaiveDate,
        slot: TimeOfDay,
        now: Ms,
    ) -> Result<(), DeskError> {
        if !self.rooms.iter().any(|r| r.id == room_id) {
            return Err(DeskError::UnknownRoom(room_id));
        }
        check_not_past(date, slot, now).map_err(EngineError::from)?;
        self.modal.create(BookingForm {
            room_id: Some(room_id),
            reserver_name: self.profile.display_name().unwrap_or_default().to_string(),
            start: Some(slot),
            end: Some(calendar::default_end(slot)),
            start_date: Some(date),
            end_date: Some(date),
            ..Default::default()
        });
        Ok(())
    }

    pub fn open_reservation(&mut self, id: ReservationId) -> Result<(), DeskError> {
        let target = self
            .reservations
            .iter()
            .find(|r| r.id == id)
            .ok_or(DeskError::UnknownReservation(id))?;
        self.modal.view(target.clone());
        Ok(())
    }

    /// `viewing -> editing`, with cadence and date range inferred from the
    /// reservations that look like the same series.
    pub fn begin_edit(&mut self) -> Result<(), DeskError> {
        let series = match self.modal.target() {
            Some(target) if self.modal.mode() == Mode::Viewing => infer_series(target, &self.reservations),
            _ => {
                return Err(TransitionError {
                    from: self.modal.mode(),
                    action: "edit",
                }
                .into());
            }
        };
        Ok(self.modal.edit(series)?)
    }

    pub fn form_mut(&mut self) -> Result<&mut BookingForm, DeskError> {
        Ok(self.modal.form_mut()?)
    }

    pub fn close(&mut self) {
        self.modal.close();
    }

    /// Validate, plan and write the open form. On any error the modal is
    /// left as it was. Once the write is in, the result is `Ok` even if the
    /// refresh after it fails; the grid then stays stale until `reload`.
    pub async fn submit(&mut self, now: Ms) -> Result<Submitted, DeskError> {
        let result = self.write_form(now).await;
        match &result {
            Ok(done) => {
                tracing::info!(
                    created = done.created,
                    updated = done.updated,
                    deleted = done.deleted,
                    "booking saved"
                );
                self.modal.close();
                self.reload_after_write().await;
            }
            Err(DeskError::Engine(EngineError::Conflict { date, existing, .. })) => {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                tracing::debug!(%date, %existing, "booking conflicts");
            }
            Err(_) => {}
        }
        result
    }

    async fn write_form(&self, now: Ms) -> Result<Submitted, DeskError> {
        match &self.modal {
            Modal::Creating { form } => {
                let req = form.validate_request(now)?;
                let batch = plan_create(&req.slot, &req.dates, &req.fields, &self.reservations)?;
                let created = self.backend.insert_reservations(batch).await?.len();
                Ok(Submitted {
                    created,
                    updated: 0,
                    deleted: 0,
                })
            }
            Modal::Editing { target, series, form } => {
                let req = form.validate_request(now)?;
                if !req.cadence.repeats() {
                    let patch = plan_update(target, &req.slot, req.start_date, &req.fields, &self.reservations)?;
                    self.backend.update_reservation(target.id, &patch).await?;
                    return Ok(Submitted {
                        created: 0,
                        updated: 1,
                        deleted: 0,
                    });
                }
                let plan = plan_edit(series, &req.slot, &req.dates, &req.fields, &self.reservations)?;
                let deleted = plan.to_delete.len();
                let created = self
                    .backend
                    .replace_reservations(&plan.to_delete, plan.to_create)
                    .await?
                    .len();
                Ok(Submitted {
                    created,
                    updated: 0,
                    deleted,
                })
            }
            _ => Err(TransitionError {
                from: self.modal.mode(),
                action: "submit",
            }
            .into()),
        }
    }

    /// Delete the reservation being viewed. Other occurrences of its series
    /// are left alone. Like `submit`, a failed refresh afterwards is not an
    /// error.
    pub async fn cancel_reservation(&mut self) -> Result<(), DeskError> {
        let id = match &self.modal {
            Modal::Viewing { target } => target.id,
            other => {
                return Err(TransitionError {
                    from: other.mode(),
                    action: "cancel a reservation",
                }
                .into());
            }
        };
        self.backend.delete_reservation(id).await?;
        tracing::info!(%id, "reservation cancelled");
        self.modal.close();
        self.reload_after_write().await;
        Ok(())
    }

    async fn reload_after_write(&mut self) {
        if let Err(e) = self.reload().await {
            tracing::warn!("saved, but the desk could not refresh: {e}");
        }
    }

    // ── search ──────────────────────────────────────────────────

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Clearing the query also collapses "show all".
    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.to_string();
        if query.trim().is_empty() {
            self.show_all = false;
        }
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        self.show_all = show_all;
    }

    /// `None` while the query is blank: no results panel.
    pub fn search_results(&self, today: NaiveDate) -> Option<SearchView> {
        if self.search_query.trim().is_empty() {
            return None;
        }
        Some(search::search(&self.reservations, &self.search_query, today, self.show_all))
    }

    /// Jump the grid to the hit's date and show it.
    pub fn open_search_hit(&mut self, id: ReservationId) -> Result<(), DeskError> {
        let date = self
            .reservations
            .iter()
            .find(|r| r.id == id)
            .map(|r| time::date_of(r.start))
            .ok_or(DeskError::UnknownReservation(id))?;
        self.selected_date = date;
        self.open_reservation(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Cadence, ValidationError};
    use crate::store::Store;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn d(s: &str) -> NaiveDate {
        time::parse_date(s).unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roombook_test_desk").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Monday 2024-06-03, 08:00.
    fn monday_morning() -> Ms {
        time::at(d("2024-06-03"), t("08:00"))
    }

    async fn desk(name: &str) -> (Desk<Store>, Arc<Store>, Room) {
        let dir = test_dir(name);
        let store = Arc::new(Store::open(&dir.join("roombook.wal")).unwrap());
        let room = store
            .insert_room(NewRoom {
                name: "Lyra".into(),
                capacity: Some(4),
                is_active: true,
                display_order: 1,
            })
            .await
            .unwrap();
        let mut profile = Profile::load(&dir.join("profile.json")).unwrap();
        profile.set_display_name("Choi").unwrap();
        let mut desk = Desk::new(store.clone(), profile, d("2024-06-03"));
        desk.reload().await.unwrap();
        (desk, store, room)
    }

    async fn book(desk: &mut Desk<Store>, room: RoomId, date: &str, start: &str, title: &str) {
        desk.open_slot(room, d(date), t(start), monday_morning()).unwrap();
        desk.form_mut().unwrap().title = title.into();
        desk.submit(monday_morning()).await.unwrap();
    }

    #[tokio::test]
    async fn slot_click_prefills_form() {
        let (mut desk, _, room) = desk("prefill").await;
        desk.open_slot(room.id, d("2024-06-04"), t("17:45"), monday_morning())
            .unwrap();
        let form = desk.modal().form().unwrap();
        assert_eq!(desk.mode(), Mode::Creating);
        assert_eq!(form.reserver_name, "Choi");
        assert_eq!(form.end, Some(t("18:00")));
        assert_eq!(form.start_date, Some(d("2024-06-04")));
        assert_eq!(form.end_date, Some(d("2024-06-04")));
        assert_eq!(form.cadence, Cadence::None);
    }

    #[tokio::test]
    async fn past_slot_is_refused() {
        let (mut desk, _, room) = desk("past_slot").await;
        let now = time::at(d("2024-06-03"), t("11:00"));
        let err = desk.open_slot(room.id, d("2024-06-03"), t("10:00"), now).unwrap_err();
        assert!(matches!(
            err,
            DeskError::Engine(EngineError::Invalid(ValidationError::PastStart))
        ));
        assert_eq!(desk.mode(), Mode::Closed);
        // Inside the grace window.
        desk.open_slot(room.id, d("2024-06-03"), t("10:30"), now).unwrap();
    }

    #[tokio::test]
    async fn create_weekly_series() {
        let (mut desk, store, room) = desk("create_weekly").await;
        desk.open_slot(room.id, d("2024-06-03"), t("10:00"), monday_morning())
            .unwrap();
        let form = desk.form_mut().unwrap();
        form.title = "Team sync".into();
        form.cadence = Cadence::Weekly;
        form.end_date = Some(d("2024-06-24"));
        let done = desk.submit(monday_morning()).await.unwrap();
        assert_eq!(done.created, 4);
        assert_eq!(desk.mode(), Mode::Closed);
        assert_eq!(desk.reservations().len(), 4);

        let stored = store.list_reservations().await;
        assert!(stored.iter().all(|r| r.created_by.as_deref() == Some("manual")));
        assert!(stored.iter().all(|r| r.reserver_name == "Choi"));
    }

    #[tokio::test]
    async fn conflict_keeps_modal_open() {
        let (mut desk, store, room) = desk("conflict").await;
        book(&mut desk, room.id, "2024-06-05", "10:00", "Existing").await;

        desk.open_slot(room.id, d("2024-06-03"), t("10:00"), monday_morning())
            .unwrap();
        let form = desk.form_mut().unwrap();
        form.title = "Daily".into();
        form.cadence = Cadence::Daily;
        form.end_date = Some(d("2024-06-07"));
        let err = desk.submit(monday_morning()).await.unwrap_err();
        match err {
            DeskError::Engine(EngineError::Conflict { date, .. }) => assert_eq!(date, d("2024-06-05")),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(desk.mode(), Mode::Creating);
        assert_eq!(desk.modal().form().unwrap().title, "Daily");
        assert_eq!(store.list_reservations().await.len(), 1);
    }

    #[tokio::test]
    async fn edit_single_occurrence_updates_in_place() {
        let (mut desk, store, room) = desk("edit_single").await;
        book(&mut desk, room.id, "2024-06-04", "10:00", "Interview").await;
        let id = desk.reservations()[0].id;

        desk.open_reservation(id).unwrap();
        desk.begin_edit().unwrap();
        let form = desk.form_mut().unwrap();
        form.start = Some(t("14:00"));
        form.end = Some(t("15:00"));
        let done = desk.submit(monday_morning()).await.unwrap();
        assert_eq!(done.updated, 1);

        let stored = store.list_reservations().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(time::time_of(stored[0].start), t("14:00"));
    }

    #[tokio::test]
    async fn edit_series_replaces_every_member() {
        let (mut desk, store, room) = desk("edit_series").await;
        desk.open_slot(room.id, d("2024-06-03"), t("09:00"), monday_morning())
            .unwrap();
        let form = desk.form_mut().unwrap();
        form.title = "Standup".into();
        form.cadence = Cadence::Daily;
        form.end_date = Some(d("2024-06-07"));
        desk.submit(monday_morning()).await.unwrap();
        let old: Vec<ReservationId> = desk.reservations().iter().map(|r| r.id).collect();
        assert_eq!(old.len(), 5);

        desk.open_reservation(old[2]).unwrap();
        desk.begin_edit().unwrap();
        let form = desk.form_mut().unwrap();
        assert_eq!(form.cadence, Cadence::Daily);
        assert_eq!(form.end_date, Some(d("2024-06-07")));
        // Edits start from the opened occurrence's date.
        assert_eq!(form.start_date, Some(d("2024-06-05")));
        form.start = Some(t("09:30"));
        form.end = Some(t("09:45"));

        let done = desk.submit(monday_morning()).await.unwrap();
        assert_eq!(done.deleted, 5);
        assert_eq!(done.created, 3);

        let stored = store.list_reservations().await;
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|r| !old.contains(&r.id)));
        assert!(stored.iter().all(|r| time::time_of(r.start) == t("09:30")));
    }

    #[tokio::test]
    async fn moving_onto_itself_is_not_a_conflict() {
        let (mut desk, _, room) = desk("self_overlap").await;
        book(&mut desk, room.id, "2024-06-04", "10:00", "Review").await;
        let id = desk.reservations()[0].id;
        desk.open_reservation(id).unwrap();
        desk.begin_edit().unwrap();
        desk.form_mut().unwrap().end = Some(t("11:00"));
        desk.submit(monday_morning()).await.unwrap();
        assert_eq!(time::time_of(desk.reservations()[0].end), t("11:00"));
    }

    #[tokio::test]
    async fn cancel_deletes_only_the_viewed_occurrence() {
        let (mut desk, _, room) = desk("cancel").await;
        book(&mut desk, room.id, "2024-06-04", "10:00", "Retro").await;
        book(&mut desk, room.id, "2024-06-11", "10:00", "Retro").await;
        let first = desk.reservations()[0].id;

        assert!(desk.cancel_reservation().await.is_err());
        desk.open_reservation(first).unwrap();
        desk.cancel_reservation().await.unwrap();
        assert_eq!(desk.mode(), Mode::Closed);
        assert_eq!(desk.reservations().len(), 1);
        assert_ne!(desk.reservations()[0].id, first);
    }

    #[tokio::test]
    async fn submit_needs_an_open_form() {
        let (mut desk, _, _) = desk("no_form").await;
        let err = desk.submit(monday_morning()).await.unwrap_err();
        assert!(matches!(err, DeskError::Transition(_)));
    }

    #[tokio::test]
    async fn search_panel_and_hit_navigation() {
        let (mut desk, _, room) = desk("search").await;
        book(&mut desk, room.id, "2024-06-14", "10:00", "Budget review").await;
        book(&mut desk, room.id, "2024-06-04", "13:00", "Lunch").await;

        assert!(desk.search_results(d("2024-06-03")).is_none());
        desk.set_search("BUDGET");
        let view = desk.search_results(d("2024-06-03")).unwrap();
        assert_eq!(view.total, 1);
        let hit = view.hits[0].reservation.id;

        // The grid hides what the search filters out.
        assert!(desk.day_blocks(room.id, d("2024-06-04"), monday_morning()).is_empty());

        desk.set_show_all(true);
        desk.set_search("  ");
        assert!(!desk.show_all());

        desk.open_search_hit(hit).unwrap();
        assert_eq!(desk.selected_date(), d("2024-06-14"));
        assert_eq!(desk.mode(), Mode::Viewing);
        assert_eq!(desk.week()[0], d("2024-06-10"));
    }

    #[tokio::test]
    async fn week_navigation() {
        let (mut desk, _, _) = desk("weeks").await;
        desk.next_week();
        assert_eq!(desk.selected_date(), d("2024-06-10"));
        desk.prev_week();
        desk.prev_week();
        assert_eq!(desk.selected_date(), d("2024-05-27"));
        desk.select_date(d("2024-06-09"));
        assert_eq!(desk.week()[0], d("2024-06-03"));
        desk.go_today(d("2024-06-20"));
        assert_eq!(desk.selected_date(), d("2024-06-20"));
    }

    #[tokio::test]
    async fn inactive_rooms_are_off_the_grid() {
        let (mut desk, store, room) = desk("inactive").await;
        Store::update_room(&store, room.id, &RoomPatch {
            is_active: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
        desk.reload().await.unwrap();
        assert!(desk.rooms().is_empty());
        let err = desk
            .open_slot(room.id, d("2024-06-04"), t("10:00"), monday_morning())
            .unwrap_err();
        assert!(matches!(err, DeskError::UnknownRoom(_)));
    }

    /// A store whose list queries start failing once `fail_reads` is set.
    struct FlakyReads {
        store: Arc<Store>,
        fail_reads: AtomicBool,
    }

    impl FlakyReads {
        fn check(&self) -> Result<(), BackendError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(BackendError::Remote("connection reset".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Backend for FlakyReads {
        async fn rooms(&self) -> Result<Vec<Room>, BackendError> {
            self.check()?;
            self.store.rooms().await
        }
        async fn active_rooms(&self) -> Result<Vec<Room>, BackendError> {
            self.check()?;
            self.store.active_rooms().await
        }
        async fn insert_room(&self, room: NewRoom) -> Result<Room, BackendError> {
            Backend::insert_room(self.store.as_ref(), room).await
        }
        async fn update_room(&self, id: RoomId, patch: &RoomPatch) -> Result<(), BackendError> {
            Backend::update_room(self.store.as_ref(), id, patch).await
        }
        async fn delete_room(&self, id: RoomId) -> Result<(), BackendError> {
            Backend::delete_room(self.store.as_ref(), id).await
        }
        async fn reservations(&self) -> Result<Vec<Reservation>, BackendError> {
            self.check()?;
            self.store.reservations().await
        }
        async fn insert_reservations(&self, batch: Vec<NewReservation>) -> Result<Vec<Reservation>, BackendError> {
            Backend::insert_reservations(self.store.as_ref(), batch).await
        }
        async fn update_reservation(&self, id: ReservationId, patch: &ReservationPatch) -> Result<(), BackendError> {
            Backend::update_reservation(self.store.as_ref(), id, patch).await
        }
        async fn delete_reservations(&self, ids: &[ReservationId]) -> Result<usize, BackendError> {
            Backend::delete_reservations(self.store.as_ref(), ids).await
        }
    }

    #[tokio::test]
    async fn saved_booking_is_ok_when_refresh_fails() {
        let (_, store, room) = desk("refresh_fails").await;
        let backend = Arc::new(FlakyReads {
            store: store.clone(),
            fail_reads: AtomicBool::new(false),
        });
        let mut profile = Profile::load(&test_dir("refresh_fails_profile").join("profile.json")).unwrap();
        profile.set_display_name("Choi").unwrap();
        let mut desk = Desk::new(backend.clone(), profile, d("2024-06-03"));
        desk.reload().await.unwrap();

        desk.open_slot(room.id, d("2024-06-04"), t("10:00"), monday_morning())
            .unwrap();
        desk.form_mut().unwrap().title = "Planning".into();
        backend.fail_reads.store(true, Ordering::SeqCst);

        let done = desk.submit(monday_morning()).await.unwrap();
        assert_eq!(done.created, 1);
        assert_eq!(desk.mode(), Mode::Closed);
        assert_eq!(store.list_reservations().await.len(), 1);
        // The snapshot is stale until a reload succeeds.
        assert!(desk.reservations().is_empty());
        assert!(matches!(desk.reload().await, Err(DeskError::Backend(_))));

        backend.fail_reads.store(false, Ordering::SeqCst);
        desk.reload().await.unwrap();
        let id = desk.reservations()[0].id;
        desk.open_reservation(id).unwrap();
        backend.fail_reads.store(true, Ordering::SeqCst);
        desk.cancel_reservation().await.unwrap();
        assert_eq!(desk.mode(), Mode::Closed);
        assert!(store.list_reservations().await.is_empty());
    }
}
