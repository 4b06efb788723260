//! Drives the live session set: one-second ticks, periodic resyncs and the
//! user-initiated writes that go through the store.

use crate::errors::StoreError;
use crate::interval::Clock;
use crate::live::LiveSet;
use crate::models::{
    AuthSession, DashboardResponse, Registration, SessionId, SessionRow, StatisticsResponse,
    Subject, SubjectCard, SubjectDetailResponse, SubjectId, User,
};
use crate::stats::{Overview, build_overview_at};
use crate::store::SessionStore;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

const SUSTAINED_FAILURES: u32 = 3;

#[derive(Debug, Default)]
pub struct ViewState {
    pub subjects: Vec<Subject>,
    pub live: LiveSet,
    pub overview: Overview,
    pub last_synced: Option<DateTime<Utc>>,
    pub failed_syncs: u32,
    // bumped by every local write; snapshots fetched under an older value are stale
    generation: u64,
}

impl ViewState {
    fn recompute(&mut self, now: DateTime<Utc>) {
        self.overview =
            build_overview_at(&now.with_timezone(&Local), &self.subjects, self.live.sessions());
    }

    pub fn sync_warning(&self) -> Option<String> {
        (self.failed_syncs >= SUSTAINED_FAILURES).then(|| {
            format!(
                "could not reach the server for the last {} attempts; showing saved data",
                self.failed_syncs
            )
        })
    }

    pub fn dashboard(&self) -> DashboardResponse {
        let subjects = self
            .subjects
            .iter()
            .map(|subject| {
                let share = self
                    .overview
                    .shares
                    .iter()
                    .find(|share| share.subject_id == subject.id);
                SubjectCard {
                    id: subject.id,
                    name: subject.name.clone(),
                    description: subject.description.clone(),
                    total_seconds: share.map_or(0, |share| share.total_seconds),
                    percentage: share.map_or(0.0, |share| share.percentage),
                    session_count: self
                        .live
                        .sessions()
                        .iter()
                        .filter(|live| live.session.subject_id == subject.id)
                        .count(),
                    running_session_id: self
                        .live
                        .running_for_subject(subject.id)
                        .map(|live| live.session.id),
                }
            })
            .collect();

        DashboardResponse {
            subjects,
            arcs: self.overview.arcs.clone(),
            total_seconds: self.overview.shares.iter().map(|share| share.total_seconds).sum(),
            sync_warning: self.sync_warning(),
            last_synced: self.last_synced,
        }
    }

    pub fn subject_detail(&self, subject_id: SubjectId) -> Option<SubjectDetailResponse> {
        let subject = self.subjects.iter().find(|subject| subject.id == subject_id)?;
        let sessions: Vec<SessionRow> = self
            .live
            .sessions()
            .iter()
            .filter(|live| live.session.subject_id == subject_id)
            .map(|live| SessionRow {
                id: live.session.id,
                start_time: live.session.start_time,
                end_time: live.session.end_time,
                running: live.session.running,
                displayed_seconds: live.displayed_seconds,
            })
            .collect();

        Some(SubjectDetailResponse {
            subject: subject.clone(),
            total_seconds: sessions.iter().map(|row| row.displayed_seconds).sum(),
            running_session_id: sessions.iter().find(|row| row.running).map(|row| row.id),
            sessions,
            sync_warning: self.sync_warning(),
            last_synced: self.last_synced,
        })
    }

    pub fn statistics(&self) -> StatisticsResponse {
        StatisticsResponse {
            total_seconds: self.overview.total_seconds,
            daily: self.overview.daily.clone(),
            weekly: self.overview.weekly.clone(),
            monthly: self.overview.monthly.clone(),
            sync_warning: self.sync_warning(),
            last_synced: self.last_synced,
        }
    }
}

#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    view: Arc<Mutex<ViewState>>,
}

impl Tracker {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            view: Arc::new(Mutex::new(ViewState::default())),
        }
    }

    pub async fn view(&self) -> tokio::sync::MutexGuard<'_, ViewState> {
        self.view.lock().await
    }

    pub async fn tick(&self) {
        let now = self.clock.now();
        let mut view = self.view.lock().await;
        if view.live.any_running() {
            view.live.tick(now);
        }
        // calendar windows roll over even when nothing is running
        view.recompute(now);
    }

    /// Fetches subjects and sessions and replaces the live set wholesale.
    /// On failure the last good state stays in place.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let generation = self.view.lock().await.generation;
        let (subjects, sessions) =
            tokio::join!(self.store.list_subjects(), self.store.list_sessions());

        let mut view = self.view.lock().await;
        let (subjects, sessions) = match (subjects, sessions) {
            (Ok(subjects), Ok(sessions)) => (subjects, sessions),
            (Err(err), _) | (_, Err(err)) => {
                view.failed_syncs = view.failed_syncs.saturating_add(1);
                warn!(failures = view.failed_syncs, "resync failed, keeping last state: {err}");
                return Err(err);
            }
        };

        if view.generation != generation {
            debug!("discarding resync that raced a local change");
            return Ok(());
        }

        let now = self.clock.now();
        view.subjects = subjects;
        view.live.replace(sessions, now);
        view.recompute(now);
        view.last_synced = Some(now);
        view.failed_syncs = 0;
        debug!(
            subjects = view.subjects.len(),
            sessions = view.live.sessions().len(),
            "resync complete"
        );
        Ok(())
    }

    pub async fn start_session(&self, subject_id: SubjectId) -> Result<(), StoreError> {
        self.store.start_session(subject_id).await?;
        self.view.lock().await.generation += 1;
        info!(subject_id, "session started");
        if let Err(err) = self.refresh().await {
            warn!(subject_id, "started session not yet visible: {err}");
        }
        Ok(())
    }

    /// Stops remotely, shows the local elapsed time at once, then swaps in
    /// the server's final duration when it arrives.
    pub async fn stop_session(&self, session_id: SessionId) -> Result<u64, StoreError> {
        self.store.end_session(session_id).await?;

        let estimate = {
            let now = self.clock.now();
            let mut view = self.view.lock().await;
            let estimate = view.live.mark_stopped(session_id, now);
            view.generation += 1;
            view.recompute(now);
            estimate
        };
        info!(session_id, ?estimate, "session stopped");

        match self.store.session_duration(session_id).await {
            Ok(seconds) => {
                let now = self.clock.now();
                let mut view = self.view.lock().await;
                view.live.confirm_duration(session_id, seconds);
                view.recompute(now);
                Ok(seconds)
            }
            Err(err) => {
                warn!(session_id, "keeping local duration, final value unavailable: {err}");
                Ok(estimate.unwrap_or(0))
            }
        }
    }

    /// Stops the subject's running session, or starts a new one.
    pub async fn toggle_subject(&self, subject_id: SubjectId) -> Result<(), StoreError> {
        let running = {
            let view = self.view.lock().await;
            view.live
                .running_for_subject(subject_id)
                .map(|live| live.session.id)
        };
        match running {
            Some(session_id) => self.stop_session(session_id).await.map(|_| ()),
            None => self.start_session(subject_id).await,
        }
    }

    pub async fn create_subject(&self, name: &str, description: &str) -> Result<Subject, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("subject name must not be empty".to_string()));
        }
        let user = self
            .store
            .current_user()
            .await?
            .ok_or(StoreError::Unauthenticated)?;

        let subject = self
            .store
            .create_subject(user.id, name, description.trim())
            .await?;
        info!(subject_id = subject.id, "subject created");

        let now = self.clock.now();
        let mut view = self.view.lock().await;
        view.subjects.push(subject.clone());
        view.generation += 1;
        view.recompute(now);
        Ok(subject)
    }

    pub async fn delete_subject(&self, subject_id: SubjectId) -> Result<(), StoreError> {
        self.store.delete_subject(subject_id).await?;
        info!(subject_id, "subject deleted");

        let now = self.clock.now();
        let mut view = self.view.lock().await;
        view.subjects.retain(|subject| subject.id != subject_id);
        view.live.remove_subject(subject_id);
        view.generation += 1;
        view.recompute(now);
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<User>, StoreError> {
        self.store.current_user().await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, StoreError> {
        let session = self.store.login(email.trim(), password).await?;
        info!(user_id = session.user_id, "signed in");
        if let Err(err) = self.refresh().await {
            warn!("initial load after sign-in failed: {err}");
        }
        Ok(session)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, StoreError> {
        self.store.register(registration).await
    }

    pub async fn logout(&self) -> Result<(), StoreError> {
        let result = self.store.logout().await;
        let mut view = self.view.lock().await;
        let generation = view.generation + 1;
        *view = ViewState {
            generation,
            ..ViewState::default()
        };
        drop(view);
        info!("signed out");
        result
    }

    /// Starts the repeating tick and, when given, the resync task. Both stop
    /// when the returned handle is cancelled or dropped.
    pub fn spawn_timers(&self, tick_every: Duration, resync_every: Option<Duration>) -> TimerHandle {
        let mut tasks = Vec::with_capacity(2);

        let tracker = self.clone();
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval(tick_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tracker.tick().await;
            }
        }));

        if let Some(resync_every) = resync_every {
            let tracker = self.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = interval(resync_every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // the first tick fires immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let _ = tracker.refresh().await;
                }
            }));
        }

        TimerHandle { tasks }
    }
}

pub struct TimerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
