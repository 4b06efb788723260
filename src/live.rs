//! Client-side copy of the session set, kept live between resyncs.
//!
//! Every mutation replaces the measured values from scratch. A locally
//! stopped session outranks any snapshot that still reports it as running,
//! until the server itself reports it stopped.

use crate::errors::DataError;
use crate::interval::{duration, elapsed_seconds, measure};
use crate::models::{Session, SessionId, SubjectId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveSession {
    pub session: Session,
    pub displayed_seconds: u64,
    pub fault: Option<DataError>,
}

impl LiveSession {
    fn measured(session: Session, now: DateTime<Utc>) -> Self {
        let fault = measure(&session, now).err();
        let displayed_seconds = duration(&session, now);
        Self {
            session,
            displayed_seconds,
            fault,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingStop {
    ended_at: DateTime<Utc>,
    seconds: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LiveSet {
    sessions: Vec<LiveSession>,
    pending_stops: HashMap<SessionId, PendingStop>,
    // ids already reported as faulty, so each bad record is logged once
    reported_faults: HashSet<SessionId>,
}

impl LiveSet {
    pub fn from_snapshot(snapshot: Vec<Session>, now: DateTime<Utc>) -> Self {
        let mut live = Self::default();
        live.replace(snapshot, now);
        live
    }

    pub fn sessions(&self) -> &[LiveSession] {
        &self.sessions
    }

    pub fn get(&self, id: SessionId) -> Option<&LiveSession> {
        self.sessions.iter().find(|live| live.session.id == id)
    }

    pub fn any_running(&self) -> bool {
        self.sessions.iter().any(|live| live.session.running)
    }

    pub fn running_for_subject(&self, subject_id: SubjectId) -> Option<&LiveSession> {
        self.sessions
            .iter()
            .find(|live| live.session.subject_id == subject_id && live.session.running)
    }

    /// Recomputes running sessions only; closed sessions keep their value.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.sessions = self
            .sessions
            .iter()
            .map(|live| {
                if live.session.running && live.fault.is_none() {
                    LiveSession {
                        session: live.session.clone(),
                        displayed_seconds: duration(&live.session, now),
                        fault: None,
                    }
                } else {
                    live.clone()
                }
            })
            .collect();
    }

    /// Swaps in a fresh server snapshot, then ticks once against `now` so the
    /// display never falls back to the fetch-time value.
    pub fn replace(&mut self, snapshot: Vec<Session>, now: DateTime<Utc>) {
        let mut still_pending = HashMap::new();
        let sessions = snapshot
            .into_iter()
            .map(|mut session| {
                if let Some(stop) = self.pending_stops.get(&session.id) {
                    if session.running {
                        session.running = false;
                        session.end_time = Some(stop.ended_at);
                        session.time_allotted = stop.seconds;
                        still_pending.insert(session.id, *stop);
                    }
                }
                LiveSession::measured(session, now)
            })
            .collect();
        self.sessions = sessions;
        self.pending_stops = still_pending;
        self.report_faults();
        self.tick(now);
    }

    /// Warns about records that turned faulty since the last snapshot and
    /// forgets ids that are healthy again. Returns how many were new.
    fn report_faults(&mut self) -> usize {
        let mut reported = HashSet::new();
        let mut fresh = 0;
        for live in &self.sessions {
            let Some(fault) = &live.fault else {
                continue;
            };
            if !self.reported_faults.contains(&live.session.id) {
                warn!("{fault}; showing a default duration");
                fresh += 1;
            }
            reported.insert(live.session.id);
        }
        self.reported_faults = reported;
        fresh
    }

    /// Closes a session locally with its current elapsed time. Returns the
    /// elapsed seconds, or `None` if the session is unknown or not running.
    pub fn mark_stopped(&mut self, id: SessionId, now: DateTime<Utc>) -> Option<u64> {
        let live = self
            .sessions
            .iter_mut()
            .find(|live| live.session.id == id && live.session.running)?;

        let seconds = match live.session.start_time {
            Some(start) if live.fault.is_none() => elapsed_seconds(start, now),
            _ => live.displayed_seconds,
        };
        live.session.running = false;
        live.session.end_time = Some(now);
        live.session.time_allotted = seconds;
        live.displayed_seconds = seconds;
        live.fault = None;

        self.pending_stops.insert(
            id,
            PendingStop {
                ended_at: now,
                seconds,
            },
        );
        Some(seconds)
    }

    /// Overwrites a closed session with the authoritative duration.
    pub fn confirm_duration(&mut self, id: SessionId, seconds: u64) -> bool {
        let Some(live) = self
            .sessions
            .iter_mut()
            .find(|live| live.session.id == id && !live.session.running)
        else {
            return false;
        };
        live.session.time_allotted = seconds;
        live.displayed_seconds = seconds;
        if let Some(stop) = self.pending_stops.get_mut(&id) {
            stop.seconds = seconds;
        }
        true
    }

    pub fn remove_subject(&mut self, subject_id: SubjectId) {
        self.sessions.retain(|live| live.session.subject_id != subject_id);
        let sessions = &self.sessions;
        self.pending_stops
            .retain(|id, _| sessions.iter().any(|live| live.session.id == *id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
    }

    fn running(id: SessionId, subject_id: SubjectId, started: DateTime<Utc>) -> Session {
        Session {
            id,
            subject_id,
            start_time: Some(started),
            end_time: None,
            running: true,
            time_allotted: 0,
        }
    }

    fn closed(id: SessionId, subject_id: SubjectId, seconds: u64) -> Session {
        Session {
            id,
            subject_id,
            start_time: Some(t0() - Duration::hours(3)),
            end_time: Some(t0() - Duration::hours(2)),
            running: false,
            time_allotted: seconds,
        }
    }

    #[test]
    fn tick_only_moves_running_sessions() {
        let mut live = LiveSet::from_snapshot(
            vec![running(1, 5, t0() - Duration::seconds(125)), closed(2, 5, 40)],
            t0(),
        );
        assert_eq!(live.get(1).unwrap().displayed_seconds, 125);

        live.tick(t0() + Duration::seconds(10));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 135);
        assert_eq!(live.get(2).unwrap().displayed_seconds, 40);
    }

    #[test]
    fn replace_does_not_regress_to_fetch_time_value() {
        let mut live = LiveSet::from_snapshot(vec![running(1, 5, t0())], t0());
        live.tick(t0() + Duration::seconds(20));

        let mut stale = running(1, 5, t0());
        stale.time_allotted = 3;
        live.replace(vec![stale], t0() + Duration::seconds(21));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 21);
    }

    #[test]
    fn stop_then_confirm_shows_authoritative_duration() {
        let mut live =
            LiveSet::from_snapshot(vec![running(1, 5, t0() - Duration::seconds(125))], t0());

        assert_eq!(live.mark_stopped(1, t0()), Some(125));
        let stopped = live.get(1).unwrap();
        assert!(!stopped.session.running);
        assert_eq!(stopped.session.end_time, Some(t0()));
        assert_eq!(stopped.displayed_seconds, 125);

        live.tick(t0() + Duration::seconds(60));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 125);

        assert!(live.confirm_duration(1, 130));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 130);
    }

    #[test]
    fn stale_running_snapshot_cannot_resurrect_a_stopped_session() {
        let started = t0() - Duration::seconds(300);
        let mut live = LiveSet::from_snapshot(vec![running(1, 5, started)], t0());
        live.mark_stopped(1, t0());

        // fetched before the stop, delivered after it
        live.replace(vec![running(1, 5, started)], t0() + Duration::seconds(4));
        let shown = live.get(1).unwrap();
        assert!(!shown.session.running);
        assert_eq!(shown.displayed_seconds, 300);

        live.tick(t0() + Duration::seconds(30));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 300);
    }

    #[test]
    fn server_stopped_state_replaces_the_optimistic_one() {
        let started = t0() - Duration::seconds(300);
        let mut live = LiveSet::from_snapshot(vec![running(1, 5, started)], t0());
        live.mark_stopped(1, t0());

        live.replace(vec![closed(1, 5, 302)], t0() + Duration::seconds(5));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 302);

        // the server later restarting the same id is accepted again
        live.replace(vec![running(1, 5, t0())], t0() + Duration::seconds(9));
        assert!(live.get(1).unwrap().session.running);
        assert_eq!(live.get(1).unwrap().displayed_seconds, 9);
    }

    #[test]
    fn confirmed_duration_survives_a_stale_resync() {
        let started = t0() - Duration::seconds(125);
        let mut live = LiveSet::from_snapshot(vec![running(1, 5, started)], t0());
        live.mark_stopped(1, t0());
        live.confirm_duration(1, 130);

        live.replace(vec![running(1, 5, started)], t0() + Duration::seconds(2));
        assert_eq!(live.get(1).unwrap().displayed_seconds, 130);
    }

    #[test]
    fn mark_stopped_ignores_closed_and_unknown_sessions() {
        let mut live = LiveSet::from_snapshot(vec![closed(2, 5, 40)], t0());
        assert_eq!(live.mark_stopped(2, t0()), None);
        assert_eq!(live.mark_stopped(99, t0()), None);
        assert_eq!(live.get(2).unwrap().displayed_seconds, 40);
    }

    #[test]
    fn malformed_running_session_shows_zero_and_keeps_fault() {
        let mut broken = running(7, 5, t0());
        broken.start_time = None;
        let mut live = LiveSet::from_snapshot(vec![broken], t0());
        live.tick(t0() + Duration::seconds(50));

        let shown = live.get(7).unwrap();
        assert_eq!(shown.displayed_seconds, 0);
        assert_eq!(shown.fault, Some(DataError::MissingStartTime(7)));
    }

    #[test]
    fn faulty_record_is_reported_once_per_streak() {
        let mut broken = running(7, 5, t0());
        broken.start_time = None;
        let mut live = LiveSet::from_snapshot(vec![broken.clone()], t0());
        assert!(live.reported_faults.contains(&7));

        live.replace(vec![broken.clone()], t0() + Duration::seconds(10));
        assert_eq!(live.report_faults(), 0);

        live.replace(vec![running(7, 5, t0())], t0() + Duration::seconds(20));
        assert!(live.reported_faults.is_empty());

        live.sessions = vec![LiveSession::measured(broken, t0())];
        assert_eq!(live.report_faults(), 1);
    }

    #[test]
    fn remove_subject_drops_its_sessions() {
        let mut live = LiveSet::from_snapshot(
            vec![running(1, 5, t0()), closed(2, 6, 40)],
            t0(),
        );
        live.mark_stopped(1, t0());
        live.remove_subject(5);
        assert!(live.get(1).is_none());
        assert_eq!(live.sessions().len(), 1);
        assert!(live.pending_stops.is_empty());
    }
}
