//! Duration of a single session, open or closed.

use crate::errors::DataError;
use crate::models::Session;
use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Closed sessions report the server's `time_allotted`; running sessions
/// report whole seconds elapsed since `start_time`, never below zero.
pub fn measure(session: &Session, now: DateTime<Utc>) -> Result<u64, DataError> {
    if !session.running {
        return Ok(session.time_allotted);
    }
    if session.end_time.is_some() {
        return Err(DataError::EndedWhileRunning(session.id));
    }
    let start = session
        .start_time
        .ok_or(DataError::MissingStartTime(session.id))?;
    Ok(elapsed_seconds(start, now))
}

pub fn duration(session: &Session, now: DateTime<Utc>) -> u64 {
    match measure(session, now) {
        Ok(seconds) => seconds,
        Err(DataError::EndedWhileRunning(_)) => session.time_allotted,
        Err(DataError::MissingStartTime(_)) => 0,
    }
}

pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = now.signed_duration_since(start).num_milliseconds();
    if millis <= 0 { 0 } else { (millis / 1000) as u64 }
}
