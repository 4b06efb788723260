use crate::tracker::Tracker;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub credentials_path: PathBuf,
    pub tracker: Tracker,
}

impl AppState {
    pub fn new(credentials_path: PathBuf, tracker: Tracker) -> Self {
        Self {
            credentials_path,
            tracker,
        }
    }
}
