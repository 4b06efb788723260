pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod interval;
pub mod live;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_credentials, persist_credentials};
pub use store::{HttpSessionStore, SessionStore};
pub use tracker::{TimerHandle, Tracker};
