use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_API_URL: &str = "http://localhost:8085";
const DEFAULT_CREDENTIALS_PATH: &str = "data/credentials.json";
const DEFAULT_TICK_MS: u64 = 1000;
const DEFAULT_RESYNC_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_url: String,
    pub credentials_path: PathBuf,
    pub tick_interval: Duration,
    pub resync_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT").unwrap_or(DEFAULT_PORT),
            api_url: env::var("TRACKER_API_URL")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            credentials_path: env::var("TRACKER_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            tick_interval: Duration::from_millis(
                parsed("TRACKER_TICK_MS")
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_TICK_MS),
            ),
            resync_interval: Duration::from_secs(
                parsed("TRACKER_RESYNC_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_RESYNC_SECS),
            ),
            request_timeout: Duration::from_secs(
                parsed("TRACKER_REQUEST_TIMEOUT_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}
