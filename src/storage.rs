use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub session_key: Option<String>,
}

pub async fn load_credentials(path: &Path) -> Credentials {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(credentials) => credentials,
            Err(err) => {
                error!("failed to parse credentials file: {err}");
                Credentials::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Credentials::default(),
        Err(err) => {
            error!("failed to read credentials file: {err}");
            Credentials::default()
        }
    }
}

pub async fn persist_credentials(path: &Path, credentials: &Credentials) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(credentials).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
