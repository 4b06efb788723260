use crate::errors::StoreError;
use crate::models::{
    AuthSession, NewSubject, Registration, Session, SessionId, Subject, SubjectId, User, UserId,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const SESSION_HEADER: &str = "X-SESSION";

/// Remote source of truth for subjects, sessions and identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;
    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError>;
    async fn start_session(&self, subject_id: SubjectId) -> Result<(), StoreError>;
    async fn end_session(&self, session_id: SessionId) -> Result<(), StoreError>;
    async fn session_duration(&self, session_id: SessionId) -> Result<u64, StoreError>;
    async fn create_subject(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
    ) -> Result<Subject, StoreError>;
    async fn delete_subject(&self, subject_id: SubjectId) -> Result<(), StoreError>;
    /// `Ok(None)` means nobody is signed in.
    async fn current_user(&self) -> Result<Option<User>, StoreError>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, StoreError>;
    async fn register(&self, registration: &Registration) -> Result<User, StoreError>;
    async fn logout(&self) -> Result<(), StoreError>;
}

pub struct HttpSessionStore {
    client: Client,
    base_url: String,
    session_key: RwLock<Option<String>>,
}

impl HttpSessionStore {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session_key: Option<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_key: RwLock::new(session_key),
        })
    }

    pub async fn session_key(&self) -> Option<String> {
        self.session_key.read().await.clone()
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let key = self.session_key().await.unwrap_or_default();
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(SESSION_HEADER, key)
    }

    async fn call(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<String, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{method} {path} -> {status}");

        match status {
            StatusCode::OK => Ok(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthenticated),
            other => Err(StoreError::Status {
                status: other.as_u16(),
                body,
            }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let builder = self.request(Method::GET, path).await;
        let body = self.call(Method::GET, path, builder).await?;
        decode(&body)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let builder = self.request(Method::GET, path).await;
        let body = self.call(Method::GET, path, builder).await?;
        decode_records(path, &body)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
    ) -> Result<String, StoreError> {
        let mut builder = self.request(method.clone(), path).await;
        if let Some(payload) = payload {
            builder = builder.json(payload);
        }
        self.call(method, path, builder).await
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        self.get_list("/subject-sessions").await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        self.get_list("/subjects").await
    }

    async fn start_session(&self, subject_id: SubjectId) -> Result<(), StoreError> {
        let path = format!("/subject-sessions/start/{subject_id}");
        self.send::<()>(Method::POST, &path, None).await?;
        Ok(())
    }

    async fn end_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        let path = format!("/subject-sessions/{session_id}/end");
        self.send::<()>(Method::POST, &path, None).await?;
        Ok(())
    }

    async fn session_duration(&self, session_id: SessionId) -> Result<u64, StoreError> {
        self.get(&format!("/subject-sessions/{session_id}/duration"))
            .await
    }

    async fn create_subject(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
    ) -> Result<Subject, StoreError> {
        let payload = NewSubject {
            user_id,
            name: name.to_string(),
            description: description.to_string(),
        };
        let body = self.send(Method::POST, "/subjects", Some(&payload)).await?;
        decode(&body)
    }

    async fn delete_subject(&self, subject_id: SubjectId) -> Result<(), StoreError> {
        let path = format!("/subjects/{subject_id}");
        self.send::<()>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, StoreError> {
        let Some(key) = self.session_key().await else {
            return Ok(None);
        };

        let details: AuthSession = match self.get(&format!("/sessions/{key}")).await {
            Ok(details) => details,
            Err(StoreError::Unauthenticated) | Err(StoreError::Status { status: 404, .. }) => {
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match self.get(&format!("/users/{}", details.user_id)).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::Unauthenticated) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, StoreError> {
        let payload = serde_json::json!({ "email": email, "password": password });
        let body = match self.send(Method::POST, "/sessions", Some(&payload)).await {
            Ok(body) => body,
            Err(StoreError::Status { status: 400..=499, .. }) => {
                return Err(StoreError::Unauthenticated);
            }
            Err(err) => return Err(err),
        };
        let session: AuthSession = decode(&body)?;
        *self.session_key.write().await = Some(session.session_key.clone());
        Ok(session)
    }

    async fn register(&self, registration: &Registration) -> Result<User, StoreError> {
        let body = self.send(Method::POST, "/users", Some(registration)).await?;
        decode(&body)
    }

    async fn logout(&self) -> Result<(), StoreError> {
        let Some(key) = self.session_key.write().await.take() else {
            return Ok(());
        };
        let path = format!("/sessions/{key}");
        match self.send::<()>(Method::DELETE, &path, None).await {
            Ok(_) | Err(StoreError::Unauthenticated) => Ok(()),
            Err(err) => {
                warn!("remote logout failed: {err}");
                Err(err)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Keeps every record that decodes; malformed ones are logged and dropped.
fn decode_records<T: DeserializeOwned>(path: &str, body: &str) -> Result<Vec<T>, StoreError> {
    let raw: Vec<serde_json::Value> = decode(body)?;
    let mut records = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(err) => warn!("skipping malformed record from {path}: {err}"),
        }
    }
    Ok(records)
}
