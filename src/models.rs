use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub type SessionId = i64;
pub type SubjectId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub subject_id: SubjectId,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub time_allotted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub number_of_sessions: u64,
    #[serde(default)]
    pub time_allotted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub session_key: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub start_date: String,
    pub end_date: String,
    pub total_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectTotal {
    pub subject_id: SubjectId,
    pub total_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectShare {
    pub subject_id: SubjectId,
    pub total_seconds: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcSpan {
    pub subject_id: SubjectId,
    pub start_deg: f64,
    pub sweep_deg: f64,
}

#[derive(Debug, Serialize)]
pub struct SubjectCard {
    pub id: SubjectId,
    pub name: String,
    pub description: Option<String>,
    pub total_seconds: u64,
    pub percentage: f64,
    pub session_count: usize,
    pub running_session_id: Option<SessionId>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub subjects: Vec<SubjectCard>,
    pub arcs: Vec<ArcSpan>,
    pub total_seconds: u64,
    pub sync_warning: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub running: bool,
    pub displayed_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct SubjectDetailResponse {
    pub subject: Subject,
    pub sessions: Vec<SessionRow>,
    pub total_seconds: u64,
    pub running_session_id: Option<SessionId>,
    pub sync_warning: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub session_id: SessionId,
    pub seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total_seconds: u64,
    pub daily: Vec<Bucket>,
    pub weekly: Vec<Bucket>,
    pub monthly: Vec<Bucket>,
    pub sync_warning: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 as well as offset-less local date-times. Any other value,
/// including numbers and arrays, decodes as absent so the record still
/// reaches the interval checks.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() && !text.trim().is_empty() {
                warn!(value = %text, "ignoring unparseable timestamp");
            }
            parsed
        }
        Some(other) => {
            warn!(value = %other, "ignoring non-string timestamp");
            None
        }
    })
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
