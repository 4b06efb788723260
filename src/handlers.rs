use crate::errors::{AppError, StoreError};
use crate::models::{
    CreateSubjectRequest, DashboardResponse, LoginForm, RegisterForm, Registration, SessionId,
    StatisticsResponse, StopResponse, Subject, SubjectDetailResponse, SubjectId, User,
};
use crate::state::AppState;
use crate::storage::{persist_credentials, Credentials};
use crate::ui::{render_dashboard, render_login, render_statistics, render_subject};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use tracing::warn;

pub async fn dashboard_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let Some(user) = signed_in(&state).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    Ok(Html(render_dashboard(&user)).into_response())
}

pub async fn subject_page(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
) -> Result<Response, AppError> {
    if signed_in(&state).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    let view = state.tracker.view().await;
    let subject = view
        .subjects
        .iter()
        .find(|subject| subject.id == id)
        .ok_or_else(|| AppError::not_found("Subject not found"))?;
    Ok(Html(render_subject(subject)).into_response())
}

pub async fn statistics_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let Some(user) = signed_in(&state).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    Ok(Html(render_statistics(&user)).into_response())
}

pub async fn login_page() -> Html<String> {
    Html(render_login(None))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.tracker.login(&form.email, &form.password).await {
        Ok(session) => {
            let credentials = Credentials {
                session_key: Some(session.session_key),
            };
            persist_credentials(&state.credentials_path, &credentials).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(StoreError::Unauthenticated) => Ok((
            StatusCode::UNAUTHORIZED,
            Html(render_login(Some("Invalid email or password"))),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Html<String>, AppError> {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    let registration = Registration {
        email: form.email.trim().to_string(),
        password: form.password,
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
    };
    state.tracker.register(&registration).await?;
    Ok(Html(render_login(Some("Account created, please sign in"))))
}

pub async fn logout(State(state): State<AppState>) -> Result<Redirect, AppError> {
    if let Err(err) = state.tracker.logout().await {
        warn!("logout did not reach the server: {err}");
    }
    persist_credentials(&state.credentials_path, &Credentials::default()).await?;
    Ok(Redirect::to("/login"))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    Json(state.tracker.view().await.dashboard())
}

pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
) -> Result<Json<SubjectDetailResponse>, AppError> {
    state
        .tracker
        .view()
        .await
        .subject_detail(id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subject not found"))
}

pub async fn get_statistics(State(state): State<AppState>) -> Json<StatisticsResponse> {
    Json(state.tracker.view().await.statistics())
}

pub async fn create_subject(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    let subject = state
        .tracker
        .create_subject(&payload.name, &payload.description)
        .await?;
    Ok(Json(subject))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
) -> Result<Json<DashboardResponse>, AppError> {
    state.tracker.delete_subject(id).await?;
    Ok(Json(state.tracker.view().await.dashboard()))
}

pub async fn toggle_subject(
    State(state): State<AppState>,
    Path(id): Path<SubjectId>,
) -> Result<Json<DashboardResponse>, AppError> {
    state.tracker.toggle_subject(id).await?;
    Ok(Json(state.tracker.view().await.dashboard()))
}

pub async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<StopResponse>, AppError> {
    let seconds = state.tracker.stop_session(id).await?;
    Ok(Json(StopResponse {
        session_id: id,
        seconds,
    }))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    state.tracker.refresh().await?;
    Ok(Json(state.tracker.view().await.dashboard()))
}

async fn signed_in(state: &AppState) -> Result<Option<User>, AppError> {
    Ok(state.tracker.current_user().await?)
}
