use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard_page))
        .route("/subjects/:id", get(handlers::subject_page))
        .route("/statistics", get(handlers::statistics_page))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/logout", post(handlers::logout))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/statistics", get(handlers::get_statistics))
        .route("/api/subjects", post(handlers::create_subject))
        .route(
            "/api/subjects/:id",
            get(handlers::get_subject).delete(handlers::delete_subject),
        )
        .route("/api/subjects/:id/toggle", post(handlers::toggle_subject))
        .route("/api/sessions/:id/stop", post(handlers::stop_session))
        .route("/api/refresh", post(handlers::refresh))
        .with_state(state)
}

