use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/users/:uid/moods", post(handlers::submit_mood_form))
        .route("/api/catalog", get(handlers::catalog))
        .route("/api/session", post(handlers::sign_in))
        .route("/api/session/:uid", delete(handlers::sign_out))
        .route("/api/users/:uid/moods", get(handlers::get_history))
        .route("/api/users/:uid/moods/:date", put(handlers::put_mood))
        .route("/api/users/:uid/summary/weekly", get(handlers::weekly_summary))
        .route("/api/users/:uid/summary/ai", post(handlers::ai_summary))
        .route(
            "/api/users/:uid/report",
            get(handlers::download_report).post(handlers::export_report),
        )
        .with_state(state)
}
