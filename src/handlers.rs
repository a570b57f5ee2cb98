use crate::analysis::{generate_summary, report_summary_text, SummaryOutcome, GENERATION_FAILED_MESSAGE};
use crate::catalog::{entries, EmojiCatalogEntry};
use crate::errors::AppError;
use crate::models::{
    newest_first, AiSummaryResponse, HistoryResponse, HistoryRow, MoodEntry, MoodEntryRequest,
    MoodLog, UserProfile, ValidationError, WeeklySummary,
};
use crate::moods::MoodWriteError;
use crate::report::{self, generate_report, save_report, REPORT_FILE_NAME};
use crate::state::AppState;
use crate::summary::build_weekly_summary;
use crate::ui::{render_index, DashboardView};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoodForm {
    pub date: String,
    pub emoji: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedReport {
    pub path: String,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    let user = match query.user.as_deref() {
        Some(user) => Some(user_key(user)?),
        None => None,
    };
    let log = match user {
        Some(user) => state.moods.read(user).await?,
        None => MoodLog::new(),
    };
    Ok(Html(render_dashboard(user, &log, None)))
}

pub async fn catalog() -> Json<&'static [EmojiCatalogEntry]> {
    Json(entries())
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    user_key(&profile.uid)?;
    state.sessions.sign_in(profile.clone()).await?;
    Ok(Json(profile))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.sign_out(&uid).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("no open session for this user"))
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let log = state.moods.read(user_key(&uid)?).await?;
    Ok(Json(HistoryResponse {
        entries: history_rows(&log),
    }))
}

pub async fn put_mood(
    State(state): State<AppState>,
    Path((uid, date)): Path<(String, String)>,
    Json(payload): Json<MoodEntryRequest>,
) -> Result<Json<HistoryRow>, AppError> {
    let uid = user_key(&uid)?;
    let entry = MoodEntry::new(payload.emoji, &payload.note)?;
    record_mood(&state, uid, &date, entry.clone()).await?;
    Ok(Json(HistoryRow {
        date,
        emoji: entry.emoji,
        note: entry.note,
    }))
}

/// Form post from the dashboard picker. Validation problems re-render the
/// dashboard with the message inline.
pub async fn submit_mood_form(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Form(form): Form<MoodForm>,
) -> Result<Response, AppError> {
    let uid = user_key(&uid)?;
    let recorded = match MoodEntry::new(form.emoji, &form.note) {
        Ok(entry) => record_mood(&state, uid, &form.date, entry).await,
        Err(err) => Err(err.into()),
    };

    match recorded {
        Ok(_) => Ok(Redirect::to(&format!("/?user={uid}")).into_response()),
        Err(MoodWriteError::Validation(err)) => {
            let log = state.moods.read(uid).await?;
            let html = render_dashboard(Some(uid), &log, Some(&err));
            Ok((StatusCode::BAD_REQUEST, Html(html)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn weekly_summary(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<WeeklySummary>, AppError> {
    let log = state.moods.read(user_key(&uid)?).await?;
    Ok(Json(build_weekly_summary(&log)))
}

pub async fn ai_summary(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<AiSummaryResponse>, AppError> {
    let uid = user_key(&uid)?;
    let Some(liveness) = state.sessions.liveness(uid).await else {
        return Err(AppError::unauthorized("Sign in to generate a mood summary."));
    };

    match generate_summary(&state.moods, state.store.as_ref(), &state.analysis, uid, &liveness).await
    {
        Ok(outcome) => Ok(Json(AiSummaryResponse {
            generated: matches!(outcome, SummaryOutcome::Generated { .. }),
            summary: outcome.message().to_string(),
        })),
        Err(err) => {
            error!(uid, "mood analysis failed: {err}");
            Err(AppError::bad_gateway(GENERATION_FAILED_MESSAGE))
        }
    }
}

pub async fn download_report(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    let bytes = build_report(&state, user_key(&uid)?).await?;
    let disposition = format!("attachment; filename=\"{REPORT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn export_report(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<SavedReport>, AppError> {
    let uid = user_key(&uid)?;
    let bytes = build_report(&state, uid).await?;
    let path = save_report(&state.report_dir.join(uid), &bytes)
        .await
        .map_err(|_| report_failed())?;
    Ok(Json(SavedReport {
        path: path.display().to_string(),
    }))
}

async fn build_report(state: &AppState, uid: &str) -> Result<Vec<u8>, AppError> {
    let log = state.moods.read(uid).await?;
    let summary = report_summary_text(state.store.as_ref(), &state.analysis, uid).await;
    generate_report(&log, &summary).map_err(|err| {
        error!(uid, "report generation failed: {err}");
        report_failed()
    })
}

async fn record_mood(
    state: &AppState,
    uid: &str,
    date: &str,
    entry: MoodEntry,
) -> Result<MoodLog, MoodWriteError> {
    let cached = state.moods.read(uid).await?;
    let updated = state.moods.write(uid, &cached, date, entry).await?;
    info!(uid, date, "recorded mood");
    Ok(updated)
}

fn render_dashboard(user: Option<&str>, log: &MoodLog, error: Option<&ValidationError>) -> String {
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let summary = build_weekly_summary(log);
    let history = history_rows(log);
    let error = error.map(ToString::to_string);
    render_index(&DashboardView {
        user,
        today: &today,
        summary: &summary,
        history: &history,
        error: error.as_deref(),
    })
}

fn history_rows(log: &MoodLog) -> Vec<HistoryRow> {
    newest_first(log, None)
        .into_iter()
        .map(|(date, entry)| HistoryRow {
            date: date.clone(),
            emoji: entry.emoji.clone(),
            note: entry.note.clone(),
        })
        .collect()
}

fn report_failed() -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: report::GENERATION_FAILED_MESSAGE.to_string(),
    }
}

/// User ids end up in file paths and URLs, so only a conservative character
/// set is accepted.
fn user_key(uid: &str) -> Result<&str, AppError> {
    let valid = !uid.is_empty()
        && uid.len() <= 128
        && uid
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(uid)
    } else {
        Err(AppError::bad_request("invalid user id"))
    }
}
