//! Client for the external mood analysis backend and the summary flow built
//! on top of it.

use crate::models::MoodEntry;
use crate::moods::{string_field, MoodStore};
use crate::session::Liveness;
use crate::storage::{Document, DocumentStore, StoreError, MOOD_SUMMARIES};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const NO_DATA_MESSAGE: &str = "No mood data available to analyze.";
pub const NO_VALID_ENTRIES_MESSAGE: &str = "No valid mood entries (emoji + note) to analyze.";
pub const GENERATION_FAILED_MESSAGE: &str = "Could not generate summary at this time.";
pub const NO_ANALYSIS_MESSAGE: &str = "No AI analysis found.";
const INVALID_SUMMARY_MESSAGE: &str = "Backend did not return a valid summary.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    moods: &'a [MoodEntry],
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    summary: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct StoredAnalysisResponse {
    analysis: Option<String>,
}

#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `POST /api/analyze-moods`
    pub async fn analyze(&self, entries: &[MoodEntry]) -> Result<String, AnalysisError> {
        let response = self
            .http
            .post(format!("{}/api/analyze-moods", self.base_url))
            .json(&AnalyzeRequest { moods: entries })
            .send()
            .await?;

        let status = response.status();
        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|err| AnalysisError::Backend(format!("{status}: {err}")))?;

        match body {
            AnalyzeResponse {
                summary: Some(summary),
                ..
            } if status.is_success() && !summary.trim().is_empty() => Ok(summary.trim().to_string()),
            AnalyzeResponse { error, .. } => Err(AnalysisError::Backend(
                error.unwrap_or_else(|| INVALID_SUMMARY_MESSAGE.to_string()),
            )),
        }
    }

    /// `GET /api/analysis/{user_id}`; a response without an `analysis` field
    /// means nothing is stored.
    pub async fn stored_analysis(&self, user_id: &str) -> Result<Option<String>, AnalysisError> {
        let response = self
            .http
            .get(format!("{}/api/analysis/{user_id}", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Backend(format!("stored analysis returned {status}")));
        }
        let body: StoredAnalysisResponse = response.json().await?;
        Ok(body.analysis.filter(|text| !text.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    NoData,
    NoValidEntries,
    Generated { summary: String, persisted: bool },
}

impl SummaryOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::NoData => NO_DATA_MESSAGE,
            Self::NoValidEntries => NO_VALID_ENTRIES_MESSAGE,
            Self::Generated { summary, .. } => summary,
        }
    }
}

/// Sends the user's complete entries to the backend and stores the result
/// in `mood_summaries/{uid}`.
///
/// The result is only stored if `liveness` still holds when the backend
/// answers; a summary for a session that ended meanwhile is dropped.
pub async fn generate_summary(
    moods: &MoodStore,
    store: &dyn DocumentStore,
    client: &AnalysisClient,
    uid: &str,
    liveness: &Liveness,
) -> Result<SummaryOutcome, SummaryError> {
    let log = moods.read(uid).await?;
    if log.is_empty() {
        return Ok(SummaryOutcome::NoData);
    }

    let entries: Vec<MoodEntry> = log.into_values().filter(MoodEntry::is_complete).collect();
    if entries.is_empty() {
        return Ok(SummaryOutcome::NoValidEntries);
    }

    let summary = client.analyze(&entries).await?;

    if !liveness.is_live() {
        debug!(uid, "session ended before the summary arrived; discarding it");
        return Ok(SummaryOutcome::Generated {
            summary,
            persisted: false,
        });
    }

    let mut partial = Document::new();
    partial.insert("summary".to_string(), Value::String(summary.clone()));
    partial.insert("generatedAt".to_string(), Value::String(Utc::now().to_rfc3339()));
    store.set(MOOD_SUMMARIES, uid, partial, true).await?;

    Ok(SummaryOutcome::Generated {
        summary,
        persisted: true,
    })
}

/// Summary text for the exported report: the locally stored summary, then
/// whatever the backend has stored, then a fixed notice.
pub async fn report_summary_text(
    store: &dyn DocumentStore,
    client: &AnalysisClient,
    uid: &str,
) -> String {
    match store.get(MOOD_SUMMARIES, uid).await {
        Ok(Some(document)) => {
            if let Some(summary) = string_field(&document, "summary") {
                return summary;
            }
        }
        Ok(None) => {}
        Err(err) => warn!(uid, "failed to read stored summary: {err}"),
    }

    match client.stored_analysis(uid).await {
        Ok(Some(analysis)) => analysis,
        Ok(None) => NO_ANALYSIS_MESSAGE.to_string(),
        Err(err) => {
            warn!(uid, "failed to fetch stored analysis: {err}");
            NO_ANALYSIS_MESSAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;
    use crate::session::SessionRegistry;
    use crate::storage::{MemoryStore, USERS};
    use serde_json::json;
    use std::sync::Arc;

    fn unreachable_client() -> AnalysisClient {
        // Port 9 (discard) is not expected to accept HTTP connections.
        AnalysisClient::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap()
    }

    async fn live_session(store: Arc<MemoryStore>) -> Liveness {
        SessionRegistry::new(store)
            .sign_in(UserProfile {
                uid: "u1".to_string(),
                display_name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(unreachable_client().base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(SummaryOutcome::NoData.message(), NO_DATA_MESSAGE);
        assert_eq!(SummaryOutcome::NoValidEntries.message(), NO_VALID_ENTRIES_MESSAGE);
        let generated = SummaryOutcome::Generated {
            summary: "steady".to_string(),
            persisted: true,
        };
        assert_eq!(generated.message(), "steady");
    }

    #[tokio::test]
    async fn empty_log_short_circuits_before_network() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let moods = MoodStore::new(store.clone());
        let liveness = live_session(store.clone()).await;

        let outcome = generate_summary(&moods, store.as_ref(), &unreachable_client(), "u1", &liveness)
            .await
            .unwrap();
        assert_eq!(outcome, SummaryOutcome::NoData);
    }

    #[tokio::test]
    async fn incomplete_entries_are_filtered() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mut document = Document::new();
        document.insert(
            "moods".to_string(),
            json!({ "2024-06-01": { "emoji": "😊", "note": "" } }),
        );
        store.set(USERS, "u1", document, true).await.unwrap();
        let moods = MoodStore::new(store.clone());
        let liveness = live_session(store.clone()).await;

        let outcome = generate_summary(&moods, store.as_ref(), &unreachable_client(), "u1", &liveness)
            .await
            .unwrap();
        assert_eq!(outcome, SummaryOutcome::NoValidEntries);
    }

    #[tokio::test]
    async fn report_text_prefers_local_summary() {
        let store = MemoryStore::new();
        let mut document = Document::new();
        document.insert("summary".to_string(), json!("a gentle week"));
        store.set(MOOD_SUMMARIES, "u1", document, true).await.unwrap();

        let text = report_summary_text(&store, &unreachable_client(), "u1").await;
        assert_eq!(text, "a gentle week");
    }

    #[tokio::test]
    async fn report_text_falls_back_when_backend_unreachable() {
        let store = MemoryStore::new();
        let text = report_summary_text(&store, &unreachable_client(), "u1").await;
        assert_eq!(text, NO_ANALYSIS_MESSAGE);
    }
}
