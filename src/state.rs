use crate::analysis::{AnalysisClient, AnalysisError};
use crate::config::AppConfig;
use crate::moods::MoodStore;
use crate::session::SessionRegistry;
use crate::storage::DocumentStore;
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub moods: MoodStore,
    pub sessions: Arc<SessionRegistry>,
    pub analysis: AnalysisClient,
    pub report_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Result<Self, AnalysisError> {
        let analysis = AnalysisClient::new(&config.analysis_base_url, config.analysis_timeout)?;
        Ok(Self {
            moods: MoodStore::new(store.clone()),
            sessions: Arc::new(SessionRegistry::new(store.clone())),
            store,
            analysis,
            report_dir: config.report_dir.clone(),
        })
    }
}
