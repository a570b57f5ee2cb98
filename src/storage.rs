use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, path::Path, path::PathBuf};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::error;

/// A stored document: top-level field name to value.
pub type Document = Map<String, Value>;

pub const USERS: &str = "users";
pub const MOOD_SUMMARIES: &str = "mood_summaries";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode store data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write store data: {0}")]
    Io(#[from] std::io::Error),
}

/// Keyed document store. `set` with `merge` replaces only the top-level
/// fields present in `partial`; without it the document is replaced.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn set(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
        merge: bool,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    pub collections: BTreeMap<String, BTreeMap<String, Document>>,
}

impl StoreData {
    fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    fn set(&mut self, collection: &str, id: &str, partial: Document, merge: bool) {
        let documents = self.collections.entry(collection.to_string()).or_default();
        if merge {
            if let Some(existing) = documents.get_mut(id) {
                existing.extend(partial);
                return;
            }
        }
        documents.insert(id.to_string(), partial);
    }
}

/// JSON file backed store. Every write rewrites the whole file.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let data = load_data(&path).await;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.data.lock().await.get(collection, id))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        data.set(collection, id, partial, merge);
        persist_data(&self.path, &data).await
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.data.lock().await.get(collection, id))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        partial: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.data.lock().await.set(collection, id, partial, merge);
        Ok(())
    }
}

pub async fn load_data(path: &Path) -> StoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                StoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            StoreData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
