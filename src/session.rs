//! Signed-in sessions.
//!
//! The registry is created once at startup and handed around through
//! `AppState`. Sign-in and sign-out are published on a broadcast channel;
//! subscribers unsubscribe by dropping their receiver.

use crate::models::UserProfile;
use crate::storage::{Document, DocumentStore, StoreError, USERS};
use chrono::Utc;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{
    broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    oneshot, Mutex,
};
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserProfile),
    SignedOut { uid: String },
}

/// Shared flag telling in-flight work whether its session is still open.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn end(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Session {
    profile: UserProfile,
    liveness: Liveness,
}

pub struct SessionRegistry {
    store: Arc<dyn DocumentStore>,
    sessions: Mutex<HashMap<String, Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Records the profile on the user's document (merge, so `moods` is
    /// untouched) and opens a session. Signing in again replaces the previous
    /// session and ends its liveness.
    pub async fn sign_in(&self, profile: UserProfile) -> Result<Liveness, StoreError> {
        let mut partial = Document::new();
        partial.insert("email".to_string(), Value::String(profile.email.clone()));
        partial.insert(
            "displayName".to_string(),
            Value::String(profile.display_name.clone()),
        );
        partial.insert("createdAt".to_string(), Value::String(Utc::now().to_rfc3339()));
        self.store.set(USERS, &profile.uid, partial, true).await?;

        let liveness = Liveness::new();
        let previous = self.sessions.lock().await.insert(
            profile.uid.clone(),
            Session {
                profile: profile.clone(),
                liveness: liveness.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.liveness.end();
        }

        info!(uid = %profile.uid, "signed in as {}", profile.display_name);
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::SignedIn(profile));
        Ok(liveness)
    }

    /// Returns false when the user had no open session.
    pub async fn sign_out(&self, uid: &str) -> bool {
        let Some(session) = self.sessions.lock().await.remove(uid) else {
            return false;
        };
        session.liveness.end();
        info!(uid, "signed out");
        let _ = self.events.send(SessionEvent::SignedOut {
            uid: uid.to_string(),
        });
        true
    }

    pub async fn liveness(&self, uid: &str) -> Option<Liveness> {
        self.sessions
            .lock()
            .await
            .get(uid)
            .map(|session| session.liveness.clone())
    }

    pub async fn profile(&self, uid: &str) -> Option<UserProfile> {
        self.sessions
            .lock()
            .await
            .get(uid)
            .map(|session| session.profile.clone())
    }

    /// Ends every session, e.g. on shutdown.
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.lock().await;
        for (uid, session) in sessions.drain() {
            session.liveness.end();
            let _ = self.events.send(SessionEvent::SignedOut { uid });
        }
    }
}

/// Logs session events until `stop` fires, then logs whatever is still
/// queued. Returns how many events were logged.
pub async fn log_events(
    mut events: broadcast::Receiver<SessionEvent>,
    mut stop: oneshot::Receiver<()>,
) -> usize {
    let mut logged = 0;
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(event) => {
                    log_event(&event);
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session events dropped"),
                Err(RecvError::Closed) => return logged,
            },
            _ = &mut stop => break,
        }
    }
    loop {
        match events.try_recv() {
            Ok(event) => {
                log_event(&event);
                logged += 1;
            }
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "session events dropped"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return logged,
        }
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::SignedIn(profile) => info!(uid = %profile.uid, "session opened"),
        SessionEvent::SignedOut { uid } => info!(uid = %uid, "session closed"),
    }
}
