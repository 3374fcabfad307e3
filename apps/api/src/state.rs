use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::collaborator::Collaborator;
use crate::config::Config;
use crate::errors::AppError;
use crate::session::Session;

/// One session, single writer at a time.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// In-memory only; sessions do not survive a restart.
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    /// Pluggable so tests can substitute a canned implementation.
    pub collaborator: Option<Arc<dyn Collaborator>>,
}

impl AppState {
    pub fn new(config: Config, collaborator: Option<Arc<dyn Collaborator>>) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            collaborator,
        }
    }

    pub async fn insert_session(&self, session: Session) -> Uuid {
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn session(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    pub async fn remove_session(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    pub fn collaborator(&self) -> Result<&dyn Collaborator, AppError> {
        self.collaborator
            .as_deref()
            .ok_or(AppError::CollaboratorUnavailable)
    }
}
