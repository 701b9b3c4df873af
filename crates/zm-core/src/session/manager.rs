//! Session management

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::session::ChatSession;
use crate::{Error, Result};

/// Shared handle to one session
///
/// The mutex serializes interactions within a session.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

/// Owns every live chat session, keyed by session id
///
/// Sessions are removed explicitly with [`SessionManager::end`], or swept
/// once they have been idle longer than `max_idle`.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    max_idle: Option<chrono::Duration>,
}

impl SessionManager {
    /// Create an empty session manager that never expires sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session manager that expires idle sessions
    ///
    /// A zero duration disables expiry.
    pub fn with_max_idle(max_idle: Duration) -> Self {
        Self {
            sessions: RwLock::default(),
            max_idle: chrono::Duration::from_std(max_idle)
                .ok()
                .filter(|d| !d.is_zero()),
        }
    }

    /// Look up `id`, or create a fresh session when it is absent or unknown
    ///
    /// Returns the id actually in use together with the session.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        if let Some(id) = id {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                debug!("Session found: {}", id);
                return (id.to_string(), session.clone());
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        info!("Creating new session: {}", id);
        let session = Arc::new(Mutex::new(ChatSession::new(id.clone())));

        let mut sessions = self.sessions.write().await;
        self.sweep_idle(&mut sessions);
        sessions.insert(id.clone(), session.clone());

        (id, session)
    }

    /// Get an existing session
    pub async fn get(&self, id: &str) -> Result<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Drop sessions with no activity for longer than `max_idle`
    ///
    /// Sessions busy with a request are never swept.
    fn sweep_idle(&self, sessions: &mut HashMap<String, SessionHandle>) {
        let Some(max_idle) = self.max_idle else {
            return;
        };
        let cutoff = Utc::now() - max_idle;

        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(session) if session.updated_at < cutoff => {
                info!("Expiring idle session: {}", id);
                false
            }
            _ => true,
        });
    }

    /// Tear down a session, dropping its conversation
    pub async fn end(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            info!("Ended session: {}", id);
        }
        removed
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create() {
        let manager = SessionManager::new();

        let (id, _) = manager.get_or_create(None).await;
        let (same_id, _) = manager.get_or_create(Some(&id)).await;

        assert_eq!(id, same_id);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_creates_new_session() {
        let manager = SessionManager::new();

        let (id, _) = manager.get_or_create(Some("stale-cookie")).await;

        assert_ne!(id, "stale-cookie");
        assert!(manager.get("stale-cookie").await.is_err());
        assert!(manager.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let manager = SessionManager::new();

        let (a, session_a) = manager.get_or_create(None).await;
        let (b, session_b) = manager.get_or_create(None).await;
        assert_ne!(a, b);

        session_a.lock().await.set_notice(crate::session::Notice::new(
            crate::session::NoticeLevel::Info,
            crate::session::NoticeArea::Sidebar,
            "only for a",
        ));
        assert!(session_b.lock().await.take_notice().is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_are_swept() {
        let manager = SessionManager::with_max_idle(Duration::from_secs(3600));

        let (stale, session) = manager.get_or_create(None).await;
        session.lock().await.updated_at = Utc::now() - chrono::Duration::hours(2);
        let (fresh, _) = manager.get_or_create(None).await;
        let (newest, _) = manager.get_or_create(None).await;

        assert!(manager.get(&stale).await.is_err());
        assert!(manager.get(&fresh).await.is_ok());
        assert!(manager.get(&newest).await.is_ok());
        assert_eq!(manager.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_zero_idle_never_expires() {
        let manager = SessionManager::with_max_idle(Duration::ZERO);

        let (old, session) = manager.get_or_create(None).await;
        session.lock().await.updated_at = Utc::now() - chrono::Duration::days(30);
        manager.get_or_create(None).await;

        assert!(manager.get(&old).await.is_ok());
    }

    #[tokio::test]
    async fn test_end_session() {
        let manager = SessionManager::new();

        let (id, _) = manager.get_or_create(None).await;
        assert!(manager.end(&id).await);
        assert!(!manager.end(&id).await);

        let err = manager.get(&id).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
        assert_eq!(manager.session_count().await, 0);
    }
}
