//! Per-identity dialogue sessions and their concurrency contract.
//!
//! Each identity owns at most one live session. The store hands out an
//! `Arc<Mutex<Session>>` per identity; callers lock it for the duration of
//! a transition, so transitions for one identity never interleave, while
//! different identities proceed fully in parallel. Tokio's mutex queues
//! waiters fairly, so messages are applied in the order their handlers were
//! spawned.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::catalog::Category;

use super::state::WizardState;

/// The mutable per-identity record of dialogue progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub state: WizardState,
    /// Set once when the category is chosen; cleared only by a reset.
    pub category: Option<Category>,
    /// Set once when the template is chosen; cleared only by a reset.
    pub template_id: Option<String>,
    /// Collected field values, one added per successful transition.
    pub fields: BTreeMap<String, String>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: WizardState::default(),
            category: None,
            template_id: None,
            fields: BTreeMap::new(),
            last_activity: Utc::now(),
        }
    }

    /// Discard everything collected and return to the initial state.
    pub fn reset(&mut self) {
        self.state = WizardState::default();
        self.category = None;
        self.template_id = None;
        self.fields.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Move to `target`, enforcing the state graph's legal edges. An illegal
    /// edge is a programming error in the machine, reported as `Err` so the
    /// caller can drop the transition instead of corrupting the session.
    pub fn transition(&mut self, target: WizardState) -> Result<(), String> {
        if !self.state.can_transition_to(target) {
            return Err(format!("illegal transition {} -> {}", self.state, target));
        }
        self.state = target;
        self.touch();
        Ok(())
    }
}

/// In-memory session store keyed by identity.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session handle for an identity, creating a fresh session if
    /// none exists. The handle is stable: replacing it would let queued
    /// transitions race, so a restart resets the session in place instead.
    pub async fn obtain(&self, user_id: &str) -> Arc<Mutex<Session>> {
        if let Some(handle) = self.sessions.read().await.get(user_id) {
            return Arc::clone(handle);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(user_id)))),
        )
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle longer than `max_idle`. Pruning is equivalent to
    /// cancel: collected-but-unsaved data is discarded.
    pub async fn prune_idle(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.write().await;
        let mut stale = Vec::new();
        for (user_id, handle) in sessions.iter() {
            // A locked session is mid-transition, hence not idle.
            if let Ok(session) = handle.try_lock() {
                if session.last_activity < cutoff {
                    stale.push(user_id.clone());
                }
            }
        }
        for user_id in &stale {
            sessions.remove(user_id);
            tracing::info!(user_id = %user_id, "Pruned idle session");
        }
        stale.len()
    }
}

/// Spawn the periodic idle-session sweep.
pub fn spawn_idle_sweep(
    store: Arc<SessionStore>,
    max_idle: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let max_idle = chrono::Duration::from_std(max_idle)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let pruned = store.prune_idle(max_idle).await;
            if pruned > 0 {
                tracing::debug!(pruned, "Idle session sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_initial() {
        let session = Session::new("u1");
        assert_eq!(session.state, WizardState::MainMenu);
        assert!(session.category.is_none());
        assert!(session.template_id.is_none());
        assert!(session.fields.is_empty());
    }

    #[test]
    fn reset_discards_everything() {
        let mut session = Session::new("u1");
        session.transition(WizardState::SelectTemplate).unwrap();
        session.category = Some(Category::Bill);
        session.template_id = Some("bill_utility".to_string());
        session.fields.insert("company".into(), "Hydro".into());

        session.reset();
        assert_eq!(session.state, WizardState::MainMenu);
        assert!(session.category.is_none());
        assert!(session.template_id.is_none());
        assert!(session.fields.is_empty());
    }

    #[test]
    fn transition_rejects_illegal_edges() {
        let mut session = Session::new("u1");
        assert!(session.transition(WizardState::Confirm).is_err());
        assert_eq!(session.state, WizardState::MainMenu, "state unchanged on error");
        assert!(session.transition(WizardState::SelectTemplate).is_ok());
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = Session::new("u1");
        session.category = Some(Category::Payroll);
        session.fields.insert("first_name".into(), "Alice".into());

        let json = serde_json::to_string(&session).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.user_id, "u1");
        assert_eq!(parsed.category, Some(Category::Payroll));
        assert_eq!(parsed.fields["first_name"], "Alice");
    }

    #[tokio::test]
    async fn obtain_returns_same_handle() {
        let store = SessionStore::new();
        let a = store.obtain("u1").await;
        let b = store.obtain("u1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_independent_per_identity() {
        let store = SessionStore::new();
        let a = store.obtain("u1").await;
        let b = store.obtain("u2").await;
        assert!(!Arc::ptr_eq(&a, &b));

        a.lock().await.fields.insert("first_name".into(), "A".into());
        assert!(b.lock().await.fields.is_empty());
    }

    #[tokio::test]
    async fn prune_removes_only_stale_sessions() {
        let store = SessionStore::new();
        let stale = store.obtain("stale").await;
        stale.lock().await.last_activity = Utc::now() - chrono::Duration::hours(2);
        store.obtain("fresh").await;

        let pruned = store.prune_idle(chrono::Duration::hours(1)).await;
        assert_eq!(pruned, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_transitions_serialize_per_identity() {
        let store = Arc::new(SessionStore::new());
        let handle = store.obtain("u1").await;

        let mut tasks = Vec::new();
        for i in 0..16 {
            let handle = Arc::clone(&handle);
            tasks.push(tokio::spawn(async move {
                let mut session = handle.lock().await;
                session
                    .fields
                    .insert(format!("field_{i}"), i.to_string());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(handle.lock().await.fields.len(), 16);
    }
}
