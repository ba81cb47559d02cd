use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{AppError, AppResult};
use crate::models::AuthUser;

/// Persisted auth session, the local-storage analog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_authenticated: bool,
}

/// Cross-flow auth session container, injected at the application root.
/// Reads go through `state()`, writes through `sign_in`/`sign_out`, and
/// interested views `subscribe()`. Every write is serialized to the
/// session file so the session survives restarts; a missing or corrupt
/// file falls back to signed-out.
pub struct AuthStore {
    path: PathBuf,
    tx: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn load(path: &Path) -> Self {
        let state = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<AuthState>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("session file corrupt, starting signed out: {}", e);
                    AuthState::default()
                }
            },
            Err(_) => AuthState::default(),
        };
        let (tx, _) = watch::channel(state);
        Self {
            path: path.to_path_buf(),
            tx,
        }
    }

    pub fn state(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.tx.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, user: AuthUser) -> AppResult<()> {
        let state = AuthState {
            user: Some(user),
            is_authenticated: true,
        };
        self.persist(&state)?;
        self.tx.send_replace(state);
        Ok(())
    }

    pub fn sign_out(&self) -> AppResult<()> {
        let state = AuthState::default();
        self.persist(&state)?;
        self.tx.send_replace(state);
        Ok(())
    }

    /// Explicit serialization boundary: state crosses to disk only here
    fn persist(&self, state: &AuthState) -> AppResult<()> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::Internal(format!("session serialize error: {}", e)))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| AppError::Internal(format!("session write error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminRole, OrganizationInfo};

    fn user() -> AuthUser {
        AuthUser {
            id: "u-1".into(),
            name: "学生A".into(),
            admin: AdminRole::None,
            organization_info: OrganizationInfo::default(),
        }
    }

    #[test]
    fn test_sign_in_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = AuthStore::load(&path);
        assert_eq!(store.state(), AuthState::default());
        store.sign_in(user()).unwrap();

        let reloaded = AuthStore::load(&path);
        assert!(reloaded.state().is_authenticated);
        assert_eq!(reloaded.current_user().unwrap().id, "u-1");
    }

    #[test]
    fn test_sign_out_clears_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = AuthStore::load(&path);
        store.sign_in(user()).unwrap();
        store.sign_out().unwrap();

        assert_eq!(AuthStore::load(&path).state(), AuthState::default());
    }

    #[test]
    fn test_corrupt_session_file_falls_back_to_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = AuthStore::load(&path);
        assert_eq!(store.state(), AuthState::default());
    }

    #[test]
    fn test_subscribers_observe_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = AuthStore::load(&path);
        let rx = store.subscribe();
        store.sign_in(user()).unwrap();
        assert!(rx.borrow().is_authenticated);
    }
}
