//! Authenticated session.
//!
//! [`AuthSession`] owns the bearer token and the cached profile and keeps
//! them consistent with the backend's profile check. Only an authoritative
//! reject (401/403) ends a session; timeouts, unreachable servers, other
//! statuses and malformed payloads are logged and leave it as it was.
//!
//! Every verification request is tagged with the session epoch and a
//! sequence number. A response is applied only if no login or logout
//! happened since it was issued and no newer response has been applied, so
//! a slow request can never overwrite newer state.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use examdesk_client::{ExamdeskClient, FaultKind, UserProfile};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Result, StateError};
use crate::store::{SharedStore, keys, load_json, save_json};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// What the UI sees of the session.
///
/// `is_logged_in` means a token is held locally, not that the backend has
/// accepted it. `user` is only ever set while logged in, but may be empty
/// while logged in if the profile check has not succeeded yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub is_logged_in: bool,
    pub user: Option<UserProfile>,
    /// True only while the initial restore is checking the token.
    pub loading: bool,
}

/// Result of a profile-verification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The backend accepted the token; the profile was updated.
    Verified,
    /// The backend rejected the token; the session was cleared.
    Rejected,
    /// The check failed for a reason that says nothing about the token.
    Transient(FaultKind),
    /// A login, logout or newer check overtook this one; its response was
    /// dropped.
    Superseded,
    /// There is no token to verify.
    NoToken,
}

/// Source of user profiles for a bearer token.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile belonging to `token`.
    async fn fetch_profile(&self, token: &str) -> examdesk_client::Result<UserProfile>;
}

#[async_trait]
impl ProfileSource for ExamdeskClient {
    async fn fetch_profile(&self, token: &str) -> examdesk_client::Result<UserProfile> {
        self.profile().get(token).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthSession
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Guard {
    /// Bumped by login and logout.
    epoch: u64,
    /// Last sequence number handed to a request.
    issued: u64,
    /// Sequence number of the last response applied.
    applied: u64,
}

struct Inner {
    store: SharedStore,
    profiles: Arc<dyn ProfileSource>,
    state: watch::Sender<SessionState>,
    guard: Mutex<Guard>,
}

/// The application's authenticated session.
///
/// Create one at startup, call [`restore`](Self::restore), and share clones.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<Inner>,
}

impl AuthSession {
    /// Create a session over `store`, verifying tokens against `profiles`.
    ///
    /// Starts logged out with `loading` set until [`restore`](Self::restore)
    /// finishes.
    pub fn new(store: SharedStore, profiles: Arc<dyn ProfileSource>) -> Self {
        let initial = SessionState {
            loading: true,
            ..SessionState::default()
        };
        Self {
            inner: Arc::new(Inner {
                store,
                profiles,
                state: watch::Sender::new(initial),
                guard: Mutex::new(Guard::default()),
            }),
        }
    }

    /// Load the persisted session and verify it.
    ///
    /// A persisted token makes the session logged in straight away, with the
    /// cached profile if one survived. `loading` is cleared once the check
    /// settles, whatever its outcome.
    pub async fn restore(&self) -> VerifyOutcome {
        let store = self.inner.store.as_ref();
        let token = match store.get(keys::SESSION_TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            // A profile without a token is left over from an interrupted write.
            if let Err(e) = store.remove(keys::SESSION_USER) {
                warn!(error = %e, "Failed to remove orphaned profile");
            }
            self.inner.state.send_replace(SessionState::default());
            debug!("No persisted session");
            return VerifyOutcome::NoToken;
        };

        let user: Option<UserProfile> = load_json(store, keys::SESSION_USER);
        debug!(cached_profile = user.is_some(), "Restoring persisted session");
        self.inner.state.send_replace(SessionState {
            token: Some(token),
            is_logged_in: true,
            user,
            loading: true,
        });

        let outcome = self.verify().await;
        self.inner.state.send_modify(|s| s.loading = false);
        outcome
    }

    /// Log in with `token` and wait for the profile check.
    ///
    /// The token is persisted before the check runs, and any profile from a
    /// previous session is dropped. Fails only if the token is empty or
    /// cannot be persisted; a failed check is reported in the outcome.
    pub async fn login(&self, token: &str) -> Result<VerifyOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StateError::InvalidToken("token is empty".to_string()));
        }

        {
            let mut guard = self.inner.guard.lock();
            let store = self.inner.store.as_ref();
            store.set(keys::SESSION_TOKEN, token)?;
            store.remove(keys::SESSION_USER)?;

            guard.epoch += 1;
            self.inner.state.send_replace(SessionState {
                token: Some(token.to_string()),
                is_logged_in: true,
                user: None,
                loading: false,
            });
            info!(epoch = guard.epoch, "Logged in");
        }

        Ok(self.verify().await)
    }

    /// Clear the session in memory and in storage.
    ///
    /// Only the `session.` namespace is removed; exam progress stays.
    pub fn logout(&self) -> Result<()> {
        let mut guard = self.inner.guard.lock();
        let removed = self.clear_locked(&mut guard)?;
        info!(removed, "Logged out");
        Ok(())
    }

    /// Re-check the current token against the backend.
    pub async fn refresh_profile(&self) -> VerifyOutcome {
        self.verify().await
    }

    /// Current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Watch for state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.borrow().is_logged_in
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    async fn verify(&self) -> VerifyOutcome {
        let (token, epoch, seq) = {
            let mut guard = self.inner.guard.lock();
            let token = self.inner.state.borrow().token.clone();
            let Some(token) = token else {
                return VerifyOutcome::NoToken;
            };
            guard.issued += 1;
            (token, guard.epoch, guard.issued)
        };

        debug!(epoch, seq, "Verifying session token");
        let result = self.inner.profiles.fetch_profile(&token).await;

        let mut guard = self.inner.guard.lock();
        if guard.epoch != epoch || seq <= guard.applied {
            debug!(
                epoch,
                seq,
                current_epoch = guard.epoch,
                applied = guard.applied,
                "Discarding superseded profile response"
            );
            return VerifyOutcome::Superseded;
        }
        guard.applied = seq;

        match result {
            Ok(profile) => {
                if let Err(e) = save_json(self.inner.store.as_ref(), keys::SESSION_USER, &profile) {
                    warn!(error = %e, "Failed to persist profile");
                }
                debug!(user = profile.display_name(), "Session verified");
                self.inner.state.send_modify(|s| s.user = Some(profile));
                VerifyOutcome::Verified
            }
            Err(e) => match e.fault_kind() {
                FaultKind::AuthRejected => {
                    warn!(error = %e, "Token rejected, ending session");
                    if let Err(e) = self.clear_locked(&mut guard) {
                        warn!(error = %e, "Failed to clear persisted session");
                    }
                    VerifyOutcome::Rejected
                }
                kind => {
                    warn!(error = %e, fault = ?kind, "Profile check failed, keeping session");
                    VerifyOutcome::Transient(kind)
                }
            },
        }
    }

    /// Reset in-memory state, then the persisted session namespace.
    fn clear_locked(&self, guard: &mut MutexGuard<'_, Guard>) -> Result<usize> {
        guard.epoch += 1;
        self.inner.state.send_replace(SessionState::default());
        self.inner.store.remove_prefix(keys::SESSION_PREFIX)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("AuthSession")
            .field("is_logged_in", &state.is_logged_in)
            .field("has_user", &state.user.is_some())
            .field("loading", &state.loading)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use examdesk_client::Error as ClientError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    enum Reply {
        Profile(&'static str),
        Status(u16),
        Malformed,
    }

    struct Step {
        gate: Option<oneshot::Receiver<()>>,
        reply: Reply,
    }

    /// Replies to profile requests in order, optionally waiting on a gate.
    #[derive(Default)]
    struct ScriptedProfiles {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedProfiles {
        fn reply(&self, reply: Reply) {
            self.steps.lock().push_back(Step { gate: None, reply });
        }

        fn gated(&self, reply: Reply) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.steps.lock().push_back(Step {
                gate: Some(rx),
                reply,
            });
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            ..UserProfile::default()
        }
    }

    #[async_trait]
    impl ProfileSource for ScriptedProfiles {
        async fn fetch_profile(&self, _token: &str) -> examdesk_client::Result<UserProfile> {
            let step = self.steps.lock().pop_front();
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(step) = step else {
                panic!("unexpected profile request");
            };
            if let Some(gate) = step.gate {
                let _ = gate.await;
            }
            match step.reply {
                Reply::Profile(name) => Ok(profile(name)),
                Reply::Status(status @ (401 | 403)) => Err(ClientError::Auth {
                    status,
                    message: "invalid token".to_string(),
                }),
                Reply::Status(status) => Err(ClientError::Api {
                    status,
                    code: "error".to_string(),
                    message: "backend unavailable".to_string(),
                }),
                Reply::Malformed => {
                    Err(serde_json::from_str::<UserProfile>("<html>").unwrap_err().into())
                }
            }
        }
    }

    fn setup() -> (AuthSession, Arc<MemoryStore>, Arc<ScriptedProfiles>) {
        let store = Arc::new(MemoryStore::new());
        let profiles = Arc::new(ScriptedProfiles::default());
        let session = AuthSession::new(store.clone(), profiles.clone());
        (session, store, profiles)
    }

    fn persist_session(store: &MemoryStore, user: Option<&str>) {
        store.set(keys::SESSION_TOKEN, "persisted-token").unwrap();
        if let Some(name) = user {
            save_json(store, keys::SESSION_USER, &profile(name)).unwrap();
        }
        store.set(keys::UNLOCKED_COURSES, r#"["c1"]"#).unwrap();
    }

    async fn wait_for_calls(profiles: &ScriptedProfiles, n: usize) {
        while profiles.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let (session, store, profiles) = setup();
        store.set(keys::SESSION_USER, r#"{"name":"Orphan"}"#).unwrap();
        assert!(session.snapshot().loading);

        assert_eq!(session.restore().await, VerifyOutcome::NoToken);

        let state = session.snapshot();
        assert!(!state.is_logged_in);
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(store.get(keys::SESSION_USER).unwrap(), None);
        assert_eq!(profiles.calls(), 0);
    }

    #[tokio::test]
    async fn test_restore_hydrates_then_verifies() {
        let (session, store, profiles) = setup();
        persist_session(&store, Some("Cached"));
        let release = profiles.gated(Reply::Profile("Fresh"));

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.restore().await }
        });
        wait_for_calls(&profiles, 1).await;

        let state = session.snapshot();
        assert!(state.is_logged_in);
        assert!(state.loading);
        assert_eq!(state.user.unwrap().name.as_deref(), Some("Cached"));

        release.send(()).unwrap();
        assert_eq!(task.await.unwrap(), VerifyOutcome::Verified);

        let state = session.snapshot();
        assert!(!state.loading);
        assert_eq!(state.user.unwrap().name.as_deref(), Some("Fresh"));
        let persisted: UserProfile = load_json(&*store, keys::SESSION_USER).unwrap();
        assert_eq!(persisted.name.as_deref(), Some("Fresh"));
    }

    #[tokio::test]
    async fn test_restore_token_without_user() {
        let (session, store, profiles) = setup();
        persist_session(&store, None);
        profiles.reply(Reply::Status(503));

        assert_eq!(
            session.restore().await,
            VerifyOutcome::Transient(FaultKind::Status(503))
        );

        let state = session.snapshot();
        assert!(state.is_logged_in);
        assert!(state.user.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_profile() {
        let (session, store, profiles) = setup();
        persist_session(&store, None);
        store.set(keys::SESSION_USER, "{broken").unwrap();
        profiles.reply(Reply::Status(500));

        session.restore().await;

        assert!(session.is_logged_in());
        assert!(session.user().is_none());
        assert_eq!(store.get(keys::SESSION_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_reject_logs_out_and_keeps_progress() {
        for status in [401, 403] {
            let (session, store, profiles) = setup();
            persist_session(&store, Some("Cached"));
            profiles.reply(Reply::Status(status));

            assert_eq!(session.restore().await, VerifyOutcome::Rejected);

            let state = session.snapshot();
            assert!(!state.is_logged_in);
            assert!(state.token.is_none());
            assert!(state.user.is_none());
            assert!(!state.loading);
            assert_eq!(store.get(keys::SESSION_TOKEN).unwrap(), None);
            assert_eq!(store.get(keys::SESSION_USER).unwrap(), None);
            assert!(store.get(keys::UNLOCKED_COURSES).unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_transient_faults_keep_session() {
        for reply in [Reply::Status(500), Reply::Status(404), Reply::Malformed] {
            let (session, store, profiles) = setup();
            persist_session(&store, Some("Cached"));
            profiles.reply(reply);

            let outcome = session.restore().await;
            assert!(matches!(outcome, VerifyOutcome::Transient(_)));

            let state = session.snapshot();
            assert!(state.is_logged_in);
            assert_eq!(state.token.as_deref(), Some("persisted-token"));
            assert_eq!(state.user.unwrap().name.as_deref(), Some("Cached"));
            assert!(store.get(keys::SESSION_TOKEN).unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_login_persists_and_verifies() {
        let (session, store, profiles) = setup();
        session.restore().await;
        profiles.reply(Reply::Profile("Ada"));

        let outcome = session.login("  new-token ").await.unwrap();

        assert_eq!(outcome, VerifyOutcome::Verified);
        assert_eq!(session.token().as_deref(), Some("new-token"));
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Ada"));
        assert_eq!(
            store.get(keys::SESSION_TOKEN).unwrap().as_deref(),
            Some("new-token")
        );
    }

    #[tokio::test]
    async fn test_login_drops_previous_user() {
        let (session, store, profiles) = setup();
        persist_session(&store, Some("Previous"));
        profiles.reply(Reply::Profile("Previous"));
        session.restore().await;

        profiles.reply(Reply::Status(502));
        let outcome = session.login("other-token").await.unwrap();

        assert_eq!(outcome, VerifyOutcome::Transient(FaultKind::Status(502)));
        assert!(session.is_logged_in());
        assert!(session.user().is_none());
        assert_eq!(store.get(keys::SESSION_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_token() {
        let (session, _store, profiles) = setup();
        let err = session.login("   ").await.unwrap_err();
        assert!(matches!(err, StateError::InvalidToken(_)));
        assert_eq!(profiles.calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_session_namespace_only() {
        let (session, store, profiles) = setup();
        persist_session(&store, Some("Cached"));
        profiles.reply(Reply::Profile("Cached"));
        session.restore().await;

        session.logout().unwrap();

        assert_eq!(session.snapshot(), SessionState::default());
        assert_eq!(store.keys().unwrap(), vec![keys::UNLOCKED_COURSES.to_string()]);
        assert_eq!(session.refresh_profile().await, VerifyOutcome::NoToken);
    }

    #[tokio::test]
    async fn test_response_after_logout_is_discarded() {
        let (session, store, profiles) = setup();
        session.restore().await;
        let release = profiles.gated(Reply::Profile("Late"));

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.login("token").await }
        });
        wait_for_calls(&profiles, 1).await;

        session.logout().unwrap();
        release.send(()).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), VerifyOutcome::Superseded);
        assert!(!session.is_logged_in());
        assert!(session.user().is_none());
        assert_eq!(store.get(keys::SESSION_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_reject_for_previous_login_is_discarded() {
        let (session, _store, profiles) = setup();
        session.restore().await;
        let release = profiles.gated(Reply::Status(401));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.login("old-token").await }
        });
        wait_for_calls(&profiles, 1).await;

        profiles.reply(Reply::Profile("Current"));
        let outcome = session.login("new-token").await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), VerifyOutcome::Superseded);

        assert!(session.is_logged_in());
        assert_eq!(session.token().as_deref(), Some("new-token"));
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Current"));
    }

    #[tokio::test]
    async fn test_older_check_cannot_overwrite_newer() {
        let (session, store, profiles) = setup();
        persist_session(&store, None);
        profiles.reply(Reply::Profile("First"));
        session.restore().await;

        let release = profiles.gated(Reply::Profile("Stale"));
        let slow = tokio::spawn({
            let session = session.clone();
            async move { session.refresh_profile().await }
        });
        wait_for_calls(&profiles, 2).await;

        profiles.reply(Reply::Profile("Newest"));
        assert_eq!(session.refresh_profile().await, VerifyOutcome::Verified);

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), VerifyOutcome::Superseded);
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Newest"));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (session, store, profiles) = setup();
        let mut rx = session.subscribe();
        persist_session(&store, None);
        profiles.reply(Reply::Profile("Ada"));

        session.restore().await;
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.is_logged_in);
        assert!(!state.loading);

        session.logout().unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_logged_in);
    }
}
