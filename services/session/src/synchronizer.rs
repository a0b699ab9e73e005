//! Session synchronizer core
//!
//! Keeps an in-memory view of the session eventually consistent with
//! persisted storage. Storage is the single source of truth; the
//! in-memory state is a cache that is recomputed from the two session
//! keys, never the other way around — except right after a successful
//! login or profile update, where the new value is written to storage
//! first and then read back before anything else trusts it.

use common::storage::StorageContext;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::UserRecord;

/// Persisted storage key holding the opaque bearer token
pub const TOKEN_KEY: &str = "token";

/// Persisted storage key holding the JSON-serialized user record
pub const USER_KEY: &str = "user";

/// In-memory view of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_user: Option<UserRecord>,
    pub is_authenticated: bool,
    /// True only until the first reconciliation pass completes
    pub is_initializing: bool,
}

impl SessionState {
    fn initial() -> Self {
        SessionState {
            current_user: None,
            is_authenticated: false,
            is_initializing: true,
        }
    }
}

/// Reconciles in-memory session state with persisted storage
///
/// Each synchronizer owns its own state channel, so independent
/// instances (one per context) can coexist without global leakage.
/// Clones share the same state and context, acting as extra handles
/// within the same instance.
#[derive(Clone)]
pub struct SessionSynchronizer {
    context: StorageContext,
    state: watch::Sender<SessionState>,
}

impl SessionSynchronizer {
    /// Create a new synchronizer over the given storage context
    ///
    /// The state starts as initializing/unauthenticated; callers run the
    /// first reconciliation themselves or through the signal driver.
    pub fn new(context: StorageContext) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        SessionSynchronizer { context, state }
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether the in-memory view currently reports an active session
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// The in-memory user record, if any
    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.borrow().current_user.clone()
    }

    /// The storage context this synchronizer reconciles against
    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    /// Recompute in-memory state from persisted storage
    ///
    /// A session is valid only when a non-empty token and a parseable
    /// user record with a non-empty id are both present; anything else
    /// reconciles to signed-out. Idempotent and infallible.
    pub fn reconcile(&self) {
        let token = self.context.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let user = self
            .context
            .get(USER_KEY)
            .and_then(|raw| UserRecord::from_persisted(&raw));

        match (token, user) {
            (Some(_), Some(user)) => self.apply(true, Some(user)),
            _ => self.apply(false, None),
        }
    }

    /// Alias for [`reconcile`](Self::reconcile), for callers that just
    /// mutated storage elsewhere and need the cache updated immediately
    pub fn force_refresh(&self) {
        self.reconcile();
    }

    /// Persist a user record and mark the session authenticated
    ///
    /// Requires a token to already be present in storage; this never
    /// creates a session from nothing. Without a token the in-memory
    /// state is forced to signed-out instead.
    pub fn commit_user(&self, user: UserRecord) {
        let has_token = self
            .context
            .get(TOKEN_KEY)
            .map_or(false, |t| !t.is_empty());

        if !has_token {
            warn!("commit_user without a stored token, forcing signed-out state");
            self.apply(false, None);
            return;
        }

        self.context.set(USER_KEY, &user.to_persisted());
        self.apply(true, Some(user));
    }

    /// Store a fresh token and user record, then confirm from storage
    ///
    /// Used after login/registration: both keys are written, then the
    /// state is reconciled from what storage actually holds, so callers
    /// can navigate right away without waiting out a settle delay.
    pub fn begin_session(&self, token: &str, user: UserRecord) {
        info!("Beginning session for user: {}", user.id);
        self.context.set(TOKEN_KEY, token);
        self.context.set(USER_KEY, &user.to_persisted());
        self.reconcile();
    }

    /// Remove both session keys and mark the session signed-out
    ///
    /// Idempotent; ending an absent session is a no-op.
    pub fn end_session(&self) {
        info!("Ending session");
        self.context.remove(TOKEN_KEY);
        self.context.remove(USER_KEY);
        self.apply(false, None);
    }

    fn apply(&self, is_authenticated: bool, current_user: Option<UserRecord>) {
        let changed = self.state.send_if_modified(|state| {
            let changed = state.is_authenticated != is_authenticated
                || state.current_user != current_user
                || state.is_initializing;

            state.is_authenticated = is_authenticated;
            state.current_user = current_user;
            state.is_initializing = false;
            changed
        });

        if changed {
            info!("Session state changed: authenticated={}", is_authenticated);
        } else {
            debug!("Session state unchanged: authenticated={}", is_authenticated);
        }
    }
}
