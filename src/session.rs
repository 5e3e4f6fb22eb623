//! Authentication state and the session gate.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ServiceError};

/// The signed-in identity, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user id.
    pub id: String,
    /// Email address, when the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Snapshot of the auth provider's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// The signed-in user, if any.
    pub user: Option<User>,
    /// Whether the provider is still resolving the session.
    pub is_loading: bool,
}

/// Handle returned by [`AuthProvider::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked on every auth state change.
pub type AuthCallback = Box<dyn Fn(&AuthState) + Send + Sync>;

/// The authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current state.
    fn current(&self) -> AuthState;

    /// Register a callback, called immediately with the current state and on every change.
    fn subscribe(&self, callback: AuthCallback) -> SubscriptionId;

    /// Remove a previously registered callback.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Establish a session.
    async fn login(&self) -> Result<AuthState, ServiceError>;

    /// End the session.
    async fn logout(&self) -> Result<(), ServiceError>;
}

#[derive(Default)]
struct CellInner {
    state: AuthState,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Arc<dyn Fn(&AuthState) + Send + Sync>)>,
}

/// Shared auth state with change subscribers.
///
/// Building block for [`AuthProvider`] implementations.
#[derive(Clone, Default)]
pub struct AuthStateCell {
    inner: Arc<Mutex<CellInner>>,
}

impl std::fmt::Debug for AuthStateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStateCell")
            .field("state", &self.lock().state)
            .finish_non_exhaustive()
    }
}

impl AuthStateCell {
    /// Create a cell holding `state`.
    #[must_use]
    pub fn new(state: AuthState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                state,
                ..CellInner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CellInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> AuthState {
        self.lock().state.clone()
    }

    /// Replace the state and notify subscribers.
    pub fn set(&self, state: AuthState) {
        // Callbacks run outside the lock so they may read the cell.
        let subscribers: Vec<_> = {
            let mut inner = self.lock();
            inner.state = state.clone();
            inner.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in subscribers {
            callback(&state);
        }
    }

    /// Register a callback and call it once with the current state.
    pub fn subscribe(&self, callback: AuthCallback) -> SubscriptionId {
        let callback: Arc<dyn Fn(&AuthState) + Send + Sync> = Arc::from(callback);
        let (id, state) = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::clone(&callback)));
            (id, inner.state.clone())
        };
        callback(&state);
        id
    }

    /// Remove a callback.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.retain(|(sid, _)| *sid != id);
    }
}

/// Whether the gate blocks unauthenticated processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateMode {
    /// Require a signed-in user before processing.
    #[default]
    Enforce,
    /// Assume authentication was established elsewhere; never block.
    Assume,
}

impl std::str::FromStr for GateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "assume" => Ok(Self::Assume),
            other => Err(Error::Config(format!(
                "unknown auth gate mode '{other}' (expected 'enforce' or 'assume')"
            ))),
        }
    }
}

/// What the front end should render for a given auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    /// The provider is still resolving the session.
    Loading,
    /// Show the sign-in call to action instead of the workflow.
    SignIn,
    /// Show the upload workflow.
    Workflow,
}

/// Checks for a session before any processing action.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionGate {
    mode: GateMode,
}

impl SessionGate {
    /// Create a gate in the given mode.
    #[must_use]
    pub fn new(mode: GateMode) -> Self {
        Self { mode }
    }

    /// The configured mode.
    #[must_use]
    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Screen to render for `state`.
    #[must_use]
    pub fn view(&self, state: &AuthState) -> GateView {
        match self.mode {
            GateMode::Assume => GateView::Workflow,
            GateMode::Enforce if state.is_loading => GateView::Loading,
            GateMode::Enforce if state.user.is_none() => GateView::SignIn,
            GateMode::Enforce => GateView::Workflow,
        }
    }

    /// Allow or block a processing action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthRequired`] in enforce mode when no user is signed in.
    pub fn check(&self, state: &AuthState) -> Result<(), Error> {
        match self.mode {
            GateMode::Assume => Ok(()),
            GateMode::Enforce if state.user.is_some() && !state.is_loading => Ok(()),
            GateMode::Enforce => Err(Error::AuthRequired),
        }
    }
}
