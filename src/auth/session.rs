//! Session lifecycle: startup validation, background revalidation, logout.
//!
//! The controller owns the session state machine
//! `Uninitialized -> Initializing -> {Authenticated, Unauthenticated}` and
//! the recurring background task that keeps the credential fresh. Every
//! failure path - undecodable token, rejected refresh, network error inside
//! the refresh - resolves to `Unauthenticated` with the stored credential
//! cleared. The session is never left in a partial state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::auth::{claims, RefreshCoordinator, TokenStore};
use crate::models::Identity;

/// Background revalidation cadence (seconds).
/// Tight enough that a 5-minute lookahead window is never missed.
pub const REVALIDATE_INTERVAL_SECS: u64 = 60;

/// Current phase of the session lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

pub struct SessionController {
    store: TokenStore,
    refresher: RefreshCoordinator,
    lookahead: ChronoDuration,
    state: RwLock<SessionState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(store: TokenStore, refresher: RefreshCoordinator) -> Self {
        Self {
            store,
            refresher,
            lookahead: claims::default_lookahead(),
            state: RwLock::new(SessionState::Uninitialized),
            ticker: Mutex::new(None),
        }
    }

    /// Override the near-expiry lookahead window.
    pub fn with_lookahead(mut self, lookahead: ChronoDuration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn identity(&self) -> Option<Identity> {
        match &*self.state.read().await {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    /// Validate the stored credential and establish the current identity.
    ///
    /// A near-expiry (or expired) credential is refreshed first; a missing
    /// or irrecoverable one moves the session to `Unauthenticated`.
    pub async fn initialize(&self) -> SessionState {
        self.set_state(SessionState::Initializing).await;

        let Some(token) = self.store.get() else {
            return self.set_state(SessionState::Unauthenticated).await;
        };

        if claims::is_near_expiry(&token, self.lookahead) {
            debug!("stored credential near expiry at startup, refreshing");
            if !self.refresher.refresh().await {
                // Coordinator has cleared the credential already.
                return self.set_state(SessionState::Unauthenticated).await;
            }
        }

        self.establish().await
    }

    /// Derive the session identity from the currently stored credential.
    /// Used after `initialize` and after a successful login.
    pub async fn establish(&self) -> SessionState {
        match self.store.get().as_deref().and_then(claims::decode) {
            Some(claims) => {
                info!(email = %claims.email, "session established");
                self.set_state(SessionState::Authenticated(claims.identity()))
                    .await
            }
            None => {
                warn!("stored credential undecodable, failing closed");
                self.store.clear();
                self.set_state(SessionState::Unauthenticated).await
            }
        }
    }

    /// Start the recurring background revalidation task.
    ///
    /// The task holds only a weak reference, so dropping the controller
    /// (or calling `stop_revalidation`/`logout`) ends it.
    pub fn start_revalidation(self: &Arc<Self>, every: Duration) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; skip the zeroth tick.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.revalidate().await;
            }
        });
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    async fn revalidate(&self) {
        let Some(token) = self.store.get() else {
            return;
        };
        if claims::is_near_expiry(&token, self.lookahead) {
            debug!("background revalidation: credential near expiry, refreshing");
            if !self.refresher.refresh().await {
                warn!("background refresh failed, logging out");
                self.logout().await;
            }
        }
    }

    /// Clear all credential state and move to `Unauthenticated`.
    /// Idempotent and callable at any time; the UI reacts to the state
    /// change by returning to the login prompt.
    pub async fn logout(&self) {
        debug!("logging out");
        self.store.clear();
        self.set_state(SessionState::Unauthenticated).await;
        self.stop_revalidation();
    }

    /// Stop the background revalidation task, if running.
    pub fn stop_revalidation(&self) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    async fn set_state(&self, next: SessionState) -> SessionState {
        *self.state.write().await = next.clone();
        next
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_revalidation();
    }
}
