//! Single-flight coordination of credential refresh.
//!
//! Any number of callers may ask for a refresh at the same moment - the
//! request wrapper on a near-expiry token, the same wrapper reacting to a
//! 401, and the background revalidation tick can all race. The coordinator
//! guarantees that at most one refresh exchange is in flight: late callers
//! join the pending operation and observe its result instead of issuing a
//! second network call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::auth::TokenStore;
use crate::models::{ApiEnvelope, TokenResponse};

/// Bound on the refresh exchange so a wedged backend cannot leave the
/// session stuck in a pending refresh indefinitely.
pub const REFRESH_TIMEOUT_SECS: u64 = 10;

/// The remote refresh exchange: trade the current credential for a new one.
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    async fn exchange(&self, current: Option<&str>) -> Result<TokenResponse, ApiError>;
}

/// Production exchange against `POST {base}/api/auth/refresh`.
pub struct HttpRefreshExchange {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRefreshExchange {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RefreshExchange for HttpRefreshExchange {
    async fn exchange(&self, current: Option<&str>) -> Result<TokenResponse, ApiError> {
        let mut req = self
            .http
            .post(format!("{}/api/auth/refresh", self.base_url))
            .timeout(Duration::from_secs(REFRESH_TIMEOUT_SECS));
        if let Some(token) = current {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        let envelope: ApiEnvelope<TokenResponse> = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("refresh envelope: {e}")))?;
        match envelope.data {
            Some(token) if envelope.is_success() && !token.access_token.is_empty() => Ok(token),
            _ => Err(ApiError::InvalidResponse(format!(
                "refresh rejected: {}",
                envelope.message
            ))),
        }
    }
}

/// Coalesces concurrent refresh attempts into one in-flight operation.
///
/// `refresh()` resolves `true` when a new credential was obtained and
/// stored, `false` when the attempt completed without yielding one (in
/// which case the stored credential has been cleared).
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    exchange: Arc<dyn RefreshExchange>,
    store: TokenStore,
    /// The single-flight slot. Assigned while the lock is held, before the
    /// exchange future is first polled, so a caller arriving mid-flight
    /// always observes the pending operation.
    pending: Mutex<Option<Shared<BoxFuture<'static, bool>>>>,
}

impl RefreshCoordinator {
    pub fn new(exchange: Arc<dyn RefreshExchange>, store: TokenStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchange,
                store,
                pending: Mutex::new(None),
            }),
        }
    }

    /// Refresh the stored credential, joining any refresh already in flight.
    pub async fn refresh(&self) -> bool {
        let operation = {
            let mut pending = self.inner.pending.lock().await;
            if let Some(in_flight) = pending.as_ref() {
                debug!("refresh already in flight, joining");
                in_flight.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let operation = async move {
                    let outcome = perform(&inner).await;
                    // Free the slot before the result is delivered so the
                    // next caller starts a fresh operation.
                    inner.pending.lock().await.take();
                    outcome
                }
                .boxed()
                .shared();
                *pending = Some(operation.clone());
                operation
            }
        };
        operation.await
    }
}

async fn perform(inner: &Inner) -> bool {
    let current = inner.store.get();
    match inner.exchange.exchange(current.as_deref()).await {
        Ok(token) => {
            debug!("credential refresh succeeded");
            inner.store.set(&token.access_token);
            true
        }
        Err(e) => {
            warn!(error = %e, "credential refresh failed, clearing stored credential");
            inner.store.clear();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::UserSummary;

    struct FakeExchange {
        calls: AtomicUsize,
        succeed: bool,
        delay: Duration,
    }

    impl FakeExchange {
        fn new(succeed: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                succeed,
                delay,
            })
        }
    }

    #[async_trait]
    impl RefreshExchange for FakeExchange {
        async fn exchange(&self, _current: Option<&str>) -> Result<TokenResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.succeed {
                Ok(TokenResponse {
                    access_token: "fresh.token.sig".to_string(),
                    token_type: "bearer".to_string(),
                    expires_in: 3600,
                    user: UserSummary {
                        id: "u-1".to_string(),
                        email: "a@example.com".to_string(),
                    },
                })
            } else {
                Err(ApiError::InvalidResponse("refresh rejected".to_string()))
            }
        }
    }

    fn temp_store() -> (tempfile::TempDir, TokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let (_dir, store) = temp_store();
        store.set("stale.token.sig");

        let exchange = FakeExchange::new(true, Duration::from_millis(50));
        let coordinator = RefreshCoordinator::new(exchange.clone(), store.clone());

        let (a, b, c) = tokio::join!(
            coordinator.refresh(),
            coordinator.refresh(),
            coordinator.refresh()
        );

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
        assert!(a && b && c);
        assert_eq!(store.get().as_deref(), Some("fresh.token.sig"));
    }

    #[tokio::test]
    async fn slot_is_freed_for_subsequent_refreshes() {
        let (_dir, store) = temp_store();
        let exchange = FakeExchange::new(true, Duration::ZERO);
        let coordinator = RefreshCoordinator::new(exchange.clone(), store);

        assert!(coordinator.refresh().await);
        assert!(coordinator.refresh().await);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_clears_credential_and_resolves_false() {
        let (_dir, store) = temp_store();
        store.set("stale.token.sig");

        let exchange = FakeExchange::new(false, Duration::from_millis(20));
        let coordinator = RefreshCoordinator::new(exchange.clone(), store.clone());

        let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
        assert!(!a && !b);
        assert_eq!(store.get(), None);
    }
}
