//! Single-flight token renewal.
//!
//! Refresh tokens rotate: the server accepts each one once. If two requests
//! that both saw an expired access token each exchanged the same refresh
//! token, the second exchange would be rejected and the user signed out of
//! a perfectly valid session. [`RefreshCoordinator`] makes every concurrent
//! caller share one exchange.
//!
//! The coordinator is `Idle` or `Refreshing`. The first caller to arrive
//! while `Idle` flips it to `Refreshing` and spawns the exchange; everyone
//! who arrives before it resolves joins the waiter queue. When the exchange
//! finishes the store is updated (or cleared), the mode returns to `Idle`
//! and every waiter receives the same outcome.
//!
//! The exchange runs on its own task, so cancelling the caller that started
//! it does not strand the others. A waiter whose future is dropped removes
//! itself from the queue.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use authwire_core::error::AuthError;
use authwire_core::{AccessToken, RefreshToken, RequestSpec, Result, TokenPair, Transport};

use crate::http::endpoints::{RefreshRequest, RefreshResponse};
use crate::session::SessionStatus;
use crate::store::{ClearReason, Generation, TokenStore};

/// Coordinator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Idle,
    Refreshing,
}

type Outcome = std::result::Result<TokenPair, AuthError>;

/// Shares one renewal exchange between all concurrent callers.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    store: TokenStore,
    transport: Arc<dyn Transport>,
    endpoint: String,
    status: SessionStatus,
    state: Mutex<CoordinatorState>,
}

struct CoordinatorState {
    mode: RefreshMode,
    waiters: Vec<Waiter>,
    next_waiter: u64,
    exchanges: u64,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Outcome>,
}

impl RefreshCoordinator {
    pub fn new(
        store: TokenStore,
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        status: SessionStatus,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                transport,
                endpoint: endpoint.into(),
                status,
                state: Mutex::new(CoordinatorState {
                    mode: RefreshMode::Idle,
                    waiters: Vec::new(),
                    next_waiter: 0,
                    exchanges: 0,
                }),
            }),
        }
    }

    /// Obtain a fresh pair, joining an in-flight renewal if there is one.
    ///
    /// `stale` is the access token the caller's rejected request carried.
    /// When the coordinator is idle and the store already holds a different
    /// access token, a renewal finished after that request was sent; the
    /// current pair is returned without another exchange.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshFailed`] if the exchange fails. The store
    /// has been cleared and a forced sign-out signalled by then.
    #[instrument(skip(self, stale))]
    pub async fn refresh(&self, stale: Option<&AccessToken>) -> Result<TokenPair> {
        let (id, rx) = {
            let mut state = self.inner.lock();

            if state.mode == RefreshMode::Idle
                && let Some(current) = self.inner.store.get()
                && Some(&current.access_token) != stale
            {
                debug!("Store already holds a newer token, skipping renewal");
                return Ok(current);
            }

            let (tx, rx) = oneshot::channel();
            let id = state.next_waiter;
            state.next_waiter += 1;
            state.waiters.push(Waiter { id, tx });

            if state.mode == RefreshMode::Idle {
                state.mode = RefreshMode::Refreshing;
                state.exchanges += 1;
                info!("Starting token renewal");
                // Pin the pair now: a sign-in landing before the task runs
                // must not have its fresh refresh token spent.
                let (pair, generation) = self.inner.store.snapshot();
                tokio::spawn(Arc::clone(&self.inner).run(pair, generation));
            } else {
                debug!(waiters = state.waiters.len(), "Joining in-flight renewal");
            }

            (id, rx)
        };

        let mut guard = WaiterGuard {
            inner: &self.inner,
            id,
            armed: true,
        };
        let outcome = rx.await;
        guard.armed = false;

        match outcome {
            Ok(Ok(pair)) => Ok(pair),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(AuthError::refresh_failed("renewal ended without a result").into()),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> RefreshMode {
        self.inner.lock().mode
    }

    /// Returns true while an exchange is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.mode() == RefreshMode::Refreshing
    }

    /// Number of callers waiting on the in-flight exchange.
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Number of exchanges started since construction.
    pub fn exchange_count(&self) -> u64 {
        self.inner.lock().exchanges
    }
}

impl CoordinatorInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run(self: Arc<Self>, pair: Option<TokenPair>, generation: Generation) {
        let mut guard = FinishGuard {
            inner: Arc::clone(&self),
            done: false,
        };

        let outcome = self.renew(pair, generation).await;
        guard.done = true;
        self.finish(outcome);
    }

    async fn renew(&self, pair: Option<TokenPair>, generation: Generation) -> Outcome {
        let result = match pair {
            Some(pair) => self.exchange(&pair.refresh_token).await,
            None => Err(AuthError::refresh_failed("no refresh token available")),
        };

        match result {
            Ok(pair) => {
                if self.store.set_if_current(pair.clone(), generation) {
                    info!("Token renewal succeeded");
                    Ok(pair)
                } else {
                    warn!("Session changed during renewal, discarding renewed tokens");
                    Err(AuthError::refresh_failed("session ended during renewal"))
                }
            }
            Err(e) => {
                warn!(error = %e, "Token renewal failed");
                if self
                    .store
                    .clear_if_current(generation, ClearReason::RefreshFailed)
                {
                    self.status.force_sign_out();
                }
                Err(e)
            }
        }
    }

    async fn exchange(&self, refresh_token: &RefreshToken) -> Outcome {
        let request = RequestSpec::post(self.endpoint.as_str())
            .and_then(|r| {
                r.with_body(&RefreshRequest {
                    refresh_token: refresh_token.as_str(),
                })
            })
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?;

        let response = self
            .transport
            .send(&request, None)
            .await
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::refresh_failed(
                response.to_protocol_error().reason(),
            ));
        }

        response
            .json::<RefreshResponse>()
            .map(TokenPair::from)
            .map_err(|e| AuthError::refresh_failed(e.to_string()))
    }

    fn finish(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.mode = RefreshMode::Idle;
            std::mem::take(&mut state.waiters)
        };

        debug!(
            waiters = waiters.len(),
            ok = outcome.is_ok(),
            "Resolving renewal waiters"
        );
        for waiter in waiters {
            // A receiver that was dropped after the queue was drained is fine to skip.
            let _ = waiter.tx.send(outcome.clone());
        }
    }
}

/// Removes a waiter from the queue if its future is dropped before resolving.
struct WaiterGuard<'a> {
    inner: &'a Arc<CoordinatorInner>,
    id: u64,
    armed: bool,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.inner.lock();
            state.waiters.retain(|w| w.id != self.id);
            debug!(id = self.id, "Renewal waiter cancelled");
        }
    }
}

/// Resolves every waiter with a failure if the exchange task dies early.
struct FinishGuard {
    inner: Arc<CoordinatorInner>,
    done: bool,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if !self.done {
            self.inner
                .finish(Err(AuthError::refresh_failed("renewal aborted")));
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RefreshCoordinator")
            .field("mode", &state.mode)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}
