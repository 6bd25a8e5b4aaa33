//! Session lifecycle: sign-in, sign-up, sign-out and bootstrap.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use authwire_core::error::{AuthError, ProtocolError};
use authwire_core::{
    Credentials, Registration, RequestSpec, Result, Transport, UserProfile, UserSummary,
};

use crate::config::Endpoints;
use crate::http::endpoints::{AuthResponse, SignInRequest, SignOutRequest, SignUpRequest};
use crate::pipeline::RequestPipeline;
use crate::store::{ClearReason, TokenEvent, TokenStore};

/// Whether a session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credential. `expired` is set when the session ended because the
    /// credential could not be renewed, so the UI can say so.
    Unauthenticated { expired: bool },
    /// A sign-in or sign-up exchange is in flight.
    Authenticating,
    /// A credential is held.
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

/// Shared, observable session state.
///
/// Owned by the [`SessionController`]; the refresh coordinator and the
/// pipeline hold clones so they can force a sign-out.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStatus {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> SessionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = ?*current, to = ?state, "Session state changed");
                *current = state;
                true
            }
        });
    }

    /// A pair was stored. Sign-in and sign-up move to `Authenticated`
    /// themselves once they are done.
    fn follow_set(&self) {
        self.tx.send_if_modified(|current| {
            if matches!(current, SessionState::Unauthenticated { .. }) {
                debug!(from = ?*current, "Token pair stored, session active");
                *current = SessionState::Authenticated;
                true
            } else {
                false
            }
        });
    }

    /// The pair was removed. A failed sign-in settles its own state.
    fn follow_clear(&self, reason: ClearReason) {
        let expired = reason == ClearReason::RefreshFailed;
        self.tx.send_if_modified(|current| {
            if *current == SessionState::Authenticating {
                return false;
            }
            let next = SessionState::Unauthenticated { expired };
            if *current == next {
                return false;
            }
            debug!(from = ?*current, to = ?next, "Token pair cleared");
            *current = next;
            true
        });
    }

    /// End an authenticated session because its credential is unusable.
    ///
    /// No-op unless the state is `Authenticated`. Returns true if the state
    /// changed.
    pub(crate) fn force_sign_out(&self) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == SessionState::Authenticated {
                info!("Session expired, forcing sign-out");
                *current = SessionState::Unauthenticated { expired: true };
                true
            } else {
                false
            }
        })
    }
}

/// Orchestrates sign-in, sign-up, sign-out and bootstrap, and is the single
/// source of truth for whether a session is active.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    pipeline: RequestPipeline,
    status: SessionStatus,
    endpoints: Endpoints,
    sign_out_timeout: Duration,
    profile: Arc<RwLock<Option<UserProfile>>>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: TokenStore,
        pipeline: RequestPipeline,
        status: SessionStatus,
        endpoints: Endpoints,
        sign_out_timeout: Duration,
    ) -> Self {
        let profile = Arc::new(RwLock::new(None));

        // The session state follows the store, whoever writes to it.
        let cache = Arc::clone(&profile);
        let follower = status.clone();
        store.subscribe(move |event| match event {
            TokenEvent::Set => follower.follow_set(),
            TokenEvent::Cleared { reason } => {
                *cache.write().unwrap_or_else(|e| e.into_inner()) = None;
                follower.follow_clear(*reason);
            }
        });

        Self {
            inner: Arc::new(ControllerInner {
                transport,
                store,
                pipeline,
                status,
                endpoints,
                sign_out_timeout,
                profile,
            }),
        }
    }

    /// Restore the session state from the store at process start.
    ///
    /// A stored credential is trusted optimistically; the first request
    /// validates it through the normal renewal path.
    #[instrument(skip(self))]
    pub fn bootstrap(&self) -> SessionState {
        let state = self.derived_state();
        info!(?state, "Session bootstrapped");
        self.inner.status.set(state);
        state
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] with the server's reason if rejected
    /// - a network error if the server could not be reached
    /// - a server error for 5xx responses
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserSummary> {
        info!("Signing in");
        let request = RequestSpec::post(self.inner.endpoints.sign_in.as_str())?.with_body(
            &SignInRequest {
                email: credentials.email(),
                password: credentials.password(),
            },
        )?;
        self.authenticate(request).await
    }

    /// Register a new account and sign in to it.
    ///
    /// Fails the same way as [`SessionController::sign_in`].
    #[instrument(skip(self, registration), fields(email = %registration.email()))]
    pub async fn sign_up(&self, registration: &Registration) -> Result<UserSummary> {
        info!("Signing up");
        let request = RequestSpec::post(self.inner.endpoints.sign_up.as_str())?.with_body(
            &SignUpRequest {
                email: registration.email(),
                password: registration.password(),
                name: registration.name(),
            },
        )?;
        self.authenticate(request).await
    }

    /// Sign out.
    ///
    /// The local credential is cleared first and unconditionally; the
    /// server is then told on a best-effort basis. Never fails, and calling
    /// it again is harmless. A renewal in flight is left to finish and its
    /// result is discarded.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let pair = self.inner.store.get();
        self.inner.store.clear();
        self.inner
            .status
            .set(SessionState::Unauthenticated { expired: false });
        info!("Signed out locally");

        let Some(pair) = pair else {
            return;
        };

        let request = match RequestSpec::post(self.inner.endpoints.sign_out.as_str())
            .and_then(|r| {
                r.with_body(&SignOutRequest {
                    refresh_token: pair.refresh_token.as_str(),
                })
            }) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Could not build sign-out request");
                return;
            }
        };

        let call = self.inner.transport.send(&request, Some(&pair.access_token));
        match tokio::time::timeout(self.inner.sign_out_timeout, call).await {
            Ok(Ok(response)) if response.is_success() => debug!("Server session invalidated"),
            Ok(Ok(response)) => {
                warn!(error = %response.to_protocol_error(), "Server rejected sign-out")
            }
            Ok(Err(e)) => warn!(error = %e, "Sign-out request failed"),
            Err(_) => warn!("Sign-out request timed out"),
        }
    }

    /// Fetch the signed-in user's profile and cache it.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        let request = RequestSpec::get(self.inner.endpoints.profile.as_str())?;
        let profile: UserProfile = self.inner.pipeline.execute_json(request).await?;

        // A sign-out may have landed while the request was in flight.
        if self.inner.store.is_present() {
            *self
                .inner
                .profile
                .write()
                .unwrap_or_else(|e| e.into_inner()) = Some(profile.clone());
        }
        Ok(profile)
    }

    /// The cached profile, if one has been fetched for the current session.
    pub fn profile(&self) -> Option<UserProfile> {
        self.inner
            .profile
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.inner.status.get()
    }

    /// Returns true if a session is active.
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Watch session state changes, including forced sign-outs.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.status.subscribe()
    }

    /// The request pipeline bound to this session.
    pub fn pipeline(&self) -> &RequestPipeline {
        &self.inner.pipeline
    }

    fn derived_state(&self) -> SessionState {
        if self.inner.store.is_present() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated { expired: false }
        }
    }

    async fn authenticate(&self, request: RequestSpec) -> Result<UserSummary> {
        self.inner.status.set(SessionState::Authenticating);

        let auth = match self.exchange(&request).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                self.inner.status.set(self.derived_state());
                return Err(e);
            }
        };

        let (user, pair) = auth.into_parts();
        // The cached profile may belong to the previous account.
        *self
            .inner
            .profile
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
        self.inner.store.set(pair);
        self.inner.status.set(SessionState::Authenticated);
        info!(user = %user.id, "Authenticated");

        if let Err(e) = self.fetch_profile().await {
            warn!(error = %e, "Signed in but could not fetch profile");
        }

        Ok(user)
    }

    async fn exchange(&self, request: &RequestSpec) -> Result<AuthResponse> {
        let response = self.inner.transport.send(request, None).await?;
        if response.is_success() {
            return response.json();
        }

        let error = response.to_protocol_error();
        if error.is_server_error() {
            Err(error.into())
        } else {
            Err(AuthError::InvalidCredentials(rejection_reason(&error)).into())
        }
    }
}

/// Human-readable reason for a rejected sign-in or sign-up.
fn rejection_reason(error: &ProtocolError) -> String {
    if let Some(message) = &error.message {
        return message.clone();
    }
    match error.status {
        401 | 403 => "invalid email or password".to_string(),
        409 => "an account with this email already exists".to_string(),
        429 => "too many attempts, try again later".to_string(),
        _ => error.reason(),
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("store", &self.inner.store)
            .finish()
    }
}
