//! Authenticated request pipeline.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use authwire_core::error::ProtocolError;
use authwire_core::{AccessToken, ApiResponse, Error, RequestSpec, Result, Transport};

use crate::refresh::RefreshCoordinator;
use crate::session::SessionStatus;
use crate::store::TokenStore;

/// How a response is treated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// 2xx.
    Success,
    /// The access token was rejected; eligible for one renewal and retry.
    AuthExpired(ProtocolError),
    /// Any other non-success response; returned to the caller untouched.
    Rejected(ProtocolError),
}

/// Classify a raw response.
pub fn classify(response: &ApiResponse) -> Classification {
    if response.is_success() {
        return Classification::Success;
    }

    let error = response.to_protocol_error();
    if error.is_auth_error() {
        Classification::AuthExpired(error)
    } else {
        Classification::Rejected(error)
    }
}

/// The transport every API caller goes through.
///
/// Attaches the current access token, and on an authentication rejection
/// renews the pair through the [`RefreshCoordinator`] and replays the
/// request exactly once. The pipeline only reads the [`TokenStore`].
#[derive(Clone)]
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    coordinator: RefreshCoordinator,
    status: SessionStatus,
}

impl RequestPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: TokenStore,
        coordinator: RefreshCoordinator,
        status: SessionStatus,
    ) -> Self {
        Self {
            transport,
            store,
            coordinator,
            status,
        }
    }

    /// Execute a request, renewing the credential and retrying once if the
    /// server rejects it as expired.
    ///
    /// # Errors
    ///
    /// - transport failures are returned as-is and never retried
    /// - non-auth error responses are returned as [`Error::Protocol`]
    /// - a failed renewal is returned as `RefreshFailed`
    /// - a replayed request that fails again is returned as-is
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), path = request.path())
    )]
    pub async fn execute(&self, request: RequestSpec) -> Result<ApiResponse> {
        let bearer = self.store.get().map(|pair| pair.access_token);
        let response = self.transport.send(&request, bearer.as_ref()).await?;

        match classify(&response) {
            Classification::Success => Ok(response),
            Classification::Rejected(error) => Err(error.into()),
            Classification::AuthExpired(error) => self.recover(request, bearer, error).await,
        }
    }

    /// Execute a request and decode a JSON success body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: RequestSpec) -> Result<T> {
        self.execute(request).await?.json()
    }

    /// Execute a request that can be abandoned through `cancel`.
    ///
    /// Cancellation is observed at every suspension point, including while
    /// waiting on a renewal; a cancelled request is never replayed.
    pub async fn execute_cancellable(
        &self,
        request: RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request cancelled");
                Err(Error::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }

    async fn recover(
        &self,
        request: RequestSpec,
        stale: Option<AccessToken>,
        error: ProtocolError,
    ) -> Result<ApiResponse> {
        if !self.store.is_present() {
            warn!(%error, "Rejected without a refresh token, signing out");
            self.status.force_sign_out();
            return Err(error.into());
        }

        debug!(%error, "Access token rejected, renewing");
        let pair = self.coordinator.refresh(stale.as_ref()).await?;

        debug!("Replaying request with renewed token");
        let response = self
            .transport
            .send(&request, Some(&pair.access_token))
            .await?;

        match classify(&response) {
            Classification::Success => Ok(response),
            Classification::AuthExpired(error) | Classification::Rejected(error) => {
                Err(error.into())
            }
        }
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
