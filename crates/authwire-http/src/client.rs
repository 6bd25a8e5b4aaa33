//! Composition root.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use authwire_core::{
    ApiResponse, Credentials, Registration, RequestSpec, Result, TokenPersistence, Transport,
    UserSummary,
};

use crate::config::ClientConfig;
use crate::http::HttpTransport;
use crate::pipeline::RequestPipeline;
use crate::refresh::RefreshCoordinator;
use crate::session::{SessionController, SessionState, SessionStatus};
use crate::store::TokenStore;

/// An API client with a managed session.
///
/// Builds and wires the token store, refresh coordinator, request pipeline
/// and session controller. Each component is an explicit object shared by
/// cheap clones; nothing is global, so two clients never share a session.
///
/// # Example
///
/// ```no_run
/// use authwire_core::{ApiUrl, Credentials, MemoryPersistence, RequestSpec};
/// use authwire_http::{Client, ClientConfig};
///
/// # async fn example() -> Result<(), authwire_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
/// let client = Client::new(config, MemoryPersistence::new())?;
///
/// client.sign_in(&Credentials::new("alice@example.com", "hunter2")).await?;
/// let files: serde_json::Value = client.execute_json(RequestSpec::get("/files")?).await?;
/// println!("{}", files);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    store: TokenStore,
    coordinator: RefreshCoordinator,
    pipeline: RequestPipeline,
    session: SessionController,
}

impl Client {
    /// Create a client over HTTP, restoring any session held in `persistence`.
    pub fn new(config: ClientConfig, persistence: impl TokenPersistence + 'static) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(
            config,
            transport,
            TokenStore::open(persistence),
        ))
    }

    /// Create a client over an arbitrary transport.
    ///
    /// The session state is bootstrapped from `store`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: TokenStore,
    ) -> Self {
        let status = SessionStatus::new(SessionState::Unauthenticated { expired: false });
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::clone(&transport),
            config.endpoints().refresh.clone(),
            status.clone(),
        );
        let pipeline = RequestPipeline::new(
            Arc::clone(&transport),
            store.clone(),
            coordinator.clone(),
            status.clone(),
        );
        let session = SessionController::new(
            transport,
            store.clone(),
            pipeline.clone(),
            status,
            config.endpoints().clone(),
            config.sign_out_timeout(),
        );
        session.bootstrap();

        Self {
            config,
            store,
            coordinator,
            pipeline,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// See [`SessionController::sign_in`].
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserSummary> {
        self.session.sign_in(credentials).await
    }

    /// See [`SessionController::sign_up`].
    pub async fn sign_up(&self, registration: &Registration) -> Result<UserSummary> {
        self.session.sign_up(registration).await
    }

    /// See [`SessionController::sign_out`].
    pub async fn sign_out(&self) {
        self.session.sign_out().await
    }

    /// See [`RequestPipeline::execute`].
    pub async fn execute(&self, request: RequestSpec) -> Result<ApiResponse> {
        self.pipeline.execute(request).await
    }

    /// See [`RequestPipeline::execute_json`].
    pub async fn execute_json<T: DeserializeOwned>(&self, request: RequestSpec) -> Result<T> {
        self.pipeline.execute_json(request).await
    }
}
