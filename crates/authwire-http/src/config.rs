//! Client configuration.

use std::time::Duration;

use authwire_core::ApiUrl;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on the best-effort sign-out call.
pub const DEFAULT_SIGN_OUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Paths of the authentication endpoints, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub sign_in: String,
    pub sign_up: String,
    pub refresh: String,
    pub sign_out: String,
    pub profile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sign_in: "/auth/login".to_string(),
            sign_up: "/auth/register".to_string(),
            refresh: "/auth/refresh".to_string(),
            sign_out: "/auth/logout".to_string(),
            profile: "/users/me".to_string(),
        }
    }
}

/// Configuration for a [`Client`](crate::Client).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use authwire_core::ApiUrl;
/// use authwire_http::ClientConfig;
///
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap())
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.endpoints().refresh, "/auth/refresh");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api: ApiUrl,
    endpoints: Endpoints,
    timeout: Duration,
    sign_out_timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    pub fn new(api: ApiUrl) -> Self {
        Self {
            api,
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            sign_out_timeout: DEFAULT_SIGN_OUT_TIMEOUT,
            user_agent: concat!("authwire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sign_out_timeout(mut self, timeout: Duration) -> Self {
        self.sign_out_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn api(&self) -> &ApiUrl {
        &self.api
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sign_out_timeout(&self) -> Duration {
        self.sign_out_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
