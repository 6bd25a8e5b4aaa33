//! Transport trait.

use async_trait::async_trait;

use crate::request::{ApiResponse, RequestSpec};
use crate::tokens::AccessToken;
use crate::Result;

/// Sends a single request to the API.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; classification is the caller's job. `Err` is
/// reserved for transport failures (connection, timeout, unreadable body).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, attaching `bearer` as the `Authorization` header when given.
    async fn send(
        &self,
        request: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse>;
}
