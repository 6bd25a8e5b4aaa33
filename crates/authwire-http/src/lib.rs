//! authwire-http - Authenticated HTTP transport with single-flight token refresh.
//!
//! All API calls flow through a [`RequestPipeline`], which attaches the
//! current access token from the [`TokenStore`]. When the server rejects a
//! token as expired, the pipeline asks the [`RefreshCoordinator`] for a new
//! pair and replays the request once. Concurrent rejections share one
//! renewal exchange. A failed renewal clears the store and forces the
//! [`SessionController`] to sign out.
//!
//! [`Client`] wires these together.

mod client;
mod config;
mod http;
mod pipeline;
mod refresh;
mod session;
mod store;
#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_SIGN_OUT_TIMEOUT, DEFAULT_TIMEOUT, Endpoints};
pub use http::HttpTransport;
pub use pipeline::{Classification, RequestPipeline, classify};
pub use refresh::{RefreshCoordinator, RefreshMode};
pub use session::{SessionController, SessionState, SessionStatus};
pub use store::{ClearReason, Generation, SubscriptionId, TokenEvent, TokenStore};
