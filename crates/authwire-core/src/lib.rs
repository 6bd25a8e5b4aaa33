//! authwire-core - Core types and traits for the authwire session client.
//!
//! This crate holds everything the transport layer needs that does not
//! touch the network: token types, the outbound request descriptor, the
//! error taxonomy, and the seams ([`Transport`], [`TokenPersistence`]) that
//! the storage and HTTP crates implement.

pub mod credentials;
pub mod error;
pub mod request;
pub mod tokens;
pub mod traits;
pub mod types;
pub mod user;

pub use credentials::{Credentials, Registration};
pub use error::{Error, ErrorKind};
pub use request::{ApiResponse, Method, RequestSpec};
pub use tokens::{AccessToken, RefreshToken, TokenPair};
pub use traits::{MemoryPersistence, TokenPersistence, Transport};
pub use types::ApiUrl;
pub use user::{UserProfile, UserSummary};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
