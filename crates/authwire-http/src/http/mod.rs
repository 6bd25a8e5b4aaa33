//! HTTP transport implementation.
//!
//! This module provides the reqwest client and the wire shapes of the
//! authentication endpoints.

mod client;
pub(crate) mod endpoints;

pub use client::HttpTransport;
