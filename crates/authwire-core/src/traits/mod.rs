//! Core traits implemented by the storage and HTTP crates.

mod persistence;
mod transport;

pub use persistence::{MemoryPersistence, TokenPersistence};
pub use transport::Transport;
