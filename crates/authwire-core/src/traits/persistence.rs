//! Durable token persistence.

use std::sync::Mutex;

use crate::Result;
use crate::tokens::TokenPair;

/// Durable storage for the credential pair.
///
/// Methods are synchronous: the token store writes through on every change
/// and its writes must not be interleaved with an await point. Implementations
/// must replace both entries together, so a later `load` sees either the
/// whole pair or nothing.
pub trait TokenPersistence: Send + Sync {
    /// Load the stored pair, if one is present and complete.
    fn load(&self) -> Result<Option<TokenPair>>;

    /// Replace the stored pair.
    fn save(&self, pair: &TokenPair) -> Result<()>;

    /// Remove the stored pair. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// In-memory persistence, for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pair already stored, as if written by a previous run.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

impl TokenPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self.pair.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        *self.pair.lock().unwrap_or_else(|e| e.into_inner()) = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.pair.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
