//! The credential store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use authwire_core::{MemoryPersistence, TokenPair, TokenPersistence};

/// Counter bumped on every write to a [`TokenStore`].
pub type Generation = u64;

/// Handle returned by [`TokenStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Why the store was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The user signed out.
    SignOut,
    /// The refresh token was rejected; the session is over.
    RefreshFailed,
}

/// Change notification delivered to store listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    Set,
    Cleared { reason: ClearReason },
}

type Listener = Arc<dyn Fn(&TokenEvent) + Send + Sync>;

/// Holder of the current credential pair.
///
/// The pair is replaced as a unit under a lock, so readers see either the
/// whole pair or nothing. Every change is written through to a
/// [`TokenPersistence`] backend and then announced to listeners.
///
/// Persistence failures never surface to callers: they are logged and the
/// in-memory pair stays authoritative for the life of the process.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: RwLock<StoreState>,
    persistence: Box<dyn TokenPersistence>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

struct StoreState {
    pair: Option<TokenPair>,
    generation: Generation,
}

impl TokenStore {
    /// Open a store over `persistence`, loading any pair saved by a previous run.
    pub fn open(persistence: impl TokenPersistence + 'static) -> Self {
        let pair = match persistence.load() {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to load stored tokens, starting signed out");
                None
            }
        };

        debug!(present = pair.is_some(), "Token store opened");

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState {
                    pair,
                    generation: 0,
                }),
                persistence: Box::new(persistence),
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
        }
    }

    /// A store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self::open(MemoryPersistence::new())
    }

    /// Returns the current pair, if any.
    pub fn get(&self) -> Option<TokenPair> {
        self.read().pair.clone()
    }

    /// Returns true if a pair is present.
    pub fn is_present(&self) -> bool {
        self.read().pair.is_some()
    }

    /// Returns the current pair together with the generation it belongs to.
    pub fn snapshot(&self) -> (Option<TokenPair>, Generation) {
        let state = self.read();
        (state.pair.clone(), state.generation)
    }

    /// Replace the stored pair.
    pub fn set(&self, pair: TokenPair) {
        {
            let mut state = self.write();
            self.persist(Some(&pair));
            state.pair = Some(pair);
            state.generation += 1;
        }
        info!("Stored new token pair");
        self.notify(TokenEvent::Set);
    }

    /// Remove the stored pair. Clearing an empty store is a no-op apart from
    /// the notification.
    pub fn clear(&self) {
        self.clear_with(ClearReason::SignOut);
    }

    pub(crate) fn clear_with(&self, reason: ClearReason) {
        {
            let mut state = self.write();
            self.persist(None);
            state.pair = None;
            state.generation += 1;
        }
        info!(?reason, "Cleared token pair");
        self.notify(TokenEvent::Cleared { reason });
    }

    /// Replace the pair only if nothing was written since `generation`.
    ///
    /// Returns false, and leaves the store untouched, if another write won.
    pub fn set_if_current(&self, pair: TokenPair, generation: Generation) -> bool {
        {
            let mut state = self.write();
            if state.generation != generation {
                debug!(
                    expected = generation,
                    actual = state.generation,
                    "Stale token write discarded"
                );
                return false;
            }
            self.persist(Some(&pair));
            state.pair = Some(pair);
            state.generation += 1;
        }
        info!("Stored renewed token pair");
        self.notify(TokenEvent::Set);
        true
    }

    /// Clear the pair only if nothing was written since `generation`.
    pub fn clear_if_current(&self, generation: Generation, reason: ClearReason) -> bool {
        {
            let mut state = self.write();
            if state.generation != generation {
                debug!(
                    expected = generation,
                    actual = state.generation,
                    "Stale token clear discarded"
                );
                return false;
            }
            self.persist(None);
            state.pair = None;
            state.generation += 1;
        }
        info!(?reason, "Cleared token pair");
        self.notify(TokenEvent::Cleared { reason });
        true
    }

    /// Register a listener invoked after every `set` and `clear`.
    ///
    /// Listeners run on the writing thread, after the store lock is
    /// released, so they may read the store.
    pub fn subscribe(
        &self,
        listener: impl Fn(&TokenEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(
            self.inner
                .next_subscription
                .fetch_add(1, Ordering::Relaxed),
        );
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    // Called with the state write lock held so that the persisted order
    // matches the in-memory order.
    fn persist(&self, pair: Option<&TokenPair>) {
        let result = match pair {
            Some(pair) => self.inner.persistence.save(pair),
            None => self.inner.persistence.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist token change");
        }
    }

    fn notify(&self, event: TokenEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TokenStore")
            .field("present", &state.pair.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}
