//! Per-session cache of preview media loads
//!
//! Browsing a catalog page triggers many hover previews. Loads of the same
//! URL share one in-flight future, and the outcome is remembered for the
//! rest of the session. The cache is unbounded and never evicts on its
//! own; its key space is the set of media URLs a session has touched.
//! Call [`MediaLoadCache::clear`] to drop everything.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

type LoadFuture = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct CacheState {
    loaded: HashMap<String, bool>,
    in_flight: HashMap<String, LoadFuture>,
}

#[derive(Default)]
pub struct MediaLoadCache {
    state: Mutex<CacheState>,
}

impl MediaLoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Some(true)` once loaded, `Some(false)` after a failed load.
    pub fn status(&self, url: &str) -> Option<bool> {
        self.lock().loaded.get(url).copied()
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        self.status(url) == Some(true)
    }

    pub fn is_loading(&self, url: &str) -> bool {
        self.lock().in_flight.contains_key(url)
    }

    /// Loads `url` at most once at a time.
    ///
    /// Already loaded URLs return `true` without calling `loader`. A call
    /// made while a load is in flight waits for that load. A failed load
    /// is recorded as `false` and the next call tries again.
    pub async fn load<F, Fut, E>(&self, url: &str, loader: F) -> bool
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        let shared = {
            let mut state = self.lock();
            if state.loaded.get(url) == Some(&true) {
                return true;
            }

            match state.in_flight.get(url) {
                Some(existing) => {
                    debug!(url, "Joining in-flight media load");
                    existing.clone()
                }
                None => {
                    let owned = url.to_string();
                    let future = loader(owned.clone())
                        .map(move |result| match result {
                            Ok(()) => true,
                            Err(e) => {
                                warn!(url = %owned, "Error loading media: {}", e);
                                false
                            }
                        })
                        .boxed()
                        .shared();
                    state.in_flight.insert(url.to_string(), future.clone());
                    future
                }
            }
        };

        let loaded = shared.clone().await;

        let mut state = self.lock();
        state.loaded.insert(url.to_string(), loaded);
        let finished = state
            .in_flight
            .get(url)
            .is_some_and(|current| Shared::ptr_eq(current, &shared));
        if finished {
            state.in_flight.remove(url);
        }

        loaded
    }

    pub fn len(&self) -> usize {
        self.lock().loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.loaded.clear();
        state.in_flight.clear();
    }
}
