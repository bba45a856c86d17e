//! Memoization table guaranteeing at most one fetch per identity URL
//!
//! Every worker shares one table. Claiming a key is an exclusive
//! check-then-insert, and the value behind a key is computed exactly once: a
//! worker that asks for a key another worker is still fetching waits for that
//! fetch instead of issuing its own.

use crate::state::PageState;
use crate::LinkrotError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use url::Url;

/// A value that can tell whether its fetch succeeded
pub trait Resolution {
    fn succeeded(&self) -> bool;
}

/// One memoized URL: its lifecycle state and, once fetched, its outcome
#[derive(Debug)]
pub struct MemoEntry<T> {
    url: Url,
    state: Mutex<PageState>,
    value: OnceCell<T>,
}

impl<T: Resolution> MemoEntry<T> {
    fn new(url: Url) -> Self {
        Self {
            url,
            state: Mutex::new(PageState::Unvisited),
            value: OnceCell::new(),
        }
    }

    /// Moves the entry to a new state
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was legal and applied
    /// * `Err(LinkrotError::InvalidTransition)` - The transition is not allowed
    pub fn transition(&self, to: PageState) -> Result<(), LinkrotError> {
        let mut state = self.lock_state();
        if !state.can_transition_to(to) {
            return Err(LinkrotError::InvalidTransition {
                url: self.url.to_string(),
                from: *state,
                to,
            });
        }
        tracing::trace!("{}: {} -> {}", self.url, *state, to);
        *state = to;
        Ok(())
    }

    /// Returns the value, running `fetch` if nobody has yet
    ///
    /// Concurrent callers all wait on the same computation; `fetch` runs at most
    /// once over the lifetime of the entry.
    pub async fn resolve<F, Fut>(&self, fetch: F) -> Result<&T, LinkrotError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.value
            .get_or_try_init(|| async {
                self.transition(PageState::Fetching)?;
                let value = fetch().await;
                self.transition(if value.succeeded() {
                    PageState::Succeeded
                } else {
                    PageState::Failed
                })?;
                Ok::<T, LinkrotError>(value)
            })
            .await
    }

    fn lock_state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Identity URL -> memoized entry, shared by every worker of one crawl
#[derive(Debug)]
pub struct MemoTable<T> {
    entries: Mutex<HashMap<Url, Arc<MemoEntry<T>>>>,
}

impl<T: Resolution> Default for MemoTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resolution> MemoTable<T> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry for an identity URL, creating and scheduling it if new
    ///
    /// # Returns
    ///
    /// * `(entry, true)` - This caller inserted the key and owns its scheduling
    /// * `(entry, false)` - The key was already known
    pub fn claim(&self, identity: &Url) -> Result<(Arc<MemoEntry<T>>, bool), LinkrotError> {
        let mut entries = self.lock_entries();

        if let Some(entry) = entries.get(identity) {
            return Ok((Arc::clone(entry), false));
        }

        let entry = Arc::new(MemoEntry::new(identity.clone()));
        entry.transition(PageState::Scheduled)?;
        entries.insert(identity.clone(), Arc::clone(&entry));
        Ok((entry, true))
    }

    /// Looks up an entry without creating it
    pub fn get(&self, identity: &Url) -> Option<Arc<MemoEntry<T>>> {
        self.lock_entries().get(identity).cloned()
    }

    /// Returns the number of distinct URLs claimed so far
    pub fn known_urls(&self) -> usize {
        self.lock_entries().len()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Url, Arc<MemoEntry<T>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
