//! Process-wide query cache: deduplicated fetches, prefix invalidation and
//! optimistic writes with rollback.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tracing::{debug, trace, warn};

use super::entry::{AnyValue, CacheEntry, EntrySnapshot, InFlight, RollbackToken};
use super::key::QueryKey;
use crate::api::ApiError;

#[derive(Default)]
struct CacheState {
  entries: HashMap<QueryKey, CacheEntry>,
  /// Bumped by `clear`; fetches started under an older epoch are dropped
  epoch: u64,
  next_fetch_id: u64,
  /// Fetches whose results must not be written
  cancelled: HashSet<u64>,
}

/// Keyed store of fetched results shared by every view.
///
/// Cloning is cheap and yields a handle to the same store. The lock is never
/// held across an await point, so every state change happens within a single
/// poll.
#[derive(Clone, Default)]
pub struct QueryCache {
  state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    self
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Get the value for `key`, fetching it only when needed.
  ///
  /// 1. Fresh entry: returned without a network call
  /// 2. Fetch already running for the key: wait on that one
  /// 3. Otherwise: spawn `fetcher` and store its result under `key`
  ///
  /// The fetch runs as its own task, so dropping the returned future only
  /// gives up interest in the result; the request still completes and
  /// populates the cache.
  pub async fn query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>, ApiError>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let pending = {
      let mut state = self.lock();
      let fetch_id = state.next_fetch_id;
      let epoch = state.epoch;
      let entry = state.entries.entry(key.clone()).or_default();

      if entry.is_fresh() {
        trace!(%key, "cache hit");
        let value = entry.value.clone();
        drop(state);
        return downcast(key, value);
      }

      match &entry.in_flight {
        Some(in_flight) => {
          debug!(%key, "attaching to in-flight fetch");
          in_flight.future.clone()
        }
        None => {
          debug!(%key, fetch_id, "cache miss, fetching");
          let cache = self.clone();
          let task_key = key.clone();
          let request = fetcher();
          let handle = tokio::spawn(async move {
            let result = request.await.map(|v| Arc::new(v) as AnyValue);
            cache.complete(&task_key, fetch_id, epoch, &result);
            result
          });

          let future = async move {
            handle
              .await
              .unwrap_or_else(|e| Err(ApiError::unknown(format!("Fetch task failed: {}", e))))
          }
          .boxed()
          .shared();

          entry.status = super::FetchStatus::Loading;
          entry.in_flight = Some(InFlight {
            id: fetch_id,
            future: future.clone(),
          });
          state.next_fetch_id += 1;
          future
        }
      }
    };

    let value = pending.await?;
    downcast(key, Some(value))
  }

  /// Record the outcome of a fetch. Runs inside the fetch task.
  fn complete(&self, key: &QueryKey, fetch_id: u64, epoch: u64, result: &Result<AnyValue, ApiError>) {
    let mut state = self.lock();
    if state.cancelled.remove(&fetch_id) {
      debug!(%key, fetch_id, "dropping result of cancelled fetch");
      return;
    }
    if state.epoch != epoch {
      trace!(%key, fetch_id, "dropping result fetched before reset");
      return;
    }
    let Some(entry) = state.entries.get_mut(key) else {
      return;
    };

    if let Err(err) = result {
      warn!(%key, error = %err, "fetch failed");
    }

    if entry.in_flight.as_ref().map(|f| f.id) == Some(fetch_id) {
      entry.in_flight = None;
      entry.settle(result);
    } else {
      // Detached by invalidation. The value still lands (last write wins)
      // but the entry stays stale until a current fetch settles it.
      debug!(%key, fetch_id, "detached fetch completed");
      entry.land_detached(result);
    }
  }

  /// Mark every entry under `prefix` stale. Consumers watching those keys
  /// refetch on their next poll. Running fetches are detached rather than
  /// aborted so the next access issues a fresh request.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut state = self.lock();
    let mut count = 0;
    for (key, entry) in state.entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.stale = true;
        entry.detach();
        count += 1;
      }
    }
    debug!(%prefix, count, "invalidated");
    count
  }

  /// Stop waiting for the fetch running under `key`, if any. Its result is
  /// dropped when it arrives, so it cannot overwrite a write made after
  /// this call. Consumers already attached to it still get the response.
  pub fn cancel(&self, key: &QueryKey) -> bool {
    let mut state = self.lock();
    let Some(in_flight) = state.entries.get_mut(key).and_then(|e| e.detach()) else {
      return false;
    };
    debug!(%key, fetch_id = in_flight.id, "cancelled in-flight fetch");
    state.cancelled.insert(in_flight.id);
    true
  }

  /// Apply `updater` to the cached value right away.
  ///
  /// The written value counts as current data, so the entry is no longer
  /// stale. Returns `None` when nothing of type `T` is cached under `key`,
  /// in which case nothing was written.
  pub fn mutate<T, F>(&self, key: &QueryKey, updater: F) -> Option<RollbackToken>
  where
    T: Send + Sync + 'static,
    F: FnOnce(&T) -> T,
  {
    let mut state = self.lock();
    let entry = state.entries.get_mut(key)?;
    let current = entry.value.as_ref()?.downcast_ref::<T>()?;
    let next = updater(current);
    let prior = entry.write_optimistic(Arc::new(next));
    entry.stale = false;
    debug!(%key, "optimistic write");

    Some(RollbackToken {
      key: key.clone(),
      prior,
    })
  }

  /// Undo an optimistic write. A no-op if the entry has since been removed
  /// by `clear`.
  pub fn rollback(&self, token: RollbackToken) {
    let mut state = self.lock();
    if let Some(entry) = state.entries.get_mut(&token.key) {
      warn!(key = %token.key, "rolling back optimistic write");
      entry.restore(token.prior);
    }
  }

  /// Overwrite the cached value for `key`.
  pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
    let mut state = self.lock();
    let entry = state.entries.entry(key.clone()).or_default();
    entry.settle(&Ok(Arc::new(value)));
  }

  /// Last known value, fresh or not.
  pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
    let state = self.lock();
    let value = state.entries.get(key)?.value.clone()?;
    value.downcast::<T>().ok()
  }

  pub fn entry<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<EntrySnapshot<T>> {
    let state = self.lock();
    let entry = state.entries.get(key)?;
    Some(EntrySnapshot {
      value: entry.value.clone().and_then(|v| v.downcast::<T>().ok()),
      status: entry.status,
      error: entry.error.clone(),
      is_stale: entry.stale,
      is_fetching: entry.in_flight.is_some(),
      updated_at: entry.updated_at,
    })
  }

  pub fn is_stale(&self, key: &QueryKey) -> bool {
    self.lock().entries.get(key).map(|e| e.stale).unwrap_or(false)
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.lock().entries.contains_key(key)
  }

  /// Drop everything. Used on reset; late results from fetches started
  /// before the clear are discarded.
  pub fn clear(&self) {
    let mut state = self.lock();
    state.entries.clear();
    state.cancelled.clear();
    state.epoch += 1;
    debug!(epoch = state.epoch, "cache cleared");
  }
}

fn downcast<T: Send + Sync + 'static>(
  key: &QueryKey,
  value: Option<AnyValue>,
) -> Result<Arc<T>, ApiError> {
  value
    .and_then(|v| v.downcast::<T>().ok())
    .ok_or_else(|| ApiError::unknown(format!("Cached value for {} has an unexpected type", key)))
}
