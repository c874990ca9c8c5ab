//! View-side handles onto the query cache.
//!
//! Inspired by TanStack Query: a `Query<T>` is one consumer's subscription
//! to a cache key, and a `Mutation<T>` tracks a single write.
//!
//! # Example
//!
//! ```ignore
//! let client = incidents.clone();
//! let mut query = Query::new(cache.clone(), detail_key(7), move || {
//!     let client = client.clone();
//!     async move { client.get(7).await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::api::ApiError;
use crate::cache::{QueryCache, QueryKey};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch for the current key is running
  Loading,
  /// Query completed successfully
  Success(Arc<T>),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&Arc<T>> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// One consumer's view of a cache key.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure), routed through the shared cache
/// - Loading/success/error states
/// - Async result handling via channels
/// - Refetching when anyone invalidates the key
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  state: QueryState<T>,
  /// Last data shown, kept visible while a new key loads
  previous: Option<Arc<T>>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Arc<T>, ApiError>>>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a new query for `key` with the given fetcher function.
  ///
  /// The fetcher is only called when the cache has nothing fresh for the
  /// key and no fetch for it is already running.
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      cache,
      key,
      fetcher: Arc::new(move || Box::pin(fetcher())),
      state: QueryState::Idle,
      previous: None,
      receiver: None,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Data for the current key, or the previous key's data while the
  /// current one is still loading.
  pub fn data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data.as_ref()),
      _ => self.previous.as_deref(),
    }
  }

  /// True while data from an older key is being shown.
  pub fn is_placeholder(&self) -> bool {
    !self.state.is_success() && self.previous.is_some()
  }

  /// Check if the first fetch for this key is running.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Any fetch running, including background refetches.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// Start fetching if not already fetching.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Mark the key stale and fetch it again.
  pub fn refetch(&mut self) {
    self.cache.invalidate(&self.key);
    // Drop interest in any pending result; it still lands in the cache
    self.receiver = None;
    self.start_fetch();
  }

  /// Point the query at a new key and fetcher, keeping the current data
  /// visible until the new key resolves.
  pub fn switch<F, Fut>(&mut self, key: QueryKey, fetcher: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if let QueryState::Success(data) = &self.state {
      self.previous = Some(Arc::clone(data));
    }
    self.key = key;
    self.fetcher = Arc::new(move || Box::pin(fetcher()));
    self.state = QueryState::Idle;
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results and follow the cache.
  ///
  /// Returns `true` if anything visible changed. Call this in your event
  /// loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.poll_receiver();

    // Follow optimistic writes and refetches made by others
    if let QueryState::Success(current) = &self.state {
      if let Some(latest) = self.cache.peek::<T>(&self.key) {
        if !Arc::ptr_eq(current, &latest) {
          self.state = QueryState::Success(latest);
          changed = true;
        }
      }
    }

    if self.receiver.is_none() && self.needs_refetch() {
      self.start_fetch();
      changed = true;
    }

    changed
  }

  fn poll_receiver(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.previous = None;
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        // A failed refetch keeps what was on screen
        if let QueryState::Success(data) = &self.state {
          self.previous = Some(Arc::clone(data));
        }
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error(ApiError::unknown("Query was cancelled"));
        self.receiver = None;
        true
      }
    }
  }

  fn needs_refetch(&self) -> bool {
    match self.state {
      QueryState::Idle => false,
      // Cleared by a reset while we were showing it
      QueryState::Success(_) if !self.cache.contains(&self.key) => true,
      _ => self.cache.is_stale(&self.key),
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let cache = self.cache.clone();
    let key = self.key.clone();
    let fetcher = Arc::clone(&self.fetcher);
    tokio::spawn(async move {
      let result = cache.query(&key, move || fetcher()).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

/// The state of a mutation
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(ApiError),
}

/// A single write whose outcome is picked up on tick.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Run `request` unless another one is pending.
  pub fn start<Fut>(&mut self, request: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;
    tokio::spawn(async move {
      let _ = tx.send(request.await);
    });
    true
  }

  /// Record a failure that happened before any request was made.
  pub fn reject(&mut self, err: ApiError) {
    self.receiver = None;
    self.state = MutationState::Error(err);
  }

  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }

  /// Returns the outcome the moment the mutation settles, once.
  pub fn poll(&mut self) -> Option<&MutationState<T>> {
    let receiver = self.receiver.as_mut()?;
    match receiver.try_recv() {
      Ok(result) => {
        self.state = match result {
          Ok(value) => MutationState::Success(value),
          Err(err) => MutationState::Error(err),
        };
      }
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.state = MutationState::Error(ApiError::unknown("Mutation was cancelled"));
      }
    }
    self.receiver = None;
    Some(&self.state)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  fn counter_query(cache: &QueryCache, key: QueryKey, counter: &Arc<AtomicU32>) -> Query<u32> {
    let counter = Arc::clone(counter);
    Query::new(cache.clone(), key, move || {
      let counter = Arc::clone(&counter);
      async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
    })
  }

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::new();
    let mut query = Query::new(cache, QueryKey::new("nums"), || async {
      Ok::<_, ApiError>(vec![1, 2, 3])
    });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    settle().await;

    assert!(query.poll());
    assert!(query.state().is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let cache = QueryCache::new();
    let mut query: Query<i32> = Query::new(cache, QueryKey::new("broken"), || async {
      Err(ApiError::network("Something went wrong"))
    });

    query.fetch();
    settle().await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(
      query.error().map(|e| e.message.as_str()),
      Some("Something went wrong")
    );
  }

  #[tokio::test]
  async fn test_two_consumers_share_one_fetch() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut a = counter_query(&cache, QueryKey::new("shared"), &counter);
    let mut b = counter_query(&cache, QueryKey::new("shared"), &counter);

    a.fetch();
    b.fetch();
    settle().await;
    a.poll();
    b.poll();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.data(), Some(&1));
    assert_eq!(b.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_invalidation_by_someone_else_triggers_refetch() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counter_query(&cache, QueryKey::new("watched").with(1u32), &counter);

    query.fetch();
    settle().await;
    query.poll();
    assert_eq!(query.data(), Some(&1));

    cache.invalidate(&QueryKey::new("watched"));
    assert!(query.poll());
    assert!(query.is_fetching());
    // Stale data stays visible during the background refetch
    assert_eq!(query.data(), Some(&1));

    settle().await;
    query.poll();
    assert_eq!(query.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_last_data() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let calls = Arc::clone(&counter);
    let mut query = Query::new(cache, QueryKey::new("flaky"), move || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          Ok(7u32)
        } else {
          Err(ApiError::network("connection reset"))
        }
      }
    });

    query.fetch();
    settle().await;
    query.poll();

    query.refetch();
    settle().await;
    query.poll();

    assert!(query.is_error());
    assert_eq!(query.data(), Some(&7));
  }

  #[tokio::test]
  async fn test_query_follows_optimistic_writes() {
    let cache = QueryCache::new();
    let key = QueryKey::new("optimistic");
    let mut query = Query::new(cache.clone(), key.clone(), || async { Ok(10u32) });

    query.fetch();
    settle().await;
    query.poll();

    let token = cache.mutate::<u32, _>(&key, |v| v + 1).unwrap();
    assert!(query.poll());
    assert_eq!(query.data(), Some(&11));

    cache.rollback(token);
    assert!(query.poll());
    assert_eq!(query.data(), Some(&10));
  }

  #[tokio::test]
  async fn test_switch_keeps_previous_data_until_new_key_loads() {
    let cache = QueryCache::new();
    let mut query = Query::new(cache, QueryKey::new("page").with(1u32), || async {
      Ok(1u32)
    });
    query.fetch();
    settle().await;
    query.poll();

    query.switch(QueryKey::new("page").with(2u32), || async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok(2u32)
    });
    assert!(query.is_loading());
    assert!(query.is_placeholder());
    assert_eq!(query.data(), Some(&1));

    tokio::time::sleep(Duration::from_millis(80)).await;
    query.poll();
    assert!(!query.is_placeholder());
    assert_eq!(query.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_fetch_while_fetching_is_noop() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let mut query = counter_query(&cache, QueryKey::new("once"), &counter);

    query.fetch();
    query.fetch();
    settle().await;
    query.poll();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_mutation_settles_once() {
    let mut mutation: Mutation<u32> = Mutation::new();
    assert!(mutation.start(async { Ok(5) }));
    assert!(mutation.is_pending());
    assert!(!mutation.start(async { Ok(6) }));

    settle().await;
    assert!(matches!(mutation.poll(), Some(MutationState::Success(5))));
    assert!(mutation.poll().is_none());
  }

  #[tokio::test]
  async fn test_mutation_reject_skips_request() {
    let mut mutation: Mutation<()> = Mutation::new();
    mutation.reject(ApiError::validation("Title is required"));
    assert_eq!(
      mutation.error().map(|e| e.message.as_str()),
      Some("Title is required")
    );
  }
}
