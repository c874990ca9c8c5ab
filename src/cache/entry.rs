//! Cache entries, snapshots and the pure optimistic-write helpers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};

use super::key::QueryKey;
use crate::api::ApiError;

/// Type-erased cached value. Each key always holds values of one type.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue, ApiError>>>;

/// Where an entry is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
  #[default]
  Idle,
  Loading,
  Error,
  Success,
}

/// Handle on the single fetch currently running for a key.
#[derive(Clone)]
pub(crate) struct InFlight {
  pub id: u64,
  pub future: SharedFetch,
}

#[derive(Default)]
pub(crate) struct CacheEntry {
  pub value: Option<AnyValue>,
  pub status: FetchStatus,
  pub error: Option<ApiError>,
  /// Set by invalidation, cleared when a fetch settles
  pub stale: bool,
  pub in_flight: Option<InFlight>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
  /// Servable without a network call.
  pub fn is_fresh(&self) -> bool {
    self.value.is_some() && !self.stale && self.status != FetchStatus::Error
  }

  /// Replace the value ahead of server confirmation, handing back the
  /// value it replaced.
  pub fn write_optimistic(&mut self, next: AnyValue) -> Option<AnyValue> {
    self.value.replace(next)
  }

  /// Put back a value captured by [`CacheEntry::write_optimistic`].
  pub fn restore(&mut self, prior: Option<AnyValue>) {
    self.value = prior;
  }

  /// Forget the running fetch without waiting for it. The status falls back
  /// to what the value supports, since nothing is fetching for this entry
  /// any more.
  pub fn detach(&mut self) -> Option<InFlight> {
    let in_flight = self.in_flight.take()?;
    if self.status == FetchStatus::Loading {
      self.status = if self.value.is_some() {
        FetchStatus::Success
      } else {
        FetchStatus::Idle
      };
    }
    Some(in_flight)
  }

  /// Result of a fetch that was detached by invalidation. The value is
  /// written, but staleness and status belong to whatever came after it.
  pub fn land_detached(&mut self, result: &Result<AnyValue, ApiError>) {
    if let Ok(value) = result {
      self.value = Some(Arc::clone(value));
      self.updated_at = Some(Utc::now());
    }
  }

  pub fn settle(&mut self, result: &Result<AnyValue, ApiError>) {
    match result {
      Ok(value) => {
        self.value = Some(Arc::clone(value));
        self.status = FetchStatus::Success;
        self.error = None;
        self.updated_at = Some(Utc::now());
      }
      Err(err) => {
        self.status = FetchStatus::Error;
        self.error = Some(err.clone());
      }
    }
    self.stale = false;
  }
}

/// Point-in-time view of an entry, typed for the caller.
#[derive(Debug, Clone)]
pub struct EntrySnapshot<T> {
  pub value: Option<Arc<T>>,
  pub status: FetchStatus,
  pub error: Option<ApiError>,
  pub is_stale: bool,
  pub is_fetching: bool,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Receipt for an optimistic write; hand it to `QueryCache::rollback` to
/// undo the write.
pub struct RollbackToken {
  pub(crate) key: QueryKey,
  pub(crate) prior: Option<AnyValue>,
}

impl RollbackToken {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl fmt::Debug for RollbackToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RollbackToken")
      .field("key", &self.key)
      .field("has_prior", &self.prior.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn value(n: i32) -> AnyValue {
    Arc::new(n)
  }

  fn as_i32(v: &Option<AnyValue>) -> Option<i32> {
    v.as_ref().and_then(|v| v.downcast_ref::<i32>()).copied()
  }

  #[test]
  fn test_optimistic_write_then_restore() {
    let mut entry = CacheEntry {
      value: Some(value(1)),
      status: FetchStatus::Success,
      ..Default::default()
    };

    let prior = entry.write_optimistic(value(2));
    assert_eq!(as_i32(&entry.value), Some(2));

    entry.restore(prior);
    assert_eq!(as_i32(&entry.value), Some(1));
  }

  #[test]
  fn test_failed_settle_keeps_previous_value() {
    let mut entry = CacheEntry {
      value: Some(value(7)),
      status: FetchStatus::Success,
      stale: true,
      ..Default::default()
    };

    entry.settle(&Err(ApiError::network("offline")));

    assert_eq!(entry.status, FetchStatus::Error);
    assert_eq!(as_i32(&entry.value), Some(7));
    assert!(!entry.stale);
    assert!(!entry.is_fresh());
  }

  #[test]
  fn test_detached_landing_keeps_entry_stale() {
    let mut entry = CacheEntry {
      value: Some(value(1)),
      status: FetchStatus::Success,
      stale: true,
      ..Default::default()
    };

    entry.land_detached(&Ok(value(2)));
    assert_eq!(as_i32(&entry.value), Some(2));
    assert!(entry.stale);
    assert!(!entry.is_fresh());

    entry.land_detached(&Err(ApiError::network("offline")));
    assert_eq!(entry.status, FetchStatus::Success);
    assert!(entry.error.is_none());
  }

  #[test]
  fn test_detach_without_fetch_is_noop() {
    let mut entry = CacheEntry {
      status: FetchStatus::Loading,
      ..Default::default()
    };
    assert!(entry.detach().is_none());
    assert_eq!(entry.status, FetchStatus::Loading);
  }

  #[test]
  fn test_freshness() {
    let mut entry = CacheEntry::default();
    assert!(!entry.is_fresh());

    entry.settle(&Ok(value(3)));
    assert!(entry.is_fresh());

    entry.stale = true;
    assert!(!entry.is_fresh());
  }
}
