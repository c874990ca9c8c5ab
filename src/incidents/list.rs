//! Incident list controller: paging and sort state, cache keys, create and
//! optimistic delete.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::api::incidents::{list_key, list_prefix, ListQuery, SortBy, SortDir};
use crate::api::types::{total_pages, CreateIncident, Incident, PagedResult, Priority};
use crate::api::{ApiError, IncidentsClient};
use crate::cache::{QueryCache, QueryKey};

pub type IncidentPage = PagedResult<Incident>;

/// Unsaved input of the create form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
  pub title: String,
  pub priority: Priority,
}

/// Remove `id` from a page and recompute the totals.
///
/// `total` drops by one even if the item is not on this page: the delete
/// targets the server-side collection, not just the visible slice.
pub fn remove_incident(page: &IncidentPage, id: u64) -> IncidentPage {
  let total = page.total.saturating_sub(1);
  IncidentPage {
    items: page.items.iter().filter(|x| x.id != id).cloned().collect(),
    total,
    page: page.page,
    page_size: page.page_size,
    total_pages: total_pages(total, page.page_size),
  }
}

/// Owns the list's paging/sort state and derives cache keys from it.
pub struct IncidentListController {
  client: IncidentsClient,
  cache: QueryCache,
  query: ListQuery,
  pub form: CreateForm,
}

impl IncidentListController {
  pub fn new(client: IncidentsClient, cache: QueryCache, page_size: u32) -> Self {
    Self {
      client,
      cache,
      query: ListQuery::first_page(page_size.max(1)),
      form: CreateForm::default(),
    }
  }

  pub fn query(&self) -> ListQuery {
    self.query
  }

  pub fn page(&self) -> u32 {
    self.query.page
  }

  pub fn key(&self) -> QueryKey {
    list_key(&self.query)
  }

  /// Fetcher for the current state, suitable for `Query::new`/`switch`.
  pub fn fetcher(
    &self,
  ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<IncidentPage, ApiError>>
       + Send
       + Sync
       + 'static {
    let client = self.client.clone();
    let query = self.query;
    move || {
      let client = client.clone();
      Box::pin(async move { client.list(query).await })
    }
  }

  /// Load the current page through the cache.
  pub async fn load(&self) -> Result<Arc<IncidentPage>, ApiError> {
    let fetch = self.fetcher();
    self.cache.query(&self.key(), fetch).await
  }

  /// Page currently cached for the current key, if any.
  pub fn current(&self) -> Option<Arc<IncidentPage>> {
    self.cache.peek(&self.key())
  }

  pub fn can_prev(&self, fetching: bool) -> bool {
    self.query.page > 1 && !fetching
  }

  pub fn can_next(&self, total_pages: u32, fetching: bool) -> bool {
    self.query.page < total_pages && !fetching
  }

  pub fn prev_page(&mut self, fetching: bool) -> bool {
    if !self.can_prev(fetching) {
      return false;
    }
    self.query.page -= 1;
    true
  }

  pub fn next_page(&mut self, total_pages: u32, fetching: bool) -> bool {
    if !self.can_next(total_pages, fetching) {
      return false;
    }
    self.query.page += 1;
    true
  }

  /// Change the sort column. The page is kept.
  pub fn set_sort_by(&mut self, sort_by: SortBy) {
    self.query.sort_by = sort_by;
  }

  /// Change the sort direction. The page is kept.
  pub fn set_sort_dir(&mut self, sort_dir: SortDir) {
    self.query.sort_dir = sort_dir;
  }

  /// Pull `page` back inside `1..=total_pages` after a fetch shows the
  /// collection shrank. Returns true if the page moved.
  pub fn clamp_to(&mut self, total_pages: u32) -> bool {
    let last = total_pages.max(1);
    if self.query.page > last {
      self.query.page = last;
      return true;
    }
    false
  }

  /// Validate the form and build the create request.
  ///
  /// The returned future invalidates every list page once the incident is
  /// created; call [`Self::created`] afterwards to reset local state.
  pub fn submit_create(
    &self,
  ) -> Result<impl Future<Output = Result<Incident, ApiError>> + Send + 'static, ApiError> {
    let title = self.form.title.trim();
    if title.is_empty() {
      return Err(ApiError::validation("Title is required"));
    }

    let body = CreateIncident {
      title: title.to_string(),
      priority: self.form.priority,
    };
    let client = self.client.clone();
    let cache = self.cache.clone();

    Ok(async move {
      let created = client.create(&body).await?;
      info!(id = created.id, "incident created");
      cache.invalidate(&list_prefix());
      Ok(created)
    })
  }

  /// Local effects of a successful create.
  pub fn created(&mut self) {
    self.query.page = 1;
    self.form = CreateForm::default();
  }

  pub async fn create(&mut self) -> Result<Incident, ApiError> {
    let created = self.submit_create()?.await?;
    self.created();
    Ok(created)
  }

  /// Optimistically drop `id` from the current page, then delete it.
  ///
  /// The cache is updated before this returns, so the row disappears
  /// immediately. A refetch of the page already running is cancelled first
  /// so its response cannot bring the row back. A failed request restores
  /// the exact prior page. Either way every list page is invalidated once
  /// the request settles.
  pub fn delete(&self, id: u64) -> impl Future<Output = Result<(), ApiError>> + Send + 'static {
    let key = self.key();
    self.cache.cancel(&key);
    let token = self
      .cache
      .mutate::<IncidentPage, _>(&key, |page| remove_incident(page, id));
    let client = self.client.clone();
    let cache = self.cache.clone();

    async move {
      let result = client.delete(id).await;
      match &result {
        Ok(()) => info!(id, "incident deleted"),
        Err(err) => {
          warn!(id, error = %err, "delete failed");
          if let Some(token) = token {
            cache.rollback(token);
          }
        }
      }
      cache.invalidate(&list_prefix());
      result
    }
  }
}
