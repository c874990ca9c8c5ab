use std::fmt;

use super::error::ApiError;
use super::http::{Gateway, HttpRequest};
use super::types::{CreateIncident, Incident, PagedResult, UpdateIncident};
use crate::cache::QueryKey;

/// Column the incident list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortBy {
  #[default]
  UpdatedUtc,
  Priority,
  Status,
  Title,
}

impl SortBy {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::UpdatedUtc => "updatedUtc",
      Self::Priority => "priority",
      Self::Status => "status",
      Self::Title => "title",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::UpdatedUtc => "Updated",
      Self::Priority => "Priority",
      Self::Status => "Status",
      Self::Title => "Title",
    }
  }

  pub fn cycle(self) -> Self {
    match self {
      Self::UpdatedUtc => Self::Priority,
      Self::Priority => Self::Status,
      Self::Status => Self::Title,
      Self::Title => Self::UpdatedUtc,
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDir {
  Asc,
  #[default]
  Desc,
}

impl SortDir {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Asc => "asc",
      Self::Desc => "desc",
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      Self::Asc => Self::Desc,
      Self::Desc => Self::Asc,
    }
  }
}

impl fmt::Display for SortDir {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parameters of one incident list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListQuery {
  pub page: u32,
  pub page_size: u32,
  pub sort_by: SortBy,
  pub sort_dir: SortDir,
}

impl ListQuery {
  pub fn first_page(page_size: u32) -> Self {
    Self {
      page: 1,
      page_size,
      sort_by: SortBy::default(),
      sort_dir: SortDir::default(),
    }
  }
}

/// Prefix covering every incident list page and sort order.
pub fn list_prefix() -> QueryKey {
  QueryKey::new("incidents")
}

pub fn list_key(query: &ListQuery) -> QueryKey {
  list_prefix()
    .with(query.page)
    .with(query.page_size)
    .with(query.sort_by.as_str())
    .with(query.sort_dir.as_str())
}

pub fn detail_key(id: u64) -> QueryKey {
  QueryKey::new("incident").with(id)
}

/// Request builders for `/api/incidents`
#[derive(Clone)]
pub struct IncidentsClient {
  gateway: Gateway,
}

impl IncidentsClient {
  pub fn new(gateway: Gateway) -> Self {
    Self { gateway }
  }

  pub async fn list(&self, query: ListQuery) -> Result<PagedResult<Incident>, ApiError> {
    let request = HttpRequest::get("/api/incidents")
      .query("page", query.page)
      .query("pageSize", query.page_size)
      .query("sortBy", query.sort_by)
      .query("sortDir", query.sort_dir);
    self.gateway.send(request).await
  }

  pub async fn get(&self, id: u64) -> Result<Incident, ApiError> {
    self
      .gateway
      .send(HttpRequest::get(format!("/api/incidents/{}", id)))
      .await
  }

  pub async fn create(&self, body: &CreateIncident) -> Result<Incident, ApiError> {
    let request = HttpRequest::post("/api/incidents").json(body)?;
    self.gateway.send(request).await
  }

  pub async fn update(&self, id: u64, body: &UpdateIncident) -> Result<Incident, ApiError> {
    let request = HttpRequest::put(format!("/api/incidents/{}", id)).json(body)?;
    self.gateway.send(request).await
  }

  pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
    self
      .gateway
      .send(HttpRequest::delete(format!("/api/incidents/{}", id)))
      .await
  }
}
