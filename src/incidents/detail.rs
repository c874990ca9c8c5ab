//! Single-incident controller: id validation, draft overlay, save, delete.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use crate::api::incidents::{detail_key, list_prefix};
use crate::api::types::{Incident, IncidentStatus, Priority, UpdateIncident};
use crate::api::{ApiError, IncidentsClient};
use crate::cache::{QueryCache, QueryKey};

/// A validated incident id (always > 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncidentId(u64);

impl IncidentId {
  /// Parse user input. Anything that is not a positive integer is rejected
  /// before any request is made.
  pub fn parse(raw: &str) -> Result<Self, ApiError> {
    match raw.trim().parse::<u64>() {
      Ok(id) if id > 0 => Ok(Self(id)),
      _ => Err(ApiError::validation(format!("Invalid incident id: {}", raw.trim()))),
    }
  }

  pub fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for IncidentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Unsaved edit of an incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
  pub title: String,
  pub status: IncidentStatus,
  pub priority: Priority,
}

impl From<&Incident> for Draft {
  fn from(incident: &Incident) -> Self {
    Self {
      title: incident.title.clone(),
      status: incident.status,
      priority: incident.priority,
    }
  }
}

pub struct IncidentDetailController {
  id: IncidentId,
  client: IncidentsClient,
  cache: QueryCache,
  drafts: HashMap<IncidentId, Draft>,
}

impl IncidentDetailController {
  /// Validate `raw_id`; an invalid id fails here without touching the
  /// network.
  pub fn open(raw_id: &str, client: IncidentsClient, cache: QueryCache) -> Result<Self, ApiError> {
    let id = IncidentId::parse(raw_id)?;
    Ok(Self {
      id,
      client,
      cache,
      drafts: HashMap::new(),
    })
  }

  pub fn id(&self) -> IncidentId {
    self.id
  }

  pub fn key(&self) -> QueryKey {
    detail_key(self.id.get())
  }

  pub fn fetcher(
    &self,
  ) -> impl Fn() -> BoxFuture<'static, Result<Incident, ApiError>> + Send + Sync + 'static {
    let client = self.client.clone();
    let id = self.id.get();
    move || {
      let client = client.clone();
      Box::pin(async move { client.get(id).await })
    }
  }

  pub async fn load(&self) -> Result<Arc<Incident>, ApiError> {
    self.cache.query(&self.key(), self.fetcher()).await
  }

  pub fn loaded(&self) -> Option<Arc<Incident>> {
    self.cache.peek(&self.key())
  }

  /// What the form shows: the draft if there is one, else the loaded value.
  pub fn current(&self) -> Option<Draft> {
    if let Some(draft) = self.drafts.get(&self.id) {
      return Some(draft.clone());
    }
    self.loaded().map(|incident| Draft::from(incident.as_ref()))
  }

  pub fn is_dirty(&self) -> bool {
    match (self.drafts.get(&self.id), self.loaded()) {
      (Some(draft), Some(incident)) => *draft != Draft::from(incident.as_ref()),
      _ => false,
    }
  }

  /// Apply `edit` to the draft, starting one from the loaded value if
  /// needed. Does nothing until the incident has loaded.
  pub fn edit<F: FnOnce(&mut Draft)>(&mut self, edit: F) {
    let Some(mut draft) = self.current() else {
      return;
    };
    edit(&mut draft);
    self.drafts.insert(self.id, draft);
  }

  pub fn discard(&mut self) {
    self.drafts.remove(&self.id);
  }

  /// Build the save request from the current draft.
  ///
  /// On success the future invalidates every list page and this
  /// incident's key; call [`Self::saved`] afterwards to drop the draft.
  pub fn submit_save(
    &self,
  ) -> Result<impl Future<Output = Result<Incident, ApiError>> + Send + 'static, ApiError> {
    let draft = self
      .current()
      .ok_or_else(|| ApiError::validation("Incident not loaded"))?;
    let title = draft.title.trim();
    if title.is_empty() {
      return Err(ApiError::validation("Title is required"));
    }

    let body = UpdateIncident {
      title: title.to_string(),
      status: draft.status,
      priority: draft.priority,
    };
    let client = self.client.clone();
    let cache = self.cache.clone();
    let id = self.id.get();

    Ok(async move {
      let updated = client.update(id, &body).await?;
      info!(id, "incident saved");
      cache.invalidate(&list_prefix());
      cache.invalidate(&detail_key(id));
      Ok(updated)
    })
  }

  pub fn saved(&mut self) {
    self.discard();
  }

  pub async fn save(&mut self) -> Result<Incident, ApiError> {
    let updated = self.submit_save()?.await?;
    self.saved();
    Ok(updated)
  }

  /// Delete this incident. On success every list page is invalidated; the
  /// caller is expected to leave the detail view.
  pub fn delete(&self) -> impl Future<Output = Result<(), ApiError>> + Send + 'static {
    let client = self.client.clone();
    let cache = self.cache.clone();
    let id = self.id.get();

    async move {
      client.delete(id).await?;
      info!(id, "incident deleted");
      cache.invalidate(&list_prefix());
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::incidents::{list_key, ListQuery};
  use crate::api::testing::FakeTransport;
  use crate::api::Gateway;

  const INCIDENT: &str = r#"{"id":7,"title":"Disk full","status":"Open","priority":"P2","updatedUtc":"2026-01-06T22:45:00Z"}"#;

  fn open(
    raw: &str,
    transport: &Arc<FakeTransport>,
  ) -> Result<(IncidentDetailController, QueryCache), ApiError> {
    let cache = QueryCache::new();
    let client = IncidentsClient::new(Gateway::new(transport.clone()));
    IncidentDetailController::open(raw, client, cache.clone()).map(|c| (c, cache))
  }

  #[test]
  fn test_parse_incident_id() {
    assert_eq!(IncidentId::parse("42").unwrap().get(), 42);
    assert_eq!(IncidentId::parse(" 7 ").unwrap().get(), 7);
    for bad in ["abc", "0", "-3", "", "1.5"] {
      let err = IncidentId::parse(bad).unwrap_err();
      assert!(err.is_validation(), "{} should be rejected", bad);
    }
  }

  #[tokio::test]
  async fn test_invalid_id_never_hits_network() {
    let transport = FakeTransport::new();
    for bad in ["abc", "0"] {
      let err = open(bad, &transport).err().unwrap();
      assert!(err.is_validation());
      assert!(err.status.is_none());
    }
    assert_eq!(transport.request_count(), 0);
  }

  #[tokio::test]
  async fn test_draft_overlays_loaded_value() {
    let transport = FakeTransport::new();
    transport.respond_json(200, INCIDENT);
    let (mut detail, _cache) = open("7", &transport).unwrap();

    detail.edit(|d| d.title = "ignored".to_string());
    assert!(detail.current().is_none());

    detail.load().await.unwrap();
    assert_eq!(detail.current().unwrap().title, "Disk full");
    assert!(!detail.is_dirty());

    detail.edit(|d| d.status = d.status.cycle());
    detail.edit(|d| d.priority = Priority::P1);
    let current = detail.current().unwrap();
    assert_eq!(current.status, IncidentStatus::InProgress);
    assert_eq!(current.priority, Priority::P1);
    assert_eq!(current.title, "Disk full");
    assert!(detail.is_dirty());

    detail.discard();
    assert_eq!(detail.current().unwrap().status, IncidentStatus::Open);
  }

  #[tokio::test]
  async fn test_save_sends_draft_clears_it_and_invalidates() {
    let transport = FakeTransport::new();
    transport.respond_json(200, INCIDENT);
    transport.respond_json(
      200,
      r#"{"id":7,"title":"Disk full on db-1","status":"Closed","priority":"P2","updatedUtc":"2026-01-07T00:00:00Z"}"#,
    );
    let (mut detail, cache) = open("7", &transport).unwrap();
    let list = list_key(&ListQuery::first_page(5));
    cache.set(&list, 0u32);
    detail.load().await.unwrap();

    detail.edit(|d| {
      d.title = "Disk full on db-1 ".to_string();
      d.status = IncidentStatus::Closed;
    });
    let saved = detail.save().await.unwrap();

    assert_eq!(saved.status, IncidentStatus::Closed);
    assert!(!detail.is_dirty());
    assert!(cache.is_stale(&detail.key()));
    assert!(cache.is_stale(&list));

    let sent = &transport.requests()[1];
    assert_eq!(sent.path, "/api/incidents/7");
    assert_eq!(
      sent.body,
      Some(crate::api::http::Body::Json(
        br#"{"title":"Disk full on db-1","status":"Closed","priority":"P2"}"#.to_vec()
      ))
    );
  }

  #[tokio::test]
  async fn test_save_failure_keeps_draft() {
    let transport = FakeTransport::new();
    transport.respond_json(200, INCIDENT);
    transport.respond(
      400,
      Some("application/problem+json"),
      r#"{"title":"One or more validation errors occurred.","errors":{"Title":["Too long"]}}"#,
    );
    let (mut detail, _cache) = open("7", &transport).unwrap();
    detail.load().await.unwrap();
    detail.edit(|d| d.title = "x".repeat(300));

    let err = detail.save().await.unwrap_err();
    assert_eq!(err.field_errors("Title"), ["Too long"]);
    assert!(detail.is_dirty());
  }

  #[tokio::test]
  async fn test_blank_title_is_rejected_locally() {
    let transport = FakeTransport::new();
    transport.respond_json(200, INCIDENT);
    let (mut detail, _cache) = open("7", &transport).unwrap();
    detail.load().await.unwrap();
    detail.edit(|d| d.title = "  ".to_string());

    assert!(detail.save().await.unwrap_err().is_validation());
    assert_eq!(transport.request_count(), 1);
  }

  #[tokio::test]
  async fn test_missing_incident_is_not_found() {
    let transport = FakeTransport::new();
    transport.respond(404, None, "");
    let (detail, _cache) = open("99", &transport).unwrap();

    let err = detail.load().await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_delete_invalidates_lists() {
    let transport = FakeTransport::new();
    transport.respond_json(204, "");
    let (detail, cache) = open("7", &transport).unwrap();
    let list = list_key(&ListQuery::first_page(5));
    cache.set(&list, 0u32);

    detail.delete().await.unwrap();
    assert!(cache.is_stale(&list));
    assert_eq!(transport.requests()[0].method, reqwest::Method::DELETE);
  }
}
