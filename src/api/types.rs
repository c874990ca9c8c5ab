use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
  Open,
  InProgress,
  Closed,
}

impl IncidentStatus {
  pub const ALL: [IncidentStatus; 3] = [Self::Open, Self::InProgress, Self::Closed];

  /// The next status in display order, wrapping around
  pub fn cycle(self) -> Self {
    match self {
      Self::Open => Self::InProgress,
      Self::InProgress => Self::Closed,
      Self::Closed => Self::Open,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "Open",
      Self::InProgress => "InProgress",
      Self::Closed => "Closed",
    }
  }
}

impl fmt::Display for IncidentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
  P1,
  P2,
  #[default]
  P3,
}

impl Priority {
  pub fn cycle(self) -> Self {
    match self {
      Self::P1 => Self::P2,
      Self::P2 => Self::P3,
      Self::P3 => Self::P1,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::P1 => "P1",
      Self::P2 => "P2",
      Self::P3 => "P3",
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
  pub id: u64,
  pub title: String,
  pub status: IncidentStatus,
  pub priority: Priority,
  pub updated_utc: DateTime<Utc>,
}

/// One page of a server-side paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u32,
  pub page_size: u32,
  pub total_pages: u32,
}

/// `ceil(total / page_size)`, never less than one page.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
  if page_size == 0 {
    return 1;
  }
  let pages = total.div_ceil(u64::from(page_size));
  u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateIncident {
  pub title: String,
  pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateIncident {
  pub title: String,
  pub status: IncidentStatus,
  pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
  pub service_name: String,
  pub version: String,
  pub server_time_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
  pub file_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
  pub document_id: String,
  pub file_name: String,
  pub source: Option<String>,
  pub original_length: u64,
  pub chunk_count: u32,
  pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
  pub id: String,
  pub file_name: String,
  pub source: Option<String>,
  pub original_length: u64,
  pub created_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_total_pages() {
    assert_eq!(total_pages(12, 5), 3);
    assert_eq!(total_pages(10, 5), 2);
    assert_eq!(total_pages(1, 5), 1);
    assert_eq!(total_pages(0, 5), 1);
  }

  #[test]
  fn test_incident_wire_format() {
    let json = r#"{"id":7,"title":"Disk full","status":"InProgress","priority":"P1","updatedUtc":"2026-01-06T22:45:00Z"}"#;
    let incident: Incident = serde_json::from_str(json).unwrap();
    assert_eq!(incident.id, 7);
    assert_eq!(incident.status, IncidentStatus::InProgress);
    assert_eq!(incident.priority, Priority::P1);
  }

  #[test]
  fn test_ingest_request_omits_empty_optionals() {
    let req = IngestRequest {
      file_name: "notes.txt".to_string(),
      content_type: None,
      source: None,
      text: "hello".to_string(),
    };
    assert_eq!(
      serde_json::to_string(&req).unwrap(),
      r#"{"fileName":"notes.txt","text":"hello"}"#
    );
  }

  #[test]
  fn test_status_and_priority_cycle() {
    assert_eq!(IncidentStatus::Closed.cycle(), IncidentStatus::Open);
    assert_eq!(Priority::P3.cycle(), Priority::P1);
    assert_eq!(Priority::default(), Priority::P3);
  }
}
