use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Content type the backend uses for structured error bodies.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Structured error body returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProblemDetails {
  pub title: Option<String>,
  pub detail: Option<String>,
  pub status: Option<u16>,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub errors: BTreeMap<String, Vec<String>>,
}

/// The backend sends `"errors": null` when there are no field errors.
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<BTreeMap<String, Vec<String>>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Broad category of a failure, used to pick how it is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Per-field messages, displayed inline
  Validation,
  /// Shown as a "not found" view
  NotFound,
  /// The request never produced a response
  Network,
  Unknown,
}

/// Every failure that crosses the gateway ends up as one of these.
///
/// Cloneable so a single failed fetch can be handed to every consumer that
/// was waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
  pub kind: ErrorKind,
  pub status: Option<u16>,
  pub message: String,
  pub problem: Option<ProblemDetails>,
}

impl ApiError {
  /// Client-side validation failure; no request was made.
  pub fn validation(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Validation,
      status: None,
      message: message.into(),
      problem: None,
    }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Network,
      status: None,
      message: message.into(),
      problem: None,
    }
  }

  pub fn unknown(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Unknown,
      status: None,
      message: message.into(),
      problem: None,
    }
  }

  /// Build an error from a non-success response.
  ///
  /// Bodies flagged as problem payloads are parsed; anything else (or a
  /// problem body that fails to parse) is kept as raw text.
  pub fn from_response(status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
    let is_problem = content_type
      .map(|ct| ct.to_ascii_lowercase().contains(PROBLEM_CONTENT_TYPE))
      .unwrap_or(false);

    if is_problem {
      if let Ok(problem) = serde_json::from_slice::<ProblemDetails>(body) {
        let message = problem
          .title
          .clone()
          .filter(|t| !t.is_empty())
          .unwrap_or_else(|| "Request failed".to_string());
        return Self {
          kind: classify(status, !problem.errors.is_empty()),
          status: Some(status),
          message,
          problem: Some(problem),
        };
      }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    let message = if text.is_empty() {
      format!("Request failed: {}", status)
    } else {
      text
    };

    Self {
      kind: classify(status, false),
      status: Some(status),
      message,
      problem: None,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.kind == ErrorKind::NotFound
  }

  pub fn is_validation(&self) -> bool {
    self.kind == ErrorKind::Validation
  }

  /// Messages attached to one field of the problem payload.
  ///
  /// Field names are matched case-insensitively since the backend reports
  /// them in PascalCase (`Title`) while the wire models are camelCase.
  pub fn field_errors(&self, field: &str) -> &[String] {
    self
      .problem
      .as_ref()
      .and_then(|p| {
        p.errors
          .iter()
          .find(|(name, _)| name.eq_ignore_ascii_case(field))
          .map(|(_, messages)| messages.as_slice())
      })
      .unwrap_or(&[])
  }

  /// All field errors flattened to `"Field: message"` lines.
  pub fn error_lines(&self) -> Vec<String> {
    let Some(problem) = &self.problem else {
      return Vec::new();
    };

    problem
      .errors
      .iter()
      .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{}: {}", field, m)))
      .collect()
  }
}

fn classify(status: u16, has_field_errors: bool) -> ErrorKind {
  match status {
    404 => ErrorKind::NotFound,
    400 | 422 => ErrorKind::Validation,
    _ if has_field_errors => ErrorKind::Validation,
    _ => ErrorKind::Unknown,
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::unknown(format!("Failed to decode response: {}", err))
    } else {
      Self::network(err.to_string())
    }
  }
}
