//! Thin HTTP gateway: request building, transport, and error normalization.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::error::ApiError;

/// Request body as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
  /// Serialized JSON; sent with `application/json`
  Json(Vec<u8>),
  /// Raw bytes. The content type is left to the transport unless one is
  /// given explicitly (multipart boundaries need this).
  Binary {
    bytes: Vec<u8>,
    content_type: Option<String>,
  },
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
  pub headers: Vec<(String, String)>,
  pub body: Option<Body>,
}

impl HttpRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      headers: Vec::new(),
      body: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::POST, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::PUT, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::DELETE, path)
  }

  pub fn query(mut self, name: &str, value: impl ToString) -> Self {
    self.query.push((name.to_string(), value.to_string()));
    self
  }

  pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.push((name.to_string(), value.into()));
    self
  }

  pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
    let bytes = serde_json::to_vec(body)
      .map_err(|e| ApiError::unknown(format!("Failed to encode request body: {}", e)))?;
    self.body = Some(Body::Json(bytes));
    Ok(self)
  }

  pub fn binary(mut self, bytes: Vec<u8>, content_type: Option<String>) -> Self {
    self.body = Some(Body::Binary {
      bytes,
      content_type,
    });
    self
  }

  /// Case-insensitive header lookup.
  pub fn header_value(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// Fill in the content type implied by the body, unless the caller set one.
  fn with_content_type(mut self) -> Self {
    if self.header_value(CONTENT_TYPE.as_str()).is_some() {
      return self;
    }
    let implied = match &self.body {
      Some(Body::Json(_)) => Some("application/json".to_string()),
      Some(Body::Binary { content_type, .. }) => content_type.clone(),
      None => None,
    };
    if let Some(ct) = implied {
      self.headers.push((CONTENT_TYPE.as_str().to_string(), ct));
    }
    self
  }
}

/// Raw response as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// The network seam. Implementations only move bytes; status handling and
/// decoding happen in [`Gateway`].
pub trait Transport: Send + Sync + 'static {
  fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, ApiError>>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl ReqwestTransport {
  pub fn new(base_url: Url) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("inc9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client, base_url })
  }

  /// Append the request path to the base URL, keeping any path prefix the
  /// base already has (`http://host/backend` + `/api/x`).
  fn url_for(&self, request: &HttpRequest) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::unknown(format!("Base URL {} cannot carry a path", self.base_url)))?
      .pop_if_empty()
      .extend(request.path.trim_start_matches('/').split('/'));
    if !request.query.is_empty() {
      url.query_pairs_mut().extend_pairs(&request.query);
    }
    Ok(url)
  }
}

impl Transport for ReqwestTransport {
  fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, ApiError>> {
    let client = self.client.clone();
    let url = self.url_for(&request);

    Box::pin(async move {
      let url = url?;
      let mut builder = client.request(request.method, url);
      for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
      }
      builder = match request.body {
        Some(Body::Json(bytes)) | Some(Body::Binary { bytes, .. }) => builder.body(bytes),
        None => builder,
      };

      let response = builder.send().await?;
      let status = response.status().as_u16();
      let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
      let body = response.bytes().await?.to_vec();

      Ok(HttpResponse {
        status,
        content_type,
        body,
      })
    })
  }
}

/// Sends requests and turns responses into typed values or [`ApiError`]s.
///
/// No retries and no timeout; both are left to the caller.
#[derive(Clone)]
pub struct Gateway {
  transport: Arc<dyn Transport>,
}

impl Gateway {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// Gateway talking to a real server at `base_url`.
  pub fn connect(base_url: Url) -> Result<Self, ApiError> {
    Ok(Self::new(Arc::new(ReqwestTransport::new(base_url)?)))
  }

  /// Send a request and decode the JSON body.
  ///
  /// Empty bodies decode as `null`, so `T = ()` works for endpoints that
  /// return nothing.
  pub async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
    let request = request.with_content_type();
    let method = request.method.clone();
    let path = request.path.clone();
    debug!(%method, %path, "sending request");

    let response = match self.transport.execute(request).await {
      Ok(response) => response,
      Err(err) => {
        warn!(%method, %path, error = %err, "request failed");
        return Err(err);
      }
    };

    if !response.is_success() {
      let err = ApiError::from_response(
        response.status,
        response.content_type.as_deref(),
        &response.body,
      );
      warn!(%method, %path, status = response.status, error = %err, "request rejected");
      return Err(err);
    }

    decode_body(&response.body)
  }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
  let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
    b"null"
  } else {
    body
  };
  serde_json::from_slice(body)
    .map_err(|e| ApiError::unknown(format!("Failed to decode response: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ErrorKind;
  use crate::api::testing::FakeTransport;
  use serde::Deserialize;

  #[derive(Debug, Deserialize, PartialEq)]
  struct Pong {
    ok: bool,
  }

  #[tokio::test]
  async fn test_json_body_gets_content_type() {
    let transport = FakeTransport::new();
    transport.respond_json(200, r#"{"ok":true}"#);
    let gateway = Gateway::new(transport.clone());

    let request = HttpRequest::post("/api/ping")
      .json(&serde_json::json!({"a": 1}))
      .unwrap();
    let pong: Pong = gateway.send(request).await.unwrap();

    assert_eq!(pong, Pong { ok: true });
    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header_value("content-type"), Some("application/json"));
  }

  #[tokio::test]
  async fn test_binary_body_leaves_content_type_to_transport() {
    let transport = FakeTransport::new();
    transport.respond_json(200, "");
    let gateway = Gateway::new(transport.clone());

    let request = HttpRequest::post("/api/upload").binary(vec![1, 2, 3], None);
    gateway.send::<()>(request).await.unwrap();

    assert_eq!(transport.requests()[0].header_value("content-type"), None);
  }

  #[tokio::test]
  async fn test_explicit_content_type_is_kept() {
    let transport = FakeTransport::new();
    transport.respond_json(204, "");
    let gateway = Gateway::new(transport.clone());

    let request = HttpRequest::post("/api/upload")
      .header("Content-Type", "text/csv")
      .binary(b"a,b".to_vec(), None);
    gateway.send::<()>(request).await.unwrap();

    let sent = transport.requests();
    assert_eq!(sent[0].header_value("content-type"), Some("text/csv"));
    assert_eq!(sent[0].headers.len(), 1);
  }

  #[tokio::test]
  async fn test_empty_success_body_is_unit() {
    let transport = FakeTransport::new();
    transport.respond_json(204, "");
    let gateway = Gateway::new(transport.clone());

    let result: Result<(), ApiError> = gateway.send(HttpRequest::delete("/api/incidents/3")).await;
    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn test_problem_response_is_normalized() {
    let transport = FakeTransport::new();
    transport.respond(
      422,
      Some("application/problem+json"),
      r#"{"title":"Invalid","errors":{"Title":["Too long"]}}"#,
    );
    let gateway = Gateway::new(transport.clone());

    let err = gateway
      .send::<Pong>(HttpRequest::get("/api/ping"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.field_errors("Title"), ["Too long"]);
  }

  #[tokio::test]
  async fn test_undecodable_success_body_is_unknown_error() {
    let transport = FakeTransport::new();
    transport.respond_json(200, "<html>");
    let gateway = Gateway::new(transport.clone());

    let err = gateway
      .send::<Pong>(HttpRequest::get("/api/ping"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
  }

  #[tokio::test]
  async fn test_transport_failure_is_passed_through() {
    let transport = FakeTransport::new();
    transport.fail(ApiError::network("connection refused"));
    let gateway = Gateway::new(transport.clone());

    let err = gateway
      .send::<Pong>(HttpRequest::get("/api/ping"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.message, "connection refused");
  }

  #[test]
  fn test_reqwest_transport_builds_url_with_query() {
    let transport = ReqwestTransport::new(Url::parse("http://localhost:5084").unwrap()).unwrap();
    let request = HttpRequest::get("/api/incidents")
      .query("page", 2)
      .query("sortBy", "updatedUtc");
    let url = transport.url_for(&request).unwrap();
    assert_eq!(
      url.as_str(),
      "http://localhost:5084/api/incidents?page=2&sortBy=updatedUtc"
    );
  }

  #[test]
  fn test_reqwest_transport_keeps_base_path_prefix() {
    for base in ["http://host/backend", "http://host/backend/"] {
      let transport = ReqwestTransport::new(Url::parse(base).unwrap()).unwrap();
      let url = transport.url_for(&HttpRequest::get("/api/incidents/7")).unwrap();
      assert_eq!(url.as_str(), "http://host/backend/api/incidents/7");
    }
  }
}
