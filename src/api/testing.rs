//! Scripted in-process transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use super::error::ApiError;
use super::http::{HttpRequest, HttpResponse, Transport};

type Reply = Result<HttpResponse, ApiError>;

enum Scripted {
  Now(Reply),
  Later(oneshot::Receiver<Reply>),
}

#[derive(Default)]
struct FakeState {
  requests: Vec<HttpRequest>,
  script: VecDeque<Scripted>,
}

/// Transport that records every request and answers from a FIFO script.
#[derive(Default)]
pub struct FakeTransport {
  state: Mutex<FakeState>,
}

pub fn json_response(status: u16, body: &str) -> Reply {
  Ok(HttpResponse {
    status,
    content_type: Some("application/json".to_string()),
    body: body.as_bytes().to_vec(),
  })
}

impl FakeTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  fn push(&self, scripted: Scripted) {
    self.state.lock().unwrap().script.push_back(scripted);
  }

  pub fn respond(&self, status: u16, content_type: Option<&str>, body: &str) {
    self.push(Scripted::Now(Ok(HttpResponse {
      status,
      content_type: content_type.map(String::from),
      body: body.as_bytes().to_vec(),
    })));
  }

  pub fn respond_json(&self, status: u16, body: &str) {
    self.push(Scripted::Now(json_response(status, body)));
  }

  pub fn fail(&self, err: ApiError) {
    self.push(Scripted::Now(Err(err)));
  }

  /// Queue a reply that is held until the returned sender fires.
  pub fn respond_later(&self) -> oneshot::Sender<Reply> {
    let (tx, rx) = oneshot::channel();
    self.push(Scripted::Later(rx));
    tx
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.state.lock().unwrap().requests.clone()
  }

  pub fn request_count(&self) -> usize {
    self.state.lock().unwrap().requests.len()
  }
}

impl Transport for FakeTransport {
  fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Reply> {
    let next = {
      let mut state = self.state.lock().unwrap();
      let path = format!("{} {}", request.method, request.path);
      state.requests.push(request);
      state.script.pop_front().ok_or(path)
    };

    Box::pin(async move {
      match next {
        Ok(Scripted::Now(reply)) => reply,
        Ok(Scripted::Later(rx)) => rx
          .await
          .unwrap_or_else(|_| Err(ApiError::network("scripted reply dropped"))),
        Err(path) => Err(ApiError::network(format!("no scripted reply for {}", path))),
      }
    })
  }
}
