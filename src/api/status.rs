use super::error::ApiError;
use super::http::{Gateway, HttpRequest};
use super::types::ServiceStatus;
use crate::cache::QueryKey;

pub fn status_key() -> QueryKey {
  QueryKey::new("status")
}

#[derive(Clone)]
pub struct StatusClient {
  gateway: Gateway,
}

impl StatusClient {
  pub fn new(gateway: Gateway) -> Self {
    Self { gateway }
  }

  pub async fn get(&self) -> Result<ServiceStatus, ApiError> {
    self.gateway.send(HttpRequest::get("/api/status")).await
  }
}
