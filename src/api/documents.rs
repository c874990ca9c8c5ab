use super::error::ApiError;
use super::http::{Gateway, HttpRequest};
use super::types::{DocumentSummary, IngestRequest, IngestResponse};
use crate::cache::QueryKey;

/// Header carrying the tenant. Placeholder until tenants come from auth.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

pub fn list_key(tenant: &str) -> QueryKey {
  QueryKey::new("documents").with(tenant)
}

/// Request builders for `/api/documents`
#[derive(Clone)]
pub struct DocumentsClient {
  gateway: Gateway,
}

impl DocumentsClient {
  pub fn new(gateway: Gateway) -> Self {
    Self { gateway }
  }

  /// Ingest a text document. The file name is trimmed and blank optional
  /// fields are left out of the body.
  pub async fn ingest(&self, tenant: &str, req: IngestRequest) -> Result<IngestResponse, ApiError> {
    let req = IngestRequest {
      file_name: req.file_name.trim().to_string(),
      content_type: non_blank(req.content_type),
      source: non_blank(req.source),
      text: req.text,
    };

    let request = HttpRequest::post("/api/documents/ingest")
      .header(TENANT_HEADER, tenant)
      .json(&req)?;
    self.gateway.send(request).await
  }

  pub async fn list(&self, tenant: &str) -> Result<Vec<DocumentSummary>, ApiError> {
    let request = HttpRequest::get("/api/documents").header(TENANT_HEADER, tenant);
    self.gateway.send(request).await
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}
