//! Document listing and ingestion, scoped to a tenant.

use std::future::Future;
use std::path::Path;

use futures::future::BoxFuture;
use tracing::info;

use crate::api::documents::list_key;
use crate::api::types::{DocumentSummary, IngestRequest, IngestResponse};
use crate::api::{ApiError, DocumentsClient};
use crate::cache::{QueryCache, QueryKey};

/// Source recorded for documents ingested from this console.
pub const INGEST_SOURCE: &str = "console";

/// Guess a content type from the file extension.
pub fn guess_content_type(path: &Path) -> Option<&'static str> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  match ext.as_str() {
    "txt" | "log" => Some("text/plain"),
    "md" | "markdown" => Some("text/markdown"),
    "json" => Some("application/json"),
    "csv" => Some("text/csv"),
    "html" | "htm" => Some("text/html"),
    _ => None,
  }
}

/// Read a local text file into an ingest request.
pub async fn read_ingest_file(path: &Path) -> Result<IngestRequest, ApiError> {
  let file_name = path
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| ApiError::validation(format!("Not a file: {}", path.display())))?
    .to_string();

  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| ApiError::validation(format!("Failed to read {}: {}", path.display(), e)))?;

  Ok(IngestRequest {
    file_name,
    content_type: guess_content_type(path).map(String::from),
    source: Some(INGEST_SOURCE.to_string()),
    text,
  })
}

#[derive(Clone)]
pub struct DocumentsController {
  client: DocumentsClient,
  cache: QueryCache,
  tenant: String,
}

impl DocumentsController {
  pub fn new(client: DocumentsClient, cache: QueryCache, tenant: String) -> Self {
    Self {
      client,
      cache,
      tenant,
    }
  }

  pub fn tenant(&self) -> &str {
    &self.tenant
  }

  /// Switch tenant. Blank input is rejected and the tenant kept.
  pub fn set_tenant(&mut self, tenant: &str) -> Result<(), ApiError> {
    let tenant = tenant.trim();
    if tenant.is_empty() {
      return Err(ApiError::validation("Tenant is required"));
    }
    self.tenant = tenant.to_string();
    Ok(())
  }

  pub fn key(&self) -> QueryKey {
    list_key(&self.tenant)
  }

  pub fn fetcher(
    &self,
  ) -> impl Fn() -> BoxFuture<'static, Result<Vec<DocumentSummary>, ApiError>> + Send + Sync + 'static
  {
    let client = self.client.clone();
    let tenant = self.tenant.clone();
    move || {
      let client = client.clone();
      let tenant = tenant.clone();
      Box::pin(async move { client.list(&tenant).await })
    }
  }

  /// Validate and send an ingest request for the current tenant. The
  /// tenant's document list is invalidated once it succeeds.
  pub fn submit_ingest(
    &self,
    req: IngestRequest,
  ) -> Result<impl Future<Output = Result<IngestResponse, ApiError>> + Send + 'static, ApiError> {
    if req.file_name.trim().is_empty() {
      return Err(ApiError::validation("File name is required"));
    }
    if req.text.trim().is_empty() {
      return Err(ApiError::validation("Text is required"));
    }

    let client = self.client.clone();
    let cache = self.cache.clone();
    let tenant = self.tenant.clone();

    Ok(async move {
      let response = client.ingest(&tenant, req).await?;
      info!(
        document_id = %response.document_id,
        chunks = response.chunk_count,
        "document ingested"
      );
      cache.invalidate(&list_key(&tenant));
      Ok(response)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::FakeTransport;
  use crate::api::Gateway;
  use std::path::PathBuf;

  fn controller(transport: &std::sync::Arc<FakeTransport>) -> (DocumentsController, QueryCache) {
    let cache = QueryCache::new();
    let client = DocumentsClient::new(Gateway::new(transport.clone()));
    (
      DocumentsController::new(client, cache.clone(), "dev".to_string()),
      cache,
    )
  }

  #[test]
  fn test_guess_content_type() {
    assert_eq!(guess_content_type(Path::new("a/notes.TXT")), Some("text/plain"));
    assert_eq!(guess_content_type(Path::new("readme.md")), Some("text/markdown"));
    assert_eq!(guess_content_type(Path::new("blob.bin")), None);
    assert_eq!(guess_content_type(Path::new("Makefile")), None);
  }

  #[tokio::test]
  async fn test_read_ingest_file() {
    let path: PathBuf = std::env::temp_dir().join(format!("inc9s-ingest-{}.md", std::process::id()));
    tokio::fs::write(&path, "# Runbook\nRestart the worker.").await.unwrap();

    let req = read_ingest_file(&path).await.unwrap();
    let _ = tokio::fs::remove_file(&path).await;

    assert!(req.file_name.starts_with("inc9s-ingest-"));
    assert_eq!(req.content_type.as_deref(), Some("text/markdown"));
    assert_eq!(req.source.as_deref(), Some(INGEST_SOURCE));
    assert_eq!(req.text, "# Runbook\nRestart the worker.");
  }

  #[tokio::test]
  async fn test_read_missing_file_is_validation_error() {
    let err = read_ingest_file(Path::new("/definitely/not/here.txt"))
      .await
      .unwrap_err();
    assert!(err.is_validation());
  }

  #[tokio::test]
  async fn test_ingest_invalidates_tenant_list_only() {
    let transport = FakeTransport::new();
    transport.respond_json(
      200,
      r#"{"documentId":"d-9","fileName":"a.txt","originalLength":3,"chunkCount":1,"tenantId":"dev"}"#,
    );
    let (docs, cache) = controller(&transport);
    let other = list_key("acme");
    cache.set(&docs.key(), Vec::<DocumentSummary>::new());
    cache.set(&other, Vec::<DocumentSummary>::new());

    let req = IngestRequest {
      file_name: "a.txt".to_string(),
      content_type: None,
      source: None,
      text: "abc".to_string(),
    };
    let response = docs.submit_ingest(req).unwrap().await.unwrap();

    assert_eq!(response.tenant_id, "dev");
    assert!(cache.is_stale(&docs.key()));
    assert!(!cache.is_stale(&other));
  }

  #[tokio::test]
  async fn test_ingest_requires_text() {
    let transport = FakeTransport::new();
    let (docs, _cache) = controller(&transport);
    let req = IngestRequest {
      file_name: "a.txt".to_string(),
      content_type: None,
      source: None,
      text: "  \n".to_string(),
    };
    assert!(docs.submit_ingest(req).err().unwrap().is_validation());
    assert_eq!(transport.request_count(), 0);
  }

  #[test]
  fn test_tenant_switch_changes_key() {
    let transport = FakeTransport::new();
    let (mut docs, _cache) = controller(&transport);
    assert_eq!(docs.key().to_string(), "documents/dev");

    docs.set_tenant(" acme ").unwrap();
    assert_eq!(docs.key().to_string(), "documents/acme");
    assert!(docs.set_tenant("  ").is_err());
    assert_eq!(docs.tenant(), "acme");
  }
}
