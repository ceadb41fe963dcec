//! # HTTP Document Store
//!
//! [`DocumentStore`] over a small REST JSON API.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add     POST   {base}/collections/{c}/documents        body: document  │
//! │                 ← { "id": "<document id>" }                             │
//! │                                                                         │
//! │  query   POST   {base}/collections/{c}/documents:query  body: query     │
//! │                 ← { "documents": [ { "id": …, "data": {…} }, … ] }      │
//! │                                                                         │
//! │  update  PATCH  {base}/collections/{c}/documents/{id}   body: fields    │
//! │                 JSON merge patch, a null field is removed               │
//! │  delete  DELETE {base}/collections/{c}/documents/{id}                   │
//! │                                                                         │
//! │  Authorization: Bearer <api_key>   (when configured)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any non-2xx status, transport error or undecodable body is reported as
//! `RemoteUnavailable`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use gemledger_core::RemoteQuery;

use super::{DocumentStore, RemoteDocument};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<DocumentBody>,
}

#[derive(Debug, Deserialize)]
struct DocumentBody {
    id: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(format!("not a base URL: {}", base_url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpDocumentStore {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        let base_url = config.base_url().ok_or_else(|| {
            SyncError::InvalidConfig("remote.base_url is required for the http backend".into())
        })?;
        Self::new(base_url, config.remote.api_key.clone(), config.timeout())
    }

    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let response = self.authorized(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::RemoteUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn add(&self, collection: &str, data: &Value) -> SyncResult<String> {
        let url = self.endpoint(&["collections", collection, "documents"])?;
        debug!(%url, "POST document");

        let response = self.send(self.client.post(url).json(data)).await?;
        let body: AddResponse = response.json().await?;
        Ok(body.id)
    }

    async fn query(&self, collection: &str, query: &RemoteQuery) -> SyncResult<Vec<RemoteDocument>> {
        let url = self.endpoint(&["collections", collection, "documents:query"])?;
        debug!(%url, "POST query");

        let response = self.send(self.client.post(url).json(query)).await?;
        let body: QueryResponse = response.json().await?;
        Ok(body
            .documents
            .into_iter()
            .map(|doc| RemoteDocument {
                id: doc.id,
                data: doc.data,
            })
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: &Value) -> SyncResult<()> {
        let url = self.endpoint(&["collections", collection, "documents", id])?;
        debug!(%url, "PATCH document");

        self.send(self.client.patch(url).json(patch)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()> {
        let url = self.endpoint(&["collections", collection, "documents", id])?;
        debug!(%url, "DELETE document");

        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> HttpDocumentStore {
        HttpDocumentStore::new(&server.uri(), Some("secret".into()), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_add_posts_document_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/sales/documents"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"customerName": "Asha"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "doc-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = store(&server)
            .add("sales", &json!({"customerName": "Asha"}))
            .await
            .unwrap();
        assert_eq!(id, "doc-9");
    }

    #[tokio::test]
    async fn test_query_decodes_documents() {
        let server = MockServer::start().await;
        let query = RemoteQuery::default().with_equals("paymentMode", "UPI");
        Mock::given(method("POST"))
            .and(path("/collections/sales/documents:query"))
            .and(body_json(json!({"equals": [{"field": "paymentMode", "value": "UPI"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [
                    {"id": "a", "data": {"paymentMode": "UPI"}},
                    {"id": "b", "data": {"paymentMode": "UPI"}}
                ]
            })))
            .mount(&server)
            .await;

        let docs = store(&server).query("sales", &query).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id, "b");
    }

    #[tokio::test]
    async fn test_update_and_delete_paths() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/collections/customers/documents/c1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/collections/customers/documents/c1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/v1/", server.uri());
        let store = HttpDocumentStore::new(&base, None, Duration::from_secs(2)).unwrap();
        store.update("customers", "c1", &json!({"name": "B"})).await.unwrap();
        store.delete("customers", "c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_remote_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = store(&server).add("sales", &json!({})).await.unwrap_err();
        assert!(err.is_remote_unavailable());
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_bad_body_is_remote_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = store(&server).add("sales", &json!({})).await.unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_unavailable() {
        let store =
            HttpDocumentStore::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        let err = store.query("sales", &RemoteQuery::default()).await.unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpDocumentStore::new("mailto:a@b.c", None, Duration::from_secs(1)).is_err());
    }
}
