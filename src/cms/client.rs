//! CMS client seam and the HTTP implementation

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{Predicate, Query, QueryResponse, RawDocument};
use crate::config::CmsConfig;
use crate::error::{BlogError, Result};

/// Read-only access to the CMS document store
#[async_trait]
pub trait CmsClient: Send + Sync {
    /// Run a predicate search
    async fn query(&self, query: &Query) -> Result<QueryResponse>;

    /// Follow a `next_page` cursor returned by a previous search
    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse>;

    /// Fetch the single document of `doc_type` with the given UID
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument> {
        let query = Query::new(Predicate::document_type(doc_type))
            .and(Predicate::uid(doc_type, uid))
            .page_size(1);
        self.query(&query)
            .await?
            .results
            .into_iter()
            .next()
            .ok_or_else(|| BlogError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

/// API root response; only the refs matter here
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Client for a Prismic-style REST API (`.../api/v2`)
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    /// Last resolved master ref and when it was fetched
    master_ref: RwLock<Option<(String, Instant)>>,
    ref_ttl: Duration,
}

impl std::fmt::Debug for PrismicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrismicClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PrismicClient {
    /// Create a client from the `cms` section of the site config
    pub fn new(config: &CmsConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(BlogError::Cms(
                "no CMS endpoint configured (set cms.endpoint or PRISMIC_API_ENDPOINT)".to_string(),
            ));
        }
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|e| BlogError::Cms(format!("invalid endpoint {:?}: {}", config.endpoint, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            access_token: config.access_token.clone(),
            master_ref: RwLock::new(None),
            ref_ttl: Duration::from_secs(config.ref_ttl_secs),
        })
    }

    /// Ref of the currently published content
    ///
    /// Reused for `ref_ttl`, then resolved again so new publishes show up.
    async fn master_ref(&self) -> Result<String> {
        if let Some((reference, resolved_at)) = self.master_ref.read().await.as_ref() {
            if resolved_at.elapsed() < self.ref_ttl {
                return Ok(reference.clone());
            }
        }

        let reference = self.resolve_master_ref().await?;
        *self.master_ref.write().await = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    async fn resolve_master_ref(&self) -> Result<String> {
        let mut request = self.http.get(self.endpoint.clone());
        if let Some(ref token) = self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        let info: ApiInfo = request.send().await?.error_for_status()?.json().await?;
        let master = info
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .ok_or_else(|| BlogError::Cms("API exposes no master ref".to_string()))?;
        tracing::debug!("Resolved master ref {}", master.reference);
        Ok(master.reference)
    }

    fn search_url(&self) -> String {
        format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }

    /// Reject cursors that would send us to another host
    fn check_cursor(&self, cursor: &str) -> Result<Url> {
        let url = Url::parse(cursor)
            .map_err(|e| BlogError::Cms(format!("invalid cursor {:?}: {}", cursor, e)))?;
        if url.host_str() != self.endpoint.host_str() {
            return Err(BlogError::Cms(format!(
                "cursor host {:?} does not match the CMS endpoint",
                url.host_str()
            )));
        }
        Ok(url)
    }
}

#[async_trait]
impl CmsClient for PrismicClient {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        let reference = self.master_ref().await?;
        let mut request = self
            .http
            .get(self.search_url())
            .query(&[("ref", reference.as_str())])
            .query(&query.params());
        if let Some(ref token) = self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        tracing::debug!("CMS query {}", query.q());
        let response: QueryResponse = request.send().await?.error_for_status()?.json().await?;
        tracing::debug!(
            "CMS returned {} of {} documents (page {}/{})",
            response.results.len(),
            response.total_results_size,
            response.page,
            response.total_pages
        );
        Ok(response)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse> {
        let mut url = self.check_cursor(cursor)?;
        if let Some(ref token) = self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        tracing::debug!("CMS next page {}", cursor);
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query as UrlQuery, State};
    use axum::{routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A local CMS whose master ref moves from `r1` to `r2` on publish
    #[derive(Default)]
    struct StubCms {
        published: AtomicBool,
        root_hits: AtomicUsize,
    }

    async fn api_root(State(stub): State<Arc<StubCms>>) -> Json<Value> {
        stub.root_hits.fetch_add(1, Ordering::SeqCst);
        let reference = if stub.published.load(Ordering::SeqCst) {
            "r2"
        } else {
            "r1"
        };
        Json(json!({ "refs": [{ "id": "master", "ref": reference, "isMasterRef": true }] }))
    }

    /// Document `new` only exists in ref `r2`
    async fn search(UrlQuery(params): UrlQuery<HashMap<String, String>>) -> Json<Value> {
        let results = if params.get("ref").map(String::as_str) == Some("r2") {
            json!([{ "id": "id-new", "uid": "new", "type": "post", "data": {} }])
        } else {
            json!([])
        };
        Json(json!({ "page": 1, "total_pages": 1, "results": results, "next_page": null }))
    }

    async fn serve_stub(ref_ttl_secs: u64) -> (Arc<StubCms>, PrismicClient) {
        let stub = Arc::new(StubCms::default());
        let app = Router::new()
            .route("/api/v2", get(api_root))
            .route("/api/v2/documents/search", get(search))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = PrismicClient::new(&CmsConfig {
            endpoint: format!("http://{}/api/v2", addr),
            access_token: None,
            document_type: "post".to_string(),
            ref_ttl_secs,
        })
        .unwrap();
        (stub, client)
    }

    #[tokio::test]
    async fn test_sees_documents_published_after_first_query() {
        let (stub, client) = serve_stub(0).await;

        let before = client.get_by_uid("post", "new").await;
        assert!(matches!(before, Err(BlogError::NotFound { .. })));

        stub.published.store(true, Ordering::SeqCst);
        let after = client.get_by_uid("post", "new").await.unwrap();
        assert_eq!(after.uid.as_deref(), Some("new"));
        assert_eq!(stub.root_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_master_ref_reused_within_ttl() {
        let (stub, client) = serve_stub(60).await;

        client.get_by_uid("post", "new").await.unwrap_err();
        client.get_by_uid("post", "new").await.unwrap_err();
        assert_eq!(stub.root_hits.load(Ordering::SeqCst), 1);
    }

    fn client() -> PrismicClient {
        PrismicClient::new(&CmsConfig {
            endpoint: "https://blog.cdn.prismic.io/api/v2/".to_string(),
            access_token: Some("secret".to_string()),
            document_type: "post".to_string(),
            ref_ttl_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_requires_endpoint() {
        let err = PrismicClient::new(&CmsConfig::default()).unwrap_err();
        assert!(matches!(err, BlogError::Cms(_)));
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            client().search_url(),
            "https://blog.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn test_cursor_must_stay_on_endpoint_host() {
        let client = client();
        assert!(client
            .check_cursor("https://blog.cdn.prismic.io/api/v2/documents/search?page=2")
            .is_ok());
        assert!(client.check_cursor("https://evil.example.com/?page=2").is_err());
        assert!(client.check_cursor("not a url").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("secret"));
    }
}
