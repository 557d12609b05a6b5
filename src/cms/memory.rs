//! In-memory CMS used for tests and offline previews

use async_trait::async_trait;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{CmsClient, Query, QueryResponse, RawDocument};
use crate::error::{BlogError, Result};

/// Default page size of the search API
const DEFAULT_PAGE_SIZE: usize = 20;

/// A fake CMS that pages over a fixed list of documents
///
/// Cursors look like `memory://documents?q=...&page=2&pageSize=2`.
pub struct MemoryCms {
    documents: Vec<RawDocument>,
    fetches: AtomicUsize,
    fail_next: AtomicBool,
}

impl MemoryCms {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            fetches: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Number of requests served so far (including failed ones)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Make the next request fail as if the network dropped
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record_fetch(&self) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BlogError::Cms("connection reset by peer".to_string()));
        }
        Ok(())
    }

    fn matches(doc: &RawDocument, query: &Query) -> bool {
        query.predicates.iter().all(|p| match p.path.as_str() {
            "document.type" => doc.doc_type == p.value,
            "document.id" => doc.id == p.value,
            path if path.ends_with(".uid") => doc.uid.as_deref() == Some(p.value.as_str()),
            _ => true,
        })
    }

    fn page(&self, query: &Query) -> QueryResponse {
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);

        let matching: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|d| Self::matches(d, query))
            .collect();
        let total_pages = matching.len().div_ceil(page_size);

        let results: Vec<RawDocument> = matching
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .map(|d| (*d).clone())
            .collect();

        let cursor = |n: usize| {
            Url::parse_with_params(
                "memory://documents",
                &[
                    ("q", query.q()),
                    ("page", n.to_string()),
                    ("pageSize", page_size.to_string()),
                ],
            )
            .ok()
            .map(String::from)
        };

        QueryResponse {
            page,
            results_per_page: page_size,
            results_size: results.len(),
            total_results_size: matching.len(),
            total_pages,
            next_page: (page < total_pages).then(|| cursor(page + 1)).flatten(),
            prev_page: (page > 1).then(|| cursor(page - 1)).flatten(),
            results,
        }
    }
}

#[async_trait]
impl CmsClient for MemoryCms {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        self.record_fetch()?;
        Ok(self.page(query))
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse> {
        self.record_fetch()?;

        let url = Url::parse(cursor)
            .map_err(|e| BlogError::Cms(format!("invalid cursor {:?}: {}", cursor, e)))?;
        if url.scheme() != "memory" {
            return Err(BlogError::Cms(format!("foreign cursor {:?}", cursor)));
        }

        let mut query = Query::default();
        let mut q = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => query.page = value.parse().ok(),
                "pageSize" => query.page_size = value.parse().ok(),
                "q" => q = Some(value.into_owned()),
                _ => {}
            }
        }
        query.predicates = parse_predicates(q.as_deref().unwrap_or_default());

        Ok(self.page(&query))
    }
}

/// Inverse of `Query::q` for the `at` predicates this fake understands
fn parse_predicates(q: &str) -> Vec<super::Predicate> {
    q.split("[at(")
        .skip(1)
        .filter_map(|part| {
            let (path, rest) = part.split_once(", \"")?;
            let value = rest.split("\")]").next()?;
            Some(super::Predicate::at(path, value.replace("\\\"", "\"")))
        })
        .collect()
}
