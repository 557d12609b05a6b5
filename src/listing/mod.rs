//! Listing flow: the first page fetched at build time and the
//! incremental pagination that follows it

mod controller;

pub use controller::{LoadMore, LoadState, PaginationController, Phase, Skip};

use serde::{Deserialize, Serialize};

use crate::cms::{CmsClient, Predicate, Query};
use crate::config::{DateField, SiteConfig};
use crate::content::{map_documents, PostSummary};
use crate::error::Result;
use crate::helpers::DateFormatter;

/// Summaries loaded so far plus the cursor of the next page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

/// Initial state handed to the listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingProps {
    #[serde(rename = "postsPagination")]
    pub posts_pagination: PaginationState,
}

/// Query for the first listing page: only the fields a summary needs
pub fn listing_query(config: &SiteConfig) -> Query {
    let doc_type = &config.cms.document_type;
    Query::new(Predicate::document_type(doc_type))
        .fetch(
            ["title", "subtitle", "author"]
                .iter()
                .map(|field| format!("{}.{}", doc_type, field)),
        )
        .page_size(config.per_page)
        .page(1)
        .orderings("[document.first_publication_date desc]")
}

/// Fetch and map the first page of the listing
pub async fn fetch_first_page(
    cms: &dyn CmsClient,
    query: &Query,
    formatter: &DateFormatter,
    date_field: DateField,
) -> Result<PaginationState> {
    let response = cms.query(query).await?;
    let results = map_documents(&response.results, formatter, date_field)?;
    tracing::info!(
        "Fetched {} of {} posts for the listing",
        results.len(),
        response.total_results_size
    );

    Ok(PaginationState {
        results,
        next_page: response.next_page,
    })
}
