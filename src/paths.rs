//! Static path discovery for post pages

use serde::Serialize;
use std::time::Duration;

use crate::cms::{CmsClient, Predicate, Query};
use crate::error::Result;
use crate::helpers::is_safe_uid;

/// Page size used while walking every post
const ENUMERATE_PAGE_SIZE: usize = 100;

/// One pre-rendered post route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPath {
    pub slug: String,
}

/// Routes known at build time and what to do with the rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticPaths {
    pub paths: Vec<PostPath>,
    /// Unknown slugs are rendered on first request
    pub fallback: bool,
    /// How long a rendered page is served before the CMS is asked again
    #[serde(with = "secs")]
    pub revalidate: Duration,
}

impl StaticPaths {
    pub fn contains(&self, slug: &str) -> bool {
        self.paths.iter().any(|p| p.slug == slug)
    }
}

/// List the UID of every document of `doc_type`, following all pages
pub async fn enumerate_paths(
    cms: &dyn CmsClient,
    doc_type: &str,
    revalidate: Duration,
) -> Result<StaticPaths> {
    let query = Query::new(Predicate::document_type(doc_type))
        .fetch([format!("{}.title", doc_type)])
        .page_size(ENUMERATE_PAGE_SIZE)
        .page(1);

    let mut response = cms.query(&query).await?;
    let mut paths = Vec::new();

    loop {
        for doc in &response.results {
            match doc.uid.as_deref() {
                Some(uid) if is_safe_uid(uid) => paths.push(PostPath {
                    slug: uid.to_string(),
                }),
                Some(uid) => tracing::warn!("Skipping document {} with unusable uid {:?}", doc.id, uid),
                None => tracing::warn!("Skipping document {} without uid", doc.id),
            }
        }

        match response.next_page.take() {
            Some(cursor) => response = cms.fetch_page(&cursor).await?,
            None => break,
        }
    }

    tracing::info!("Enumerated {} post paths", paths.len());
    Ok(StaticPaths {
        paths,
        fallback: true,
        revalidate,
    })
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::post;
    use crate::cms::MemoryCms;

    #[tokio::test]
    async fn test_follows_every_page() {
        let docs = (0..250)
            .map(|i| post(&format!("post-{}", i), "2021-03-25T19:25:28+0000"))
            .collect();
        let cms = MemoryCms::new(docs);

        let paths = enumerate_paths(&cms, "post", Duration::from_secs(1800))
            .await
            .unwrap();
        assert_eq!(paths.paths.len(), 250);
        assert_eq!(paths.paths[0].slug, "post-0");
        assert!(paths.contains("post-249"));
        assert!(paths.fallback);
        assert_eq!(cms.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_skips_documents_without_usable_uid() {
        let mut no_uid = post("x", "2021-03-25T19:25:28+0000");
        no_uid.uid = None;
        let bad_uid = post("../x", "2021-03-25T19:25:28+0000");
        let mut page = post("about", "2021-03-25T19:25:28+0000");
        page.doc_type = "page".to_string();

        let cms = MemoryCms::new(vec![
            no_uid,
            bad_uid,
            page,
            post("ok", "2021-03-25T19:25:28+0000"),
        ]);
        let paths = enumerate_paths(&cms, "post", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(paths.paths, vec![PostPath { slug: "ok".to_string() }]);
    }

    #[test]
    fn test_serializes_revalidate_as_seconds() {
        let paths = StaticPaths {
            paths: Vec::new(),
            fallback: true,
            revalidate: Duration::from_secs(1800),
        };
        let json = serde_json::to_value(&paths).unwrap();
        assert_eq!(json["revalidate"], 1800);
    }
}
