//! Post summaries shown on the listing page

use serde::{Deserialize, Serialize};

use crate::cms::RawDocument;
use crate::config::DateField;
use crate::error::{BlogError, Result};
use crate::helpers::{is_safe_uid, DateFormatter};

/// A post as listed on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    /// Display-ready publication date (`25 mar 2021`)
    pub first_publication_date: String,
    pub data: SummaryData,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Map a raw CMS document, formatting the chosen publication date
    ///
    /// Every page of the listing must be mapped with the same `field`.
    pub fn from_document(
        doc: &RawDocument,
        formatter: &DateFormatter,
        field: DateField,
    ) -> Result<Self> {
        let uid = doc
            .uid
            .clone()
            .ok_or_else(|| BlogError::Cms(format!("document {} has no uid", doc.id)))?;
        let date = formatter.format_field(field.as_str(), doc.publication_date(field))?;

        Ok(Self {
            uid,
            first_publication_date: date,
            data: SummaryData {
                title: doc.data.title.clone().unwrap_or_default(),
                subtitle: doc.data.subtitle.clone().unwrap_or_default(),
                author: doc.data.author.clone().unwrap_or_default(),
            },
        })
    }
}

/// Map a whole page of documents, failing on the first bad date
///
/// Documents without a usable UID are skipped, as they are when
/// enumerating post paths, so every card links to a servable page.
pub fn map_documents(
    docs: &[RawDocument],
    formatter: &DateFormatter,
    field: DateField,
) -> Result<Vec<PostSummary>> {
    docs.iter()
        .filter(|doc| match doc.uid.as_deref() {
            Some(uid) if is_safe_uid(uid) => true,
            Some(uid) => {
                tracing::warn!("Not listing document {} with unusable uid {:?}", doc.id, uid);
                false
            }
            None => {
                tracing::warn!("Not listing document {} without uid", doc.id);
                false
            }
        })
        .map(|doc| PostSummary::from_document(doc, formatter, field))
        .collect()
}
