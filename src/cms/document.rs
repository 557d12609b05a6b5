//! Raw document shapes as returned by the CMS search API
//!
//! These mirror the JSON the CMS emits and are consumed as-is. Every `data`
//! field is optional because partial `fetch` queries only return the fields
//! that were asked for, and empty key-text fields come back as `null`.

use serde::{Deserialize, Serialize};

use crate::config::DateField;

/// One page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub page: usize,
    pub results_per_page: usize,
    pub results_size: usize,
    pub total_results_size: usize,
    pub total_pages: usize,
    /// Cursor for the following page, `None` once exhausted
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<RawDocument>,
}

/// A single CMS document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: DocumentData,
}

impl RawDocument {
    /// Raw timestamp for the requested publication field
    pub fn publication_date(&self, field: DateField) -> Option<&str> {
        match field {
            DateField::First => self.first_publication_date.as_deref(),
            DateField::Last => self.last_publication_date.as_deref(),
        }
    }
}

/// The `data` object of a post document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<Banner>,
    pub content: Vec<RawSection>,
}

/// Image field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// An entry of the `content` group: a heading and its rich-text body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSection {
    pub heading: Option<String>,
    pub body: Vec<RichTextBlock>,
}

/// A block of structured (rich) text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RichTextBlock {
    /// `paragraph`, `heading1`..`heading6`, `preformatted`, `list-item`,
    /// `o-list-item`, `image` or `embed`
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub spans: Vec<Span>,
    /// Set on `image` blocks
    pub url: Option<String>,
    pub alt: Option<String>,
    /// Set on `embed` blocks
    pub oembed: Option<serde_json::Value>,
}

impl RichTextBlock {
    /// A plain paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Inline formatting over a character range of a block's text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// `strong`, `em` or `hyperlink`
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    pub target: Option<String>,
}
