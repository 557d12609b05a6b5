//! Headless CMS access: document shapes, queries and clients

mod client;
mod document;
mod memory;
mod query;

pub use client::{CmsClient, PrismicClient};
pub use document::{
    Banner, DocumentData, QueryResponse, RawDocument, RawSection, RichTextBlock, Span, SpanData,
};
pub use memory::MemoryCms;
pub use query::{Predicate, Query};

#[cfg(test)]
pub(crate) use memory::fixtures;
