//! Content module - view models mapped from CMS documents

mod detail;
pub mod richtext;
mod summary;

pub use detail::{reading_time, ContentSection, PostDetail, DEFAULT_WORDS_PER_MINUTE};
pub use summary::{map_documents, PostSummary, SummaryData};
