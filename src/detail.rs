//! Detail flow: fetch one post by UID and decide what the page shows

use crate::cms::CmsClient;
use crate::content::PostDetail;
use crate::error::BlogError;

/// What a post page renders
#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    /// Data not available yet; show the placeholder
    Loading,
    Ready(PostDetail),
    NotFound(String),
    Failed(String),
}

impl DetailView {
    /// Wrap a mapped post, falling back to `Loading` until it has a date
    pub fn from_post(post: PostDetail) -> Self {
        if post.first_publication_date.is_none() {
            tracing::debug!("Post {} has no publication date yet", post.uid);
            DetailView::Loading
        } else {
            DetailView::Ready(post)
        }
    }

    /// The post, if it can be rendered in full
    pub fn post(&self) -> Option<&PostDetail> {
        match self {
            DetailView::Ready(post) => Some(post),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DetailView::Loading)
    }
}

/// Fetch `uid` and map it, turning every failure into a view state
pub async fn load_post(cms: &dyn CmsClient, doc_type: &str, uid: &str) -> DetailView {
    let doc = match cms.get_by_uid(doc_type, uid).await {
        Ok(doc) => doc,
        Err(BlogError::NotFound { .. }) => {
            tracing::info!("Post {} not found", uid);
            return DetailView::NotFound(uid.to_string());
        }
        Err(e) => {
            tracing::warn!("Fetching post {} failed: {}", uid, e);
            return DetailView::Failed(e.to_string());
        }
    };

    match PostDetail::from_document(&doc) {
        Ok(post) => DetailView::from_post(post),
        Err(e) => {
            tracing::warn!("Mapping post {} failed: {}", uid, e);
            DetailView::Failed(e.to_string())
        }
    }
}
