//! Incremental "load more" pagination

use std::fmt;

use super::PaginationState;
use crate::cms::CmsClient;
use crate::config::DateField;
use crate::content::{map_documents, PostSummary};
use crate::error::Result;
use crate::helpers::DateFormatter;

/// Where the controller is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A cursor is available and nothing is in flight
    Idle,
    Fetching,
    /// No cursor left; terminal
    Exhausted,
}

/// Status of the most recent load, as shown to the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Outcome of a `load_more` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// This many summaries were appended
    Appended(usize),
    Skipped(Skip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Exhausted,
    InFlight,
}

/// Drives the listing's "load more posts" action
pub struct PaginationController {
    state: PaginationState,
    phase: Phase,
    status: LoadState,
    formatter: DateFormatter,
    date_field: DateField,
}

impl fmt::Debug for PaginationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationController")
            .field("results", &self.state.results.len())
            .field("next_page", &self.state.next_page)
            .field("phase", &self.phase)
            .field("status", &self.status)
            .finish()
    }
}

impl PaginationController {
    /// Start from the build-time page
    pub fn new(state: PaginationState, formatter: DateFormatter, date_field: DateField) -> Self {
        let phase = if state.next_page.is_some() {
            Phase::Idle
        } else {
            Phase::Exhausted
        };

        Self {
            state,
            phase,
            status: LoadState::Idle,
            formatter,
            date_field,
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn into_state(self) -> PaginationState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &LoadState {
        &self.status
    }

    /// Whether the "load more" control should be shown
    pub fn has_more(&self) -> bool {
        self.phase != Phase::Exhausted
    }

    /// Whether the "load more" control should accept clicks
    pub fn can_trigger(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Enter `Fetching` and hand out the cursor to fetch
    ///
    /// Returns `Err(skip)` when exhausted or already fetching; nothing
    /// changes in that case.
    pub fn begin_fetch(&mut self) -> std::result::Result<String, Skip> {
        match (self.phase, self.state.next_page.as_ref()) {
            (Phase::Fetching, _) => Err(Skip::InFlight),
            (Phase::Exhausted, _) | (Phase::Idle, None) => {
                self.phase = Phase::Exhausted;
                Err(Skip::Exhausted)
            }
            (Phase::Idle, Some(cursor)) => {
                let cursor = cursor.clone();
                self.phase = Phase::Fetching;
                self.status = LoadState::Loading;
                Ok(cursor)
            }
        }
    }

    /// Append a fetched page and move to its cursor
    pub fn complete_fetch(
        &mut self,
        results: Vec<PostSummary>,
        next_page: Option<String>,
    ) -> usize {
        let appended = results.len();
        self.state.results.extend(results);
        self.state.next_page = next_page;
        self.phase = if self.state.next_page.is_some() {
            Phase::Idle
        } else {
            Phase::Exhausted
        };
        self.status = LoadState::Loaded;
        appended
    }

    /// Give up on the in-flight fetch, keeping results and cursor as they were
    pub fn fail_fetch(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Loading more posts failed: {}", reason);
        self.phase = if self.state.next_page.is_some() {
            Phase::Idle
        } else {
            Phase::Exhausted
        };
        self.status = LoadState::Failed(reason);
    }

    /// Fetch the next page from `cms` and append it
    ///
    /// On failure nothing but the status changes, so calling again retries
    /// the same cursor.
    pub async fn load_more(&mut self, cms: &dyn CmsClient) -> Result<LoadMore> {
        let cursor = match self.begin_fetch() {
            Ok(cursor) => cursor,
            Err(skip) => return Ok(LoadMore::Skipped(skip)),
        };

        let fetched = match cms.fetch_page(&cursor).await {
            Ok(page) => map_documents(&page.results, &self.formatter, self.date_field)
                .map(|results| (results, page.next_page)),
            Err(e) => Err(e),
        };

        match fetched {
            Ok((results, next_page)) => {
                let appended = self.complete_fetch(results, next_page);
                tracing::debug!(
                    "Appended {} posts, {} total, more: {}",
                    appended,
                    self.state.results.len(),
                    self.has_more()
                );
                Ok(LoadMore::Appended(appended))
            }
            Err(e) => {
                self.fail_fetch(e.to_string());
                Err(e)
            }
        }
    }

    /// Keep loading until the cursor runs out
    pub async fn drain(&mut self, cms: &dyn CmsClient) -> Result<()> {
        while let LoadMore::Appended(_) = self.load_more(cms).await? {}
        Ok(())
    }
}
