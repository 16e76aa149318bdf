//! Extension trait for remote listing backends.
//!
//! The remote fetcher never talks HTTP directly. It drives a
//! [`RemoteListing`] one page at a time, which keeps pagination, caching,
//! and failure handling in one place and lets tests substitute a scripted
//! backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │          RemoteIndexFetcher              │
//! │   cache · coalescing · rate-limit guard  │
//! └──────────────┬───────────────────────────┘
//!                ▼ fetch_page(cursor)
//! ┌──────────────────────────────────────────┐
//! │            dyn RemoteListing             │
//! │  ┌─────────────┐   ┌─────────────────┐   │
//! │  │GitHubListing│   │ DisabledListing │   │
//! │  └─────────────┘   └─────────────────┘   │
//! └──────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RemoteError;
use crate::models::RateLimit;

/// A raw record from the remote listing, before it becomes an index entry.
#[derive(Debug, Clone)]
pub struct RemoteRecord {
    /// Repository-relative path, e.g. `personas/alice-helper.md`.
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub sha: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a remote listing.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub records: Vec<RemoteRecord>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
    /// Rate-limit budget reported alongside this page, if any.
    pub rate_limit: Option<RateLimit>,
}

/// A paginated remote listing API.
///
/// Implementations map transport failures onto [`RemoteError`] variants;
/// they must not retry internally, since the fetcher owns retry policy
/// through its cache.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use portfolio_index::error::RemoteError;
/// use portfolio_index::traits::{ListingPage, RemoteListing};
///
/// pub struct EmptyListing;
///
/// #[async_trait]
/// impl RemoteListing for EmptyListing {
///     fn origin(&self) -> &str { "acme/empty" }
///
///     async fn fetch_page(&self, _cursor: Option<&str>) -> Result<ListingPage, RemoteError> {
///         Ok(ListingPage::default())
///     }
/// }
/// ```
#[async_trait]
pub trait RemoteListing: Send + Sync {
    /// The `owner/repository` this listing reads from.
    fn origin(&self) -> &str;

    /// Fetch one page. `cursor` is `None` for the first page.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage, RemoteError>;
}

/// Listing used when no remote is configured.
///
/// Always reports [`RemoteError::NotFound`], which the fetcher treats as a
/// legitimately empty remote.
pub struct DisabledListing;

#[async_trait]
impl RemoteListing for DisabledListing {
    fn origin(&self) -> &str {
        "disabled"
    }

    async fn fetch_page(&self, _cursor: Option<&str>) -> Result<ListingPage, RemoteError> {
        Err(RemoteError::NotFound)
    }
}
