//! Remote index fetcher with TTL cache, request coalescing, and graceful
//! degradation.
//!
//! [`RemoteIndexFetcher`] owns the single authoritative copy of the remote
//! listing. The copy lives behind an `ArcSwapOption` and is only ever
//! replaced whole, so a reader holds either the old or the new index, never
//! a partial one.
//!
//! # Cache Lifecycle
//!
//! ```text
//!            get_index                 success
//!   Empty ─────────────▶ Refreshing ───────────▶ Fresh
//!     ▲                      │  ▲                  │ ttl elapsed /
//!     │ clear_cache          │  │ get_index        │ invalidate_after_action
//!     │                      │  │                  ▼
//!     └── (any state)        └──┼──── failure ──▶ Stale
//!                               └──────────────────┘
//! ```
//!
//! A failed refresh with nothing cached yields an empty, degraded snapshot
//! and leaves the cache empty. TTL expiry is evaluated lazily on access.
//!
//! # Coalescing
//!
//! The first caller that needs a refresh spawns it on the tokio runtime and
//! stores a [`Shared`] handle to its result. Every concurrent caller awaits a
//! clone of that handle, so N callers cost one listing. The spawned task
//! finishes (or times out) even if every caller stops waiting, and its result
//! is installed for the next access.
//!
//! # Failure Policy
//!
//! | Error | Effect |
//! |-------|--------|
//! | `NotFound` | installs an empty index as fresh |
//! | `RateLimitExceeded` | records zero budget until reset, serves cache |
//! | `Auth` | logged at error, serves cache |
//! | `Network`, `Timeout`, `Decode` | logged at warn, serves cache |

pub mod github;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

pub use github::GitHubListing;

use crate::config::{FetcherSettings, RemoteConfig};
use crate::error::RemoteError;
use crate::models::{ElementType, IndexEntry, RateLimit, RemoteIndex, Source};
use crate::traits::{DisabledListing, RemoteListing, RemoteRecord};

/// How trustworthy a returned snapshot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Within TTL, or just fetched.
    Fresh,
    /// Previously fetched data served past its TTL or after a failed refresh.
    Stale,
    /// Nothing could be fetched and nothing was cached; the index is empty.
    Degraded,
}

/// The result of [`RemoteIndexFetcher::get_index`].
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub index: Arc<RemoteIndex>,
    pub freshness: Freshness,
}

impl IndexSnapshot {
    fn new(index: Arc<RemoteIndex>, freshness: Freshness) -> Self {
        Self { index, freshness }
    }

    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }

    pub fn is_degraded(&self) -> bool {
        self.freshness == Freshness::Degraded
    }

    pub fn total_elements(&self) -> usize {
        self.index.total_elements
    }
}

/// Observable cache state. Never `Stale` without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    NoData,
    Fresh,
    Stale,
}

/// Snapshot of cache health for statistics and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub has_data: bool,
    pub last_fetch: Option<DateTime<Utc>>,
    /// Always `false` when `has_data` is `false`.
    pub stale: bool,
    pub total_elements: usize,
    pub status: CacheStatus,
    pub rate_limit: Option<RateLimit>,
    /// Refresh attempts that reached the network.
    pub fetch_count: u64,
    /// Refreshes skipped by the rate-limit guard.
    pub skipped_refreshes: u64,
    pub last_error: Option<String>,
    pub last_skip_reason: Option<String>,
}

struct CacheSlot {
    index: Arc<RemoteIndex>,
    fetched_at: Instant,
    /// Set by invalidation; forces the next access to refresh.
    expired: bool,
}

impl CacheSlot {
    fn is_stale(&self, ttl: std::time::Duration) -> bool {
        self.expired || self.fetched_at.elapsed() > ttl
    }

    fn expire(&self) -> CacheSlot {
        CacheSlot {
            index: Arc::clone(&self.index),
            fetched_at: self.fetched_at,
            expired: true,
        }
    }
}

#[derive(Default)]
struct FetchLedger {
    rate_limit: Option<RateLimit>,
    fetch_count: u64,
    skipped_refreshes: u64,
    last_error: Option<String>,
    last_skip_reason: Option<String>,
}

type SharedRefresh = Shared<BoxFuture<'static, IndexSnapshot>>;

struct FetcherInner {
    listing: Arc<dyn RemoteListing>,
    settings: FetcherSettings,
    cache: ArcSwapOption<CacheSlot>,
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
    ledger: Mutex<FetchLedger>,
    next_generation: AtomicU64,
    invalidation_epoch: AtomicU64,
}

/// Fetches, caches, and serves the remote index.
///
/// Cheap to clone; clones share one cache. Construct one per application
/// context and hand clones to consumers.
#[derive(Clone)]
pub struct RemoteIndexFetcher {
    inner: Arc<FetcherInner>,
}

impl RemoteIndexFetcher {
    pub fn new(listing: Arc<dyn RemoteListing>, settings: FetcherSettings) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                listing,
                settings,
                cache: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
                ledger: Mutex::new(FetchLedger::default()),
                next_generation: AtomicU64::new(0),
                invalidation_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Build a fetcher from the `[remote]` config section.
    ///
    /// No section means a disabled remote that always reports an empty index.
    pub fn from_config(remote: Option<&RemoteConfig>) -> Result<Self> {
        match remote {
            Some(cfg) => {
                let listing = GitHubListing::new(cfg.clone())?;
                Ok(Self::new(Arc::new(listing), FetcherSettings::from(cfg)))
            }
            None => Ok(Self::new(
                Arc::new(DisabledListing),
                FetcherSettings::default(),
            )),
        }
    }

    pub fn origin(&self) -> &str {
        self.inner.listing.origin()
    }

    pub fn settings(&self) -> &FetcherSettings {
        &self.inner.settings
    }

    /// Return the remote index, refreshing it when needed.
    ///
    /// A fresh cache is returned without touching the network unless
    /// `force_refresh` is set. Otherwise the call joins (or starts) the
    /// single in-flight refresh. Never fails: remote problems surface as a
    /// [`Freshness::Stale`] or [`Freshness::Degraded`] snapshot.
    pub async fn get_index(&self, force_refresh: bool) -> IndexSnapshot {
        if !force_refresh {
            if let Some(slot) = self.inner.cache.load_full() {
                if !slot.is_stale(self.inner.settings.ttl) {
                    return IndexSnapshot::new(Arc::clone(&slot.index), Freshness::Fresh);
                }
            }
        }

        self.inner.refresh_handle().await
    }

    /// The cached index, if any. Never refreshes.
    pub fn cached_index(&self) -> Option<Arc<RemoteIndex>> {
        self.inner
            .cache
            .load_full()
            .map(|slot| Arc::clone(&slot.index))
    }

    /// Drop the cached index. The next access fetches from scratch.
    ///
    /// Known rate-limit budget is kept so a cleared cache cannot bypass the
    /// guard.
    pub fn clear_cache(&self) {
        self.inner.cache.store(None);
        self.inner.ledger.lock().last_error = None;
        tracing::info!(origin = %self.origin(), "remote index cache cleared");
    }

    /// Mark cached data expired after an action that changed the remote.
    ///
    /// Data is kept and still served to readers that already hold it; the
    /// next [`get_index`](Self::get_index) attempts a refresh. Any action name
    /// is accepted.
    pub fn invalidate_after_action(&self, action: &str) {
        self.inner.invalidation_epoch.fetch_add(1, Ordering::SeqCst);
        let previous = self
            .inner
            .cache
            .rcu(|current| current.as_ref().map(|slot| Arc::new(slot.expire())));
        if previous.is_some() {
            tracing::info!(action, origin = %self.origin(), "remote index marked stale");
        } else {
            tracing::debug!(action, "invalidation with empty cache, nothing to expire");
        }
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let cached = self.inner.cache.load_full();
        let ledger = self.inner.ledger.lock();

        let (has_data, last_fetch, stale, total_elements) = match &cached {
            Some(slot) => (
                true,
                Some(slot.index.fetched_at),
                slot.is_stale(self.inner.settings.ttl),
                slot.index.total_elements,
            ),
            None => (false, None, false, 0),
        };
        let status = match (has_data, stale) {
            (false, _) => CacheStatus::NoData,
            (true, false) => CacheStatus::Fresh,
            (true, true) => CacheStatus::Stale,
        };

        CacheStats {
            has_data,
            last_fetch,
            stale,
            total_elements,
            status,
            rate_limit: ledger.rate_limit,
            fetch_count: ledger.fetch_count,
            skipped_refreshes: ledger.skipped_refreshes,
            last_error: ledger.last_error.clone(),
            last_skip_reason: ledger.last_skip_reason.clone(),
        }
    }
}

impl FetcherInner {
    /// Join the in-flight refresh, or start one.
    ///
    /// The in-flight lock is held across spawn and store so the task cannot
    /// clear its slot before it has been published.
    fn refresh_handle(self: &Arc<Self>) -> SharedRefresh {
        let mut in_flight = self.in_flight.lock();
        if let Some((_, pending)) = in_flight.as_ref() {
            tracing::debug!(origin = %self.listing.origin(), "joining in-flight refresh");
            return pending.clone();
        }

        if let Some(reason) = self.rate_limit_guard() {
            tracing::warn!(origin = %self.listing.origin(), %reason, "skipping remote refresh");
            {
                let mut ledger = self.ledger.lock();
                ledger.skipped_refreshes += 1;
                ledger.last_skip_reason = Some(reason);
            }
            return futures::future::ready(self.fallback()).boxed().shared();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let task = tokio::spawn(Arc::clone(self).run_refresh(generation));
        let inner = Arc::clone(self);
        let shared = async move {
            match task.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(error = %e, "remote refresh task aborted");
                    inner.finish(generation);
                    inner.fallback()
                }
            }
        }
        .boxed()
        .shared();

        *in_flight = Some((generation, shared.clone()));
        shared
    }

    /// Returns why a refresh should be skipped, if the known budget is too low.
    ///
    /// An exhausted budget blocks until reset even with a zero threshold.
    fn rate_limit_guard(&self) -> Option<String> {
        let rate_limit = self.ledger.lock().rate_limit?;
        if rate_limit.remaining > 0 && rate_limit.remaining >= self.settings.rate_limit_threshold {
            return None;
        }
        if Utc::now() >= rate_limit.reset_at {
            return None;
        }
        let reset = rate_limit.reset_at.format("%Y-%m-%dT%H:%M:%SZ");
        if rate_limit.remaining == 0 {
            return Some(format!("rate limit exhausted until {}", reset));
        }
        Some(format!(
            "rate limit budget {} below threshold {} until {}",
            rate_limit.remaining, self.settings.rate_limit_threshold, reset
        ))
    }

    async fn run_refresh(self: Arc<Self>, generation: u64) -> IndexSnapshot {
        let epoch = self.invalidation_epoch.load(Ordering::SeqCst);
        self.ledger.lock().fetch_count += 1;

        let timeout = self.settings.timeout;
        let result = match tokio::time::timeout(timeout, self.fetch_all()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(timeout)),
        };

        let snapshot = match result {
            Ok(index) => self.install(index, epoch),
            Err(RemoteError::NotFound) => {
                tracing::info!(origin = %self.listing.origin(), "remote listing not found, treating as empty");
                self.install(RemoteIndex::empty(self.listing.origin()), epoch)
            }
            Err(e) => self.absorb_failure(e),
        };

        self.finish(generation);
        snapshot
    }

    /// Walk every page of the listing and build a complete index.
    async fn fetch_all(&self) -> Result<RemoteIndex, RemoteError> {
        let mut records = Vec::new();
        let mut rate_limit = None;
        let mut cursor: Option<String> = None;

        for _ in 0..self.settings.max_pages {
            let page = self.listing.fetch_page(cursor.as_deref()).await?;
            if page.rate_limit.is_some() {
                rate_limit = page.rate_limit;
            }
            records.extend(page.records);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        if cursor.is_some() {
            tracing::warn!(
                origin = %self.listing.origin(),
                max_pages = self.settings.max_pages,
                "remote listing truncated at page limit"
            );
        }

        let fetched_at = Utc::now();
        let entries = records
            .into_iter()
            .filter_map(|r| record_to_entry(r, fetched_at))
            .collect();
        Ok(RemoteIndex::from_entries(
            self.listing.origin(),
            fetched_at,
            entries,
            rate_limit,
        ))
    }

    fn install(&self, index: RemoteIndex, epoch_at_start: u64) -> IndexSnapshot {
        {
            let mut ledger = self.ledger.lock();
            if index.rate_limit.is_some() {
                ledger.rate_limit = index.rate_limit;
            }
            ledger.last_error = None;
        }

        let total = index.total_elements;
        let index = Arc::new(index);
        let fetched_at = Instant::now();
        self.cache.rcu(|_| {
            // An invalidation that raced this fetch leaves the result expired.
            let expired = self.invalidation_epoch.load(Ordering::SeqCst) != epoch_at_start;
            Some(Arc::new(CacheSlot {
                index: Arc::clone(&index),
                fetched_at,
                expired,
            }))
        });

        tracing::info!(origin = %self.listing.origin(), total, "remote index refreshed");
        IndexSnapshot::new(index, Freshness::Fresh)
    }

    fn absorb_failure(&self, err: RemoteError) -> IndexSnapshot {
        let origin = self.listing.origin();
        match &err {
            RemoteError::Auth(_) => {
                tracing::error!(%origin, error = %err, "remote authentication failed, serving cached data");
            }
            RemoteError::RateLimitExceeded { reset_at } => {
                tracing::warn!(%origin, %reset_at, "remote rate limit exceeded, serving cached data");
                self.ledger.lock().rate_limit = Some(RateLimit {
                    remaining: 0,
                    reset_at: *reset_at,
                });
            }
            _ => {
                tracing::warn!(%origin, error = %err, "remote refresh failed, serving cached data");
            }
        }
        self.ledger.lock().last_error = Some(err.to_string());
        self.fallback()
    }

    /// Prior data flagged stale, or an empty degraded index.
    fn fallback(&self) -> IndexSnapshot {
        match self.cache.load_full() {
            Some(slot) => IndexSnapshot::new(Arc::clone(&slot.index), Freshness::Stale),
            None => IndexSnapshot::new(
                Arc::new(RemoteIndex::empty(self.listing.origin())),
                Freshness::Degraded,
            ),
        }
    }

    fn finish(&self, generation: u64) {
        let mut in_flight = self.in_flight.lock();
        if matches!(in_flight.as_ref(), Some((g, _)) if *g == generation) {
            *in_flight = None;
        }
    }
}

/// Map a listing record to an entry. The type comes from the first path
/// segment; records outside a known type directory are dropped.
fn record_to_entry(record: RemoteRecord, fetched_at: DateTime<Utc>) -> Option<IndexEntry> {
    let dir = record.path.split('/').next().unwrap_or_default();
    let Some(element_type) = ElementType::from_dir_name(dir) else {
        tracing::debug!(path = %record.path, "skipping remote record outside element directories");
        return None;
    };
    if record.name.trim().is_empty() {
        tracing::warn!(path = %record.path, "skipping remote record without a name");
        return None;
    }

    let mut entry = IndexEntry::new(
        element_type,
        record.name.trim(),
        record.description.unwrap_or_default(),
        Source::Remote,
        record.last_modified.unwrap_or(fetched_at),
    );
    entry.remote_url = record.url;
    entry.content_hash = record.sha;
    Some(entry)
}
