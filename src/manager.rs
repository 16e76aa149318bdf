//! Unified view over the local and remote stores.
//!
//! [`UnifiedIndexManager`] is the only type callers need. It rescans the
//! local store on every call, asks the [`RemoteIndexFetcher`] for its current
//! snapshot, and merges the two. Remote trouble never surfaces as an error
//! here; it shows up as a stale or degraded [`Freshness`] and, at worst, an
//! empty remote half.
//!
//! Local scans walk the filesystem, so they run on tokio's blocking pool
//! rather than on the async worker threads.
//!
//! # Identity
//!
//! An element is identified by `(type, normalized name)`. The same element
//! may exist in both stores: lookups return the local copy first, detailed
//! listings return both, and statistics count it once.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::config::{Config, SearchConfig};
use crate::error::IndexError;
use crate::local::LocalIndexStore;
use crate::models::{normalize_name, ElementType, IndexEntry, RemoteIndex, SearchResult};
use crate::remote::{CacheStats, Freshness, RemoteIndexFetcher};
use crate::search::{rank, RankParams};

/// Options for [`UnifiedIndexManager::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum results. Defaults to `search.max_results` from config.
    pub max_results: Option<usize>,
    /// Only consider elements of this type.
    pub element_type: Option<ElementType>,
    /// Enable fuzzy name matching.
    pub fuzzy_match: bool,
}

/// Search results plus the freshness of the remote half they were drawn from.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub remote: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalStats {
    pub total_elements: usize,
    pub by_type: BTreeMap<ElementType, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedStats {
    /// Local count plus remote count.
    pub total_elements: usize,
    /// Distinct `(type, normalized name)` pairs across both stores.
    pub unique_elements: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub local: LocalStats,
    pub remote: CacheStats,
    pub combined: CombinedStats,
}

pub struct UnifiedIndexManager {
    local: Arc<LocalIndexStore>,
    remote: RemoteIndexFetcher,
    search: SearchConfig,
}

impl UnifiedIndexManager {
    pub fn new(local: LocalIndexStore, remote: RemoteIndexFetcher, search: SearchConfig) -> Self {
        Self {
            local: Arc::new(local),
            remote,
            search,
        }
    }

    /// Build the local store and remote fetcher described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let local = LocalIndexStore::new(config.local.clone())?;
        let remote = RemoteIndexFetcher::from_config(config.remote.as_ref())?;
        Ok(Self::new(local, remote, config.search.clone()))
    }

    pub fn local(&self) -> &LocalIndexStore {
        &self.local
    }

    pub fn remote(&self) -> &RemoteIndexFetcher {
        &self.remote
    }

    /// Ranked search across both stores.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidArgument`] for a blank or over-long query, or a
    /// `max_results` of zero.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, IndexError> {
        Ok(self.search_with_freshness(query, options).await?.results)
    }

    /// Like [`search`](Self::search), also reporting remote freshness.
    pub async fn search_with_freshness(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<SearchOutcome, IndexError> {
        let query = normalize_name(query);
        if query.is_empty() {
            return Err(IndexError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        if query.chars().count() > self.search.max_query_len {
            return Err(IndexError::InvalidArgument(format!(
                "query exceeds {} characters",
                self.search.max_query_len
            )));
        }
        let max_results = options.max_results.unwrap_or(self.search.max_results);
        if max_results == 0 {
            return Err(IndexError::InvalidArgument(
                "max_results must be >= 1".to_string(),
            ));
        }

        let local = self.scan_local(options.element_type).await;
        let snapshot = self.remote.get_index(false).await;
        if snapshot.freshness != Freshness::Fresh {
            tracing::debug!(freshness = ?snapshot.freshness, "searching with non-fresh remote index");
        }

        let params = RankParams {
            max_results,
            min_score: self.search.min_score,
            fuzzy_threshold: options
                .fuzzy_match
                .then_some(self.search.fuzzy_threshold),
        };
        let remote_entries = remote_entries(&snapshot.index, options.element_type);
        let results = rank(&query, local.iter().chain(remote_entries), &params);

        Ok(SearchOutcome {
            results,
            remote: snapshot.freshness,
        })
    }

    /// Exact, case-insensitive name lookup. Local entries win over remote.
    pub async fn find_by_name(&self, name: &str) -> Option<IndexEntry> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return None;
        }

        if let Some(found) = self
            .scan_local(None)
            .await
            .into_iter()
            .find(|e| e.normalized_name() == wanted)
        {
            return Some(found);
        }

        let snapshot = self.remote.get_index(false).await;
        let found = snapshot
            .index
            .entries()
            .find(|e| e.normalized_name() == wanted)
            .cloned();
        found
    }

    /// Local then remote entries of one type.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidArgument`] if `element_type` is not a known type.
    pub async fn get_elements_by_type(
        &self,
        element_type: &str,
    ) -> Result<Vec<IndexEntry>, IndexError> {
        let element_type: ElementType = element_type.parse()?;
        let mut entries = self.scan_local(Some(element_type)).await;
        let snapshot = self.remote.get_index(false).await;
        entries.extend(snapshot.index.entries_of(element_type).iter().cloned());
        Ok(entries)
    }

    /// Aggregate statistics. Reads the remote cache as-is; never fetches.
    pub async fn get_stats(&self) -> IndexStats {
        let local = self.scan_local(None).await;
        let remote_stats = self.remote.get_cache_stats();
        let remote_index = self.remote.cached_index();

        let mut by_type: BTreeMap<ElementType, usize> = BTreeMap::new();
        for entry in &local {
            *by_type.entry(entry.element_type).or_default() += 1;
        }

        let remote_count = remote_index.as_ref().map_or(0, |i| i.total_elements);
        let unique: HashSet<&str> = local
            .iter()
            .map(|e| e.key.as_str())
            .chain(
                remote_index
                    .iter()
                    .flat_map(|i| i.entries())
                    .map(|e| e.key.as_str()),
            )
            .collect();

        IndexStats {
            combined: CombinedStats {
                total_elements: local.len() + remote_count,
                unique_elements: unique.len(),
            },
            local: LocalStats {
                total_elements: local.len(),
                by_type,
            },
            remote: remote_stats,
        }
    }

    /// Mark the remote cache stale after `action`. Local data is always live.
    pub fn invalidate_after_action(&self, action: &str) {
        self.remote.invalidate_after_action(action);
    }

    /// Force a remote refresh and report how it went.
    pub async fn refresh(&self) -> Freshness {
        self.remote.get_index(true).await.freshness
    }

    /// Rescan the local store on the blocking pool.
    async fn scan_local(&self, element_type: Option<ElementType>) -> Vec<IndexEntry> {
        let local = Arc::clone(&self.local);
        let scan = tokio::task::spawn_blocking(move || match element_type {
            Some(t) => local.list_by_type(t),
            None => local.list(),
        });
        match scan.await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "local scan task failed");
                Vec::new()
            }
        }
    }
}

fn remote_entries(
    index: &Arc<RemoteIndex>,
    element_type: Option<ElementType>,
) -> Box<dyn Iterator<Item = &IndexEntry> + '_> {
    match element_type {
        Some(t) => Box::new(index.entries_of(t).iter()),
        None => Box::new(index.entries()),
    }
}
