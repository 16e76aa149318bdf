//! Unified index behavior over a temp local portfolio and a scripted remote.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fetcher, record, write_element, Mode, ScriptedListing};
use portfolio_index::config::{LocalConfig, SearchConfig};
use portfolio_index::error::{IndexError, RemoteError};
use portfolio_index::invalidation::InvalidationChannel;
use portfolio_index::local::LocalIndexStore;
use portfolio_index::manager::{SearchOptions, UnifiedIndexManager};
use portfolio_index::models::{ElementType, MatchType, Source};
use portfolio_index::remote::{CacheStatus, Freshness};
use tempfile::TempDir;

struct Harness {
    _root: TempDir,
    listing: Arc<ScriptedListing>,
    manager: UnifiedIndexManager,
}

/// Local: persona Alice, skill Code Review.
/// Remote: persona alice-helper, persona alice, template weekly-report.
fn harness() -> Harness {
    let root = TempDir::new().unwrap();
    write_element(root.path(), "personas", "alice.md", "Alice", "A friendly assistant");
    write_element(
        root.path(),
        "skills",
        "code-review.md",
        "Code Review",
        "Reviews pull requests for style",
    );

    let listing = ScriptedListing::new(vec![
        record("personas/alice-helper.md"),
        record("personas/alice.md"),
        record("templates/weekly-report.md"),
    ]);
    let local = LocalIndexStore::new(LocalConfig::new(root.path())).unwrap();
    let manager = UnifiedIndexManager::new(local, fetcher(&listing, 3600), SearchConfig::default());

    Harness {
        _root: root,
        listing,
        manager,
    }
}

#[tokio::test]
async fn test_exact_local_match_ranks_above_remote_prefix() {
    let root = TempDir::new().unwrap();
    write_element(root.path(), "personas", "alice.md", "Alice", "A friendly assistant");
    let listing = ScriptedListing::new(vec![record("personas/alice-helper.md")]);
    let local = LocalIndexStore::new(LocalConfig::new(root.path())).unwrap();
    let manager = UnifiedIndexManager::new(local, fetcher(&listing, 3600), SearchConfig::default());

    let results = manager
        .search("alice", SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entry.name, "Alice");
    assert_eq!(results[0].entry.source, Source::Local);
    assert_eq!(results[0].match_type, MatchType::Exact);
    assert_eq!(results[0].score, 1.0);
    assert_eq!(results[1].entry.name, "alice-helper");
    assert_eq!(results[1].entry.source, Source::Remote);
    assert_eq!(results[1].match_type, MatchType::Prefix);
    assert_eq!(results[1].score, 0.8);
}

#[tokio::test]
async fn test_equal_scores_put_local_first() {
    let h = harness();
    let results = h
        .manager
        .search("ALICE", SearchOptions::default())
        .await
        .unwrap();

    let exact: Vec<_> = results
        .iter()
        .filter(|r| r.match_type == MatchType::Exact)
        .map(|r| r.entry.source)
        .collect();
    assert_eq!(exact, vec![Source::Local, Source::Remote]);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_search_filters_by_type_and_limit() {
    let h = harness();
    let results = h
        .manager
        .search(
            "re",
            SearchOptions {
                element_type: Some(ElementType::Template),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .all(|r| r.entry.element_type == ElementType::Template));

    let limited = h
        .manager
        .search(
            "alice",
            SearchOptions {
                max_results: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_description_match_scores_lowest_tier() {
    let h = harness();
    let results = h
        .manager
        .search("pull requests", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.name, "Code Review");
    assert_eq!(results[0].match_type, MatchType::Description);
    assert_eq!(results[0].score, 0.3);
}

#[tokio::test]
async fn test_type_word_does_not_match_descriptions() {
    let h = harness();
    write_element(h._root.path(), "personas", "bob.md", "Bob", "Builder");

    let by_type = h
        .manager
        .search("persona", SearchOptions::default())
        .await
        .unwrap();
    assert!(by_type.is_empty());

    let across_fields = h
        .manager
        .search("alice a friendly", SearchOptions::default())
        .await
        .unwrap();
    assert!(across_fields.is_empty());
}

#[tokio::test]
async fn test_fuzzy_match_is_opt_in() {
    let h = harness();
    let strict = h
        .manager
        .search("alise", SearchOptions::default())
        .await
        .unwrap();
    assert!(strict.is_empty());

    let fuzzy = h
        .manager
        .search(
            "alise",
            SearchOptions {
                fuzzy_match: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!fuzzy.is_empty());
    assert!(fuzzy.iter().all(|r| r.match_type == MatchType::Fuzzy));
    assert!(fuzzy.iter().all(|r| r.score > 0.0 && r.score <= 0.5));
}

#[tokio::test]
async fn test_invalid_search_arguments_are_rejected() {
    let h = harness();

    let blank = h.manager.search("   ", SearchOptions::default()).await;
    assert!(matches!(blank, Err(IndexError::InvalidArgument(_))));

    let zero = h
        .manager
        .search(
            "alice",
            SearchOptions {
                max_results: Some(0),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(zero, Err(IndexError::InvalidArgument(_))));

    let long = "x".repeat(SearchConfig::default().max_query_len + 1);
    let too_long = h.manager.search(&long, SearchOptions::default()).await;
    assert!(matches!(too_long, Err(IndexError::InvalidArgument(_))));

    assert_eq!(h.listing.listings(), 0);
}

#[tokio::test]
async fn test_search_survives_remote_failure() {
    let h = harness();
    h.listing
        .set_mode(Mode::Fail(RemoteError::Network("dns failure".into())));

    let outcome = h
        .manager
        .search_with_freshness("alice", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.remote, Freshness::Degraded);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].entry.source, Source::Local);
}

#[tokio::test]
async fn test_find_by_name_prefers_local() {
    let h = harness();

    let found = h.manager.find_by_name("alice").await.unwrap();
    assert_eq!(found.source, Source::Local);
    assert_eq!(found.name, "Alice");
    assert!(found.local_path.is_some());
    assert!(found.content_hash.is_some());
}

#[tokio::test]
async fn test_find_by_name_falls_back_to_remote() {
    let h = harness();

    let found = h.manager.find_by_name("Weekly-Report").await.unwrap();
    assert_eq!(found.source, Source::Remote);
    assert_eq!(found.element_type, ElementType::Template);
    assert!(found.remote_url.is_some());

    assert!(h.manager.find_by_name("nobody").await.is_none());
    assert!(h.manager.find_by_name("").await.is_none());
}

#[tokio::test]
async fn test_elements_by_type_lists_local_then_remote() {
    let h = harness();

    let personas = h.manager.get_elements_by_type("personas").await.unwrap();
    let sources: Vec<_> = personas.iter().map(|e| e.source).collect();
    assert_eq!(sources, vec![Source::Local, Source::Remote, Source::Remote]);
    assert!(personas
        .iter()
        .all(|e| e.element_type == ElementType::Persona));

    let skills = h.manager.get_elements_by_type("Skill").await.unwrap();
    assert_eq!(skills.len(), 1);

    let agents = h.manager.get_elements_by_type("agent").await.unwrap();
    assert!(agents.is_empty());
}

#[tokio::test]
async fn test_unknown_type_is_invalid_argument() {
    let h = harness();
    let err = h.manager.get_elements_by_type("widgets").await.unwrap_err();
    assert!(matches!(err, IndexError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_stats_before_any_fetch_report_no_remote_data() {
    let h = harness();
    let stats = h.manager.get_stats().await;

    assert_eq!(stats.local.total_elements, 2);
    assert_eq!(stats.local.by_type.get(&ElementType::Persona), Some(&1));
    assert_eq!(stats.remote.status, CacheStatus::NoData);
    assert!(!stats.remote.stale);
    assert_eq!(stats.combined.total_elements, 2);
    assert_eq!(h.listing.listings(), 0);
}

#[tokio::test]
async fn test_stats_count_shared_elements_once() {
    let h = harness();
    h.manager.refresh().await;

    let stats = h.manager.get_stats().await;
    assert_eq!(stats.remote.total_elements, 3);
    assert_eq!(stats.combined.total_elements, 5);
    // "Alice" exists in both stores.
    assert_eq!(stats.combined.unique_elements, 4);
}

#[tokio::test]
async fn test_missing_local_root_yields_remote_only() {
    let root = TempDir::new().unwrap();
    let listing = ScriptedListing::new(vec![record("personas/alice-helper.md")]);
    let local = LocalIndexStore::new(LocalConfig::new(root.path().join("missing"))).unwrap();
    let manager = UnifiedIndexManager::new(local, fetcher(&listing, 3600), SearchConfig::default());

    let results = manager
        .search("alice", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.source, Source::Remote);
}

#[tokio::test]
async fn test_local_changes_are_visible_without_refresh() {
    let h = harness();
    assert!(h.manager.find_by_name("Bob").await.is_none());

    write_element(h._root.path(), "personas", "bob.md", "Bob", "New persona");
    let found = h.manager.find_by_name("bob").await.unwrap();
    assert_eq!(found.source, Source::Local);
}

#[tokio::test]
async fn test_invalidation_channel_triggers_refetch() {
    let h = harness();
    let channel = InvalidationChannel::new(h.manager.remote().clone());

    h.manager.search("alice", SearchOptions::default()).await.unwrap();
    h.manager.search("alice", SearchOptions::default()).await.unwrap();
    assert_eq!(h.listing.listings(), 1);

    h.listing.set_records(vec![
        record("personas/alice-helper.md"),
        record("personas/alice.md"),
        record("templates/weekly-report.md"),
        record("agents/alice-bot.md"),
    ]);
    channel.notify("submit_content");
    assert_eq!(h.manager.get_stats().await.remote.status, CacheStatus::Stale);

    let results = h
        .manager
        .search("alice", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(h.listing.listings(), 2);
    assert!(results.iter().any(|r| r.entry.name == "alice-bot"));
}

#[tokio::test]
async fn test_refresh_reports_freshness() {
    let h = harness();
    assert_eq!(h.manager.refresh().await, Freshness::Fresh);

    h.listing
        .set_mode(Mode::Fail(RemoteError::Timeout(Duration::from_secs(5))));
    assert_eq!(h.manager.refresh().await, Freshness::Stale);

    h.manager.invalidate_after_action("delete_element");
    assert!(h.manager.get_stats().await.remote.stale);
}
