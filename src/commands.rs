//! CLI command runners.
//!
//! Each `run_*` function drives one `pidx` subcommand against a
//! [`UnifiedIndexManager`] and prints either a human-readable listing or
//! JSON (`--json`).

use anyhow::Result;
use serde::Serialize;

use crate::manager::{SearchOptions, UnifiedIndexManager};
use crate::models::{ElementType, IndexEntry};
use crate::remote::Freshness;
use crate::stats::print_stats;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn freshness_note(freshness: Freshness) -> Option<&'static str> {
    match freshness {
        Freshness::Fresh => None,
        Freshness::Stale => Some("note: remote index is stale; results may be out of date"),
        Freshness::Degraded => Some("note: remote index unavailable; showing local results only"),
    }
}

pub async fn run_search(
    manager: &UnifiedIndexManager,
    query: &str,
    element_type: Option<String>,
    limit: Option<usize>,
    fuzzy: bool,
    json: bool,
) -> Result<()> {
    let element_type = element_type
        .as_deref()
        .map(str::parse::<ElementType>)
        .transpose()?;
    let outcome = manager
        .search_with_freshness(
            query,
            SearchOptions {
                max_results: limit,
                element_type,
                fuzzy_match: fuzzy,
            },
        )
        .await?;

    if json {
        return print_json(&outcome);
    }

    if let Some(note) = freshness_note(outcome.remote) {
        eprintln!("{}", note);
    }
    if outcome.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} / {} ({:?})",
            i + 1,
            result.score,
            result.entry.source,
            result.entry.name,
            result.match_type
        );
        print_entry_details(&result.entry);
        println!();
    }
    Ok(())
}

pub async fn run_find(manager: &UnifiedIndexManager, name: &str, json: bool) -> Result<()> {
    let found = manager.find_by_name(name).await;
    if json {
        return print_json(&found);
    }
    match found {
        Some(entry) => {
            println!("{} / {}", entry.source, entry.name);
            print_entry_details(&entry);
        }
        None => println!("No element named '{}'.", name),
    }
    Ok(())
}

pub async fn run_list(manager: &UnifiedIndexManager, element_type: &str, json: bool) -> Result<()> {
    let entries = manager.get_elements_by_type(element_type).await?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No elements.");
        return Ok(());
    }
    println!("{:<8} {:<32} DESCRIPTION", "SOURCE", "NAME");
    for entry in &entries {
        let description: String = entry.description.chars().take(60).collect();
        println!("{:<8} {:<32} {}", entry.source.to_string(), entry.name, description);
    }
    Ok(())
}

pub async fn run_stats(manager: &UnifiedIndexManager, json: bool) -> Result<()> {
    let stats = manager.get_stats().await;
    if json {
        return print_json(&stats);
    }
    print_stats(&stats, manager.remote().origin());
    Ok(())
}

pub async fn run_refresh(manager: &UnifiedIndexManager, json: bool) -> Result<()> {
    let freshness = manager.refresh().await;
    if json {
        return print_json(&manager.remote().get_cache_stats());
    }
    let stats = manager.remote().get_cache_stats();
    match freshness {
        Freshness::Fresh => println!(
            "Remote index refreshed: {} elements from {}.",
            stats.total_elements,
            manager.remote().origin()
        ),
        other => {
            println!("Remote refresh did not complete ({:?}).", other);
            if let Some(err) = stats.last_error.or(stats.last_skip_reason) {
                println!("  reason: {}", err);
            }
        }
    }
    Ok(())
}

fn print_entry_details(entry: &IndexEntry) {
    println!("    type: {}", entry.element_type);
    if !entry.description.is_empty() {
        println!("    description: {}", entry.description);
    }
    println!("    modified: {}", entry.last_modified.format("%Y-%m-%d"));
    if let Some(path) = &entry.local_path {
        println!("    path: {}", path);
    }
    if let Some(url) = &entry.remote_url {
        println!("    url: {}", url);
    }
}
