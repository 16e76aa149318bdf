//! Index statistics and health overview.
//!
//! Renders [`IndexStats`] for `pidx stats`: local counts per element type,
//! remote cache health, and the combined unique-element count.

use chrono::{DateTime, Utc};

use crate::manager::IndexStats;
use crate::remote::CacheStatus;

/// Print a human-readable summary of `stats`.
pub fn print_stats(stats: &IndexStats, origin: &str) {
    println!("Portfolio Index — Stats");
    println!("=======================");
    println!();
    println!("  Local:       {}", stats.local.total_elements);
    for (element_type, count) in &stats.local.by_type {
        println!("    {:<12} {:>6}", element_type.to_string(), count);
    }

    let remote = &stats.remote;
    let status = match remote.status {
        CacheStatus::NoData => "no data",
        CacheStatus::Fresh => "fresh",
        CacheStatus::Stale => "stale",
    };
    println!();
    println!("  Remote:      {} ({})", remote.total_elements, origin);
    println!("    status     {}", status);
    println!(
        "    last fetch {}",
        remote
            .last_fetch
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );
    if let Some(rate_limit) = &remote.rate_limit {
        println!(
            "    budget     {} (resets {})",
            rate_limit.remaining,
            format_ts_iso(rate_limit.reset_at)
        );
    }
    if remote.skipped_refreshes > 0 {
        println!("    skipped    {}", remote.skipped_refreshes);
    }
    if let Some(err) = &remote.last_error {
        println!("    last error {}", err);
    }

    println!();
    println!("  Combined:    {}", stats.combined.total_elements);
    println!("  Unique:      {}", stats.combined.unique_elements);
    println!();
}

/// Format a timestamp relative to now (e.g. "3 hours ago").
pub fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
