//! Shared fixtures: a scripted remote listing and a temp portfolio builder.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portfolio_index::config::FetcherSettings;
use portfolio_index::error::RemoteError;
use portfolio_index::models::RateLimit;
use portfolio_index::remote::RemoteIndexFetcher;
use portfolio_index::traits::{ListingPage, RemoteListing, RemoteRecord};

/// What the next listing call does.
#[derive(Clone)]
pub enum Mode {
    Serve,
    Fail(RemoteError),
    Hang,
}

/// An in-memory remote whose behavior tests can change between calls.
pub struct ScriptedListing {
    records: Mutex<Vec<RemoteRecord>>,
    mode: Mutex<Mode>,
    rate_limit: Mutex<Option<RateLimit>>,
    delay: Mutex<Duration>,
    page_size: usize,
    listings: AtomicUsize,
    pages: AtomicUsize,
}

impl ScriptedListing {
    pub fn new(records: Vec<RemoteRecord>) -> Arc<Self> {
        Self::paged(records, 100)
    }

    pub fn paged(records: Vec<RemoteRecord>, page_size: usize) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            mode: Mutex::new(Mode::Serve),
            rate_limit: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            page_size,
            listings: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock() = mode;
    }

    pub fn set_records(&self, records: Vec<RemoteRecord>) {
        *self.records.lock() = records;
    }

    pub fn set_rate_limit(&self, remaining: u32, reset_at: DateTime<Utc>) {
        *self.rate_limit.lock() = Some(RateLimit { remaining, reset_at });
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of complete listings started (first-page requests).
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteListing for ScriptedListing {
    fn origin(&self) -> &str {
        "acme/collection"
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage, RemoteError> {
        if cursor.is_none() {
            self.listings.fetch_add(1, Ordering::SeqCst);
        }
        self.pages.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mode = self.mode.lock().clone();
        match mode {
            Mode::Hang => std::future::pending().await,
            Mode::Fail(e) => Err(e),
            Mode::Serve => {
                let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
                let records = self.records.lock().clone();
                let end = (start + self.page_size).min(records.len());
                let next_cursor = (end < records.len()).then(|| end.to_string());
                Ok(ListingPage {
                    records: records[start..end].to_vec(),
                    next_cursor,
                    rate_limit: *self.rate_limit.lock(),
                })
            }
        }
    }
}

pub fn record(path: &str) -> RemoteRecord {
    let name = path
        .rsplit('/')
        .next()
        .unwrap()
        .trim_end_matches(".md")
        .to_string();
    RemoteRecord {
        path: path.to_string(),
        name,
        description: None,
        url: Some(format!("https://github.com/acme/collection/blob/main/{}", path)),
        sha: Some("0123abcd".to_string()),
        last_modified: None,
    }
}

pub fn settings(ttl_secs: u64) -> FetcherSettings {
    FetcherSettings {
        ttl: Duration::from_secs(ttl_secs),
        timeout: Duration::from_secs(5),
        rate_limit_threshold: 10,
        max_pages: 10,
    }
}

pub fn fetcher(listing: &Arc<ScriptedListing>, ttl_secs: u64) -> RemoteIndexFetcher {
    RemoteIndexFetcher::new(listing.clone(), settings(ttl_secs))
}

/// Write an element file with front matter under `<root>/<dir>/<file>`.
pub fn write_element(root: &Path, dir: &str, file: &str, name: &str, description: &str) {
    let type_dir = root.join(dir);
    fs::create_dir_all(&type_dir).unwrap();
    fs::write(
        type_dir.join(file),
        format!(
            "---\nname: {}\ndescription: {}\n---\n\nBody of {}.\n",
            name, description, name
        ),
    )
    .unwrap();
}
