//! GitHub-backed remote listing.
//!
//! Lists element files in a repository through the code search API:
//!
//! ```text
//! GET {api_url}/search/code?q=repo:{owner}/{repo}+extension:md&per_page=N&page=P
//! ```
//!
//! The page number is the pagination cursor. Rate-limit budget is read from
//! the `x-ratelimit-remaining` and `x-ratelimit-reset` response headers on
//! every page.
//!
//! Code search returns paths and blob metadata only, not file contents, so
//! remote records carry no description. Remote elements match on name tiers
//! only and never reach the description tier.
//!
//! # Configuration
//!
//! ```toml
//! [remote]
//! owner = "acme"
//! repository = "collection"
//! token_env = "GITHUB_TOKEN"   # optional; anonymous when unset
//! ```
//!
//! # Status Mapping
//!
//! | Status | Error |
//! |--------|-------|
//! | 401 | [`RemoteError::Auth`] |
//! | 403 / 429 with `remaining = 0` | [`RemoteError::RateLimitExceeded`] |
//! | 403 otherwise | [`RemoteError::Auth`] |
//! | 404, 422 | [`RemoteError::NotFound`] |
//! | other non-2xx | [`RemoteError::Network`] |

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::RateLimit;
use crate::traits::{ListingPage, RemoteListing, RemoteRecord};

/// Code-search-backed listing of a GitHub repository.
pub struct GitHubListing {
    origin: String,
    config: RemoteConfig,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubListing {
    /// Create a listing for the configured repository.
    ///
    /// Reads the API token from `config.token_env`; a missing variable means
    /// anonymous access with the lower rate limit.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::info!(env = %config.token_env, "no API token set, using anonymous access");
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("portfolio-index/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            origin: config.origin(),
            config,
            token,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    path: String,
    sha: Option<String>,
    html_url: Option<String>,
}

#[async_trait]
impl RemoteListing for GitHubListing {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage, RemoteError> {
        let page: u32 = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| RemoteError::Decode(format!("bad page cursor '{}'", c)))?,
            None => 1,
        };

        let url = format!("{}/search/code", self.config.api_url.trim_end_matches('/'));
        let query = format!("repo:{} extension:md", self.origin);
        let per_page = self.config.per_page.to_string();
        let page_param = page.to_string();

        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
            ]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let rate_limit = parse_rate_limit(resp.headers());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status, rate_limit, &body));
        }

        let parsed: SearchResponse = resp.json().await?;
        let fetched = u64::from(page) * u64::from(self.config.per_page);
        let next_cursor = (fetched < parsed.total_count && !parsed.items.is_empty())
            .then(|| (page + 1).to_string());

        let records = parsed.items.into_iter().map(item_to_record).collect();

        Ok(ListingPage {
            records,
            next_cursor,
            rate_limit,
        })
    }
}

/// Search hits carry no file contents, hence no description.
fn item_to_record(item: SearchItem) -> RemoteRecord {
    RemoteRecord {
        name: item
            .name
            .strip_suffix(".md")
            .unwrap_or(&item.name)
            .to_string(),
        path: item.path,
        description: None,
        url: item.html_url,
        sha: item.sha,
        last_modified: None,
    }
}

fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimit> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };
    let remaining = header("x-ratelimit-remaining")?;
    let reset_at = header("x-ratelimit-reset").and_then(|ts| Utc.timestamp_opt(ts, 0).single())?;
    Some(RateLimit {
        remaining: u32::try_from(remaining.max(0)).unwrap_or(u32::MAX),
        reset_at,
    })
}

fn map_status(status: StatusCode, rate_limit: Option<RateLimit>, body: &str) -> RemoteError {
    let excerpt: String = body.chars().take(200).collect();
    let exhausted = rate_limit.filter(|rl| rl.remaining == 0);

    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if exhausted.is_some() => {
            RemoteError::RateLimitExceeded {
                reset_at: exhausted.map(|rl| rl.reset_at).unwrap_or_else(fallback_reset),
            }
        }
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimitExceeded {
            reset_at: fallback_reset(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Auth(format!("HTTP {}: {}", status, excerpt))
        }
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::NotFound,
        _ => RemoteError::Network(format!("HTTP {}: {}", status, excerpt)),
    }
}

fn fallback_reset() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::minutes(1)
}
