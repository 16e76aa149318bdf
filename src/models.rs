//! Core data models used throughout Portfolio Index.
//!
//! These types represent the index entries, remote listings, and search
//! results that flow between the local store, the remote fetcher, and the
//! unified manager.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::error::IndexError;

/// The kinds of portfolio element the index knows about.
///
/// Each type owns a directory of the same (plural) name in both the local
/// portfolio root and the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Persona,
    Skill,
    Template,
    Agent,
    Memory,
    Ensemble,
}

impl ElementType {
    pub const ALL: [ElementType; 6] = [
        ElementType::Persona,
        ElementType::Skill,
        ElementType::Template,
        ElementType::Agent,
        ElementType::Memory,
        ElementType::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Persona => "persona",
            ElementType::Skill => "skill",
            ElementType::Template => "template",
            ElementType::Agent => "agent",
            ElementType::Memory => "memory",
            ElementType::Ensemble => "ensemble",
        }
    }

    /// Directory name holding elements of this type (`personas`, `memories`, ...).
    pub fn dir_name(&self) -> &'static str {
        match self {
            ElementType::Persona => "personas",
            ElementType::Skill => "skills",
            ElementType::Template => "templates",
            ElementType::Agent => "agents",
            ElementType::Memory => "memories",
            ElementType::Ensemble => "ensembles",
        }
    }

    /// Resolve a type from its directory name. Only exact directory names match.
    pub fn from_dir_name(dir: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.dir_name() == dir)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = IndexError;

    /// Accepts singular or plural forms, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered || t.dir_name() == lowered)
            .ok_or_else(|| {
                IndexError::InvalidArgument(format!(
                    "unknown element type '{}'. Expected one of: persona, skill, template, agent, memory, ensemble",
                    s
                ))
            })
    }
}

/// Which store an entry came from.
///
/// Ordering matters: `Local` sorts before `Remote`, which is the tie-break
/// priority used when ranking search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Remote,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local => f.write_str("local"),
            Source::Remote => f.write_str("remote"),
        }
    }
}

/// Normalize an element name or query for comparison.
///
/// NFKC, lowercase, trim, and collapse internal whitespace runs.
pub fn normalize_name(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cross-source identity of an element: `"<type>:<normalized name>"`.
pub fn entry_key(element_type: ElementType, name: &str) -> String {
    format!("{}:{}", element_type, normalize_name(name))
}

/// A single element in either store, ready for matching.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub key: String,
    pub element_type: ElementType,
    pub name: String,
    pub description: String,
    pub source: Source,
    pub local_path: Option<String>,
    pub remote_url: Option<String>,
    pub content_hash: Option<String>,
    pub last_modified: DateTime<Utc>,
    /// Normalized description, matched by the description tier.
    #[serde(skip)]
    pub normalized_description: String,
}

impl IndexEntry {
    /// Build an entry, deriving `key` and `normalized_description`.
    pub fn new(
        element_type: ElementType,
        name: impl Into<String>,
        description: impl Into<String>,
        source: Source,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        let normalized_description = normalize_name(&description);
        Self {
            key: entry_key(element_type, &name),
            element_type,
            name,
            description,
            source,
            local_path: None,
            remote_url: None,
            content_hash: None,
            last_modified,
            normalized_description,
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Remaining request budget reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// A complete remote listing.
///
/// Immutable once built. Shared behind `Arc` and replaced wholesale on every
/// successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteIndex {
    /// `owner/repository` the listing came from.
    pub origin: String,
    pub fetched_at: DateTime<Utc>,
    pub total_elements: usize,
    pub entries_by_type: BTreeMap<ElementType, Vec<IndexEntry>>,
    pub rate_limit: Option<RateLimit>,
}

impl RemoteIndex {
    /// Group entries by type, keeping the first entry for each key.
    pub fn from_entries(
        origin: impl Into<String>,
        fetched_at: DateTime<Utc>,
        entries: Vec<IndexEntry>,
        rate_limit: Option<RateLimit>,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut entries_by_type: BTreeMap<ElementType, Vec<IndexEntry>> = BTreeMap::new();
        for entry in entries {
            if !seen.insert(entry.key.clone()) {
                tracing::warn!(key = %entry.key, "duplicate remote entry dropped");
                continue;
            }
            entries_by_type
                .entry(entry.element_type)
                .or_default()
                .push(entry);
        }
        let total_elements = entries_by_type.values().map(Vec::len).sum();
        Self {
            origin: origin.into(),
            fetched_at,
            total_elements,
            entries_by_type,
            rate_limit,
        }
    }

    pub fn empty(origin: impl Into<String>) -> Self {
        Self::from_entries(origin, Utc::now(), Vec::new(), None)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries_by_type.values().flatten()
    }

    pub fn entries_of(&self, element_type: ElementType) -> &[IndexEntry] {
        self.entries_by_type
            .get(&element_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// How a search candidate matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefix,
    Substring,
    Fuzzy,
    Description,
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub entry: IndexEntry,
    pub match_type: MatchType,
    /// Relevance score in `[0.0, 1.0]`.
    pub score: f64,
}
