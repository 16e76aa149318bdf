//! Local portfolio store.
//!
//! Walks the configured portfolio root, one directory per element type
//! (`personas/`, `skills/`, ...), and turns every matching file into an
//! [`IndexEntry`]. Nothing is cached: every call rescans, so local edits are
//! visible immediately.
//!
//! # Front matter
//!
//! Only the `name:` and `description:` keys of a leading `---` block are
//! read. Files without front matter are indexed under their file stem.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::LocalConfig;
use crate::models::{ElementType, IndexEntry, Source};

/// Scans the on-disk portfolio.
pub struct LocalIndexStore {
    config: LocalConfig,
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl LocalIndexStore {
    /// Build a store for the given config.
    ///
    /// # Errors
    ///
    /// Returns an error if any include or exclude glob is invalid.
    pub fn new(config: LocalConfig) -> Result<Self> {
        let include_set = build_globset(&config.include_globs)?;

        let mut default_excludes = vec!["**/.git/**".to_string(), "**/.*".to_string()];
        default_excludes.extend(config.exclude_globs.clone());
        let exclude_set = build_globset(&default_excludes)?;

        Ok(Self {
            config,
            include_set,
            exclude_set,
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// List every element across all type directories.
    pub fn list(&self) -> Vec<IndexEntry> {
        if !self.config.root.exists() {
            tracing::warn!(root = %self.config.root.display(), "local portfolio root does not exist");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for element_type in ElementType::ALL {
            for entry in self.scan_type_dir(element_type) {
                if seen.insert(entry.key.clone()) {
                    entries.push(entry);
                } else {
                    tracing::warn!(key = %entry.key, path = ?entry.local_path, "duplicate local element skipped");
                }
            }
        }
        entries
    }

    /// List elements of a single type.
    pub fn list_by_type(&self, element_type: ElementType) -> Vec<IndexEntry> {
        let mut seen = HashSet::new();
        self.scan_type_dir(element_type)
            .into_iter()
            .filter(|e| seen.insert(e.key.clone()))
            .collect()
    }

    fn scan_type_dir(&self, element_type: ElementType) -> Vec<IndexEntry> {
        let dir = self.config.root.join(element_type.dir_name());
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&dir).follow_links(self.config.follow_symlinks);
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !item.file_type().is_file() {
                continue;
            }

            let path = item.path();
            let relative = path.strip_prefix(&dir).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if self.exclude_set.is_match(&rel_str) {
                continue;
            }
            if !self.include_set.is_match(&rel_str) {
                continue;
            }

            match file_to_entry(path, element_type) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed element");
                }
            }
        }

        // Sort for deterministic ordering
        entries.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        entries
    }
}

fn file_to_entry(path: &Path, element_type: ElementType) -> Result<IndexEntry> {
    let bytes = std::fs::read(path)?;
    let content_hash = hex::encode(Sha256::digest(&bytes));
    let text = String::from_utf8(bytes)
        .map_err(|_| anyhow::anyhow!("element file is not valid UTF-8"))?;

    let header = parse_front_matter(&text)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = header.name.unwrap_or(stem);
    if name.trim().is_empty() {
        anyhow::bail!("element has no name");
    }

    let modified_secs = std::fs::metadata(path)?
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let last_modified: DateTime<Utc> = Utc
        .timestamp_opt(modified_secs, 0)
        .single()
        .unwrap_or_default();

    let mut entry = IndexEntry::new(
        element_type,
        name.trim(),
        header.description.unwrap_or_default(),
        Source::Local,
        last_modified,
    );
    entry.local_path = Some(path.display().to_string());
    entry.content_hash = Some(content_hash);
    Ok(entry)
}

#[derive(Debug, Default, PartialEq)]
struct FrontMatter {
    name: Option<String>,
    description: Option<String>,
}

/// Read `name:` and `description:` from a leading `---` block.
///
/// A missing block is fine; an opened but unterminated one is an error.
fn parse_front_matter(text: &str) -> Result<FrontMatter> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return Ok(FrontMatter::default()),
    }

    let mut header = FrontMatter::default();
    for line in lines {
        if line.trim_end() == "---" {
            return Ok(header);
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "name" => header.name = Some(value.to_string()),
            "description" => header.description = Some(value.to_string()),
            _ => {}
        }
    }

    anyhow::bail!("unterminated front matter")
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
