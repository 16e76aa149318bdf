//! # Portfolio Index
//!
//! A federated index and search engine for portfolio elements (personas,
//! skills, templates, agents, memories, ensembles) that live both in a local
//! portfolio directory and in a remote repository.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────────┐
//! │ LocalIndex   │      │ RemoteIndexFetcher   │◀── InvalidationChannel
//! │ Store (fs)   │      │ TTL cache · coalesce │
//! └──────┬───────┘      └──────────┬───────────┘
//!        │ list()                  │ get_index()
//!        └────────────┬────────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │ UnifiedIndexManager  │  search · find · stats
//!          └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pidx search "alice" --fuzzy
//! pidx find "Alice"
//! pidx list persona
//! pidx stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and name normalization |
//! | [`error`] | Remote and caller-facing error types |
//! | [`local`] | On-disk portfolio scanning |
//! | [`traits`] | Remote listing abstraction |
//! | [`remote`] | Cached, coalescing remote fetcher |
//! | [`search`] | Match scoring and ranking |
//! | [`manager`] | Unified local + remote view |
//! | [`invalidation`] | Named-action cache invalidation |
//! | [`stats`] | Statistics rendering |
//! | [`commands`] | CLI command runners |

pub mod commands;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod local;
pub mod manager;
pub mod models;
pub mod remote;
pub mod search;
pub mod stats;
pub mod traits;
