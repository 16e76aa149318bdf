//! Named-action cache invalidation.
//!
//! Components that change the remote repository (submitting content,
//! syncing a portfolio) hold an [`InvalidationChannel`] and call
//! [`notify`](InvalidationChannel::notify) afterwards. Notifying only flips
//! the cache to stale; it never waits on a fetch.

use crate::remote::RemoteIndexFetcher;

/// Actions known to change the remote listing.
pub const KNOWN_ACTIONS: &[&str] = &[
    "submit_content",
    "sync_portfolio",
    "install_element",
    "delete_element",
];

/// A cheap, cloneable trigger that marks the remote cache stale.
#[derive(Clone)]
pub struct InvalidationChannel {
    fetcher: RemoteIndexFetcher,
}

impl InvalidationChannel {
    pub fn new(fetcher: RemoteIndexFetcher) -> Self {
        Self { fetcher }
    }

    /// Record that `action` happened. Unknown names are accepted.
    pub fn notify(&self, action: &str) {
        if KNOWN_ACTIONS.contains(&action) {
            tracing::info!(action, "remote-changing action completed");
        } else {
            tracing::debug!(action, "unrecognized action, invalidating anyway");
        }
        self.fetcher.invalidate_after_action(action);
    }
}
