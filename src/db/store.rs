use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Devotional, NewDevotional};

/// The slice of persistence the sync pipeline needs.
///
/// Implemented by [`super::Repository`] for SQLite; tests substitute an
/// in-memory store.
#[async_trait]
pub trait DevotionalStore: Send + Sync {
    /// Exact match on the external permalink. Manual entries never match.
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Devotional>>;

    /// Insert a synced entry, visible by default. Returns the new id.
    async fn insert_synced(&self, draft: NewDevotional) -> Result<i64>;

    /// Overwrite the content fields of an existing entry and mark it synced.
    /// Visibility is left as the admin set it. Returns `false` if `id` is gone.
    async fn update_synced(&self, id: i64, draft: NewDevotional) -> Result<bool>;
}
