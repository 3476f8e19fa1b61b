use crate::db::DevotionalStore;
use crate::error::Result;
use crate::models::NewDevotional;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted(i64),
    Updated(i64),
}

/// Insert-or-overwrite keyed on the draft's `source_url`.
///
/// An existing entry keeps its id and its visibility; only content fields
/// are replaced.
pub async fn reconcile<S>(store: &S, mut draft: NewDevotional) -> Result<ReconcileOutcome>
where
    S: DevotionalStore + ?Sized,
{
    let source_url = draft
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("draft '{}' has no source URL", draft.title))?;
    draft.source_url = Some(source_url.clone());

    if let Some(existing) = store.find_by_source_url(&source_url).await? {
        if store.update_synced(existing.id, draft.clone()).await? {
            return Ok(ReconcileOutcome::Updated(existing.id));
        }
        // Deleted between lookup and update; treat as first sight.
        tracing::debug!("Entry {} for {} vanished, re-inserting", existing.id, source_url);
    }

    let id = store.insert_synced(draft).await?;
    Ok(ReconcileOutcome::Inserted(id))
}
