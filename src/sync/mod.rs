//! Devotional feed sync: fetch once, then extract and reconcile each item in
//! feed order, one at a time.

mod reconcile;

use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::db::DevotionalStore;
use crate::error::{AppError, Result};
use crate::feed::{ContentExtractor, FeedFetcher, FeedItem};

pub use reconcile::{reconcile, ReconcileOutcome};

/// Outcome of one sync run, serialised as the trigger's JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub message: String,
    pub synced: usize,
    pub total: usize,
    /// `"<item title>: <reason>"` per failed item.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub struct SyncService {
    fetcher: FeedFetcher,
    extractor: ContentExtractor,
    offset: FixedOffset,
    store_timeout: Duration,
}

impl SyncService {
    pub fn new(fetcher: FeedFetcher, offset: FixedOffset, store_timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor: ContentExtractor::new(offset),
            offset,
            store_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = FeedFetcher::new(config.http_timeout(), config.connect_timeout())?;
        Ok(Self::new(fetcher, config.local_offset()?, config.store_timeout()))
    }

    /// Full pass over the feed. Only a fetch/parse failure is an error; item
    /// failures are reported inside the summary.
    pub async fn run<S>(&self, store: &S, feed_url: &str) -> Result<SyncSummary>
    where
        S: DevotionalStore + ?Sized,
    {
        tracing::info!("Syncing devotionals from {}", feed_url);
        let items = self.fetcher.fetch_items(feed_url).await?;
        Ok(self.sync_items(store, items).await)
    }

    pub async fn sync_items<S>(&self, store: &S, items: Vec<FeedItem>) -> SyncSummary
    where
        S: DevotionalStore + ?Sized,
    {
        let today = Utc::now().with_timezone(&self.offset).date_naive();
        self.sync_items_on(store, items, today).await
    }

    async fn sync_items_on<S>(&self, store: &S, items: Vec<FeedItem>, today: NaiveDate) -> SyncSummary
    where
        S: DevotionalStore + ?Sized,
    {
        let total = items.len();
        let mut inserted = 0;
        let mut updated = 0;
        let mut errors = Vec::new();

        for item in &items {
            let label = item_label(item);

            let draft = match self.extractor.extract(item, today) {
                Ok(draft) => draft,
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", label, e);
                    errors.push(format!("{label}: {e}"));
                    continue;
                }
            };

            match tokio::time::timeout(self.store_timeout, reconcile(store, draft)).await {
                Ok(Ok(ReconcileOutcome::Inserted(id))) => {
                    tracing::debug!("Inserted '{}' as {}", label, id);
                    inserted += 1;
                }
                Ok(Ok(ReconcileOutcome::Updated(id))) => {
                    tracing::debug!("Updated '{}' ({})", label, id);
                    updated += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed to store '{}': {}", label, e);
                    errors.push(format!("{label}: {e}"));
                }
                Err(_) => {
                    let e = AppError::Timeout(format!("store write after {:?}", self.store_timeout));
                    tracing::warn!("Failed to store '{}': {}", label, e);
                    errors.push(format!("{label}: {e}"));
                }
            }
        }

        let synced = inserted + updated;
        let message = if total == 0 {
            "No items found in feed".to_string()
        } else {
            format!("Synced {synced} of {total} devotionals ({inserted} new, {updated} updated)")
        };
        tracing::info!("{}", message);

        SyncSummary {
            message,
            synced,
            total,
            errors,
        }
    }
}

fn item_label(item: &FeedItem) -> String {
    [item.title.as_deref(), item.link.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("(untitled)")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::db::Repository;
    use crate::error::AppError;
    use crate::models::{Devotional, DevotionalSource, NewDevotional};

    /// In-memory store; writes for `fail_title` fail, writes for `hang_title` never finish.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Devotional>>,
        fail_title: Option<String>,
        hang_title: Option<String>,
    }

    impl MemoryStore {
        fn snapshot(&self) -> Vec<Devotional> {
            self.rows.lock().unwrap().clone()
        }

        fn check(&self, title: &str) -> Result<()> {
            if self.fail_title.as_deref() == Some(title) {
                return Err(AppError::Other(anyhow::anyhow!("disk full")));
            }
            Ok(())
        }

        async fn maybe_hang(&self, title: &str) {
            if self.hang_title.as_deref() == Some(title) {
                std::future::pending::<()>().await;
            }
        }
    }

    #[async_trait]
    impl DevotionalStore for MemoryStore {
        async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Devotional>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.source_url.as_deref() == Some(source_url))
                .cloned())
        }

        async fn insert_synced(&self, draft: NewDevotional) -> Result<i64> {
            self.maybe_hang(&draft.title).await;
            self.check(&draft.title)?;
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i64 + 1;
            let now = Utc::now();
            rows.push(Devotional {
                id,
                title: draft.title,
                date: draft.date,
                key_verse: draft.key_verse,
                reference: draft.reference,
                body: draft.body,
                hymn: draft.hymn,
                prayer: draft.prayer,
                quote: draft.quote,
                source: DevotionalSource::Synced,
                source_url: draft.source_url,
                visible: true,
                created_at: now,
                updated_at: now,
            });
            Ok(id)
        }

        async fn update_synced(&self, id: i64, draft: NewDevotional) -> Result<bool> {
            self.check(&draft.title)?;
            let mut rows = self.rows.lock().unwrap();
            let Some(row) = rows.iter_mut().find(|d| d.id == id) else {
                return Ok(false);
            };
            row.title = draft.title;
            row.date = draft.date;
            row.key_verse = draft.key_verse;
            row.reference = draft.reference;
            row.body = draft.body;
            row.hymn = draft.hymn;
            row.prayer = draft.prayer;
            row.quote = draft.quote;
            row.source = DevotionalSource::Synced;
            row.source_url = draft.source_url;
            row.updated_at = Utc::now();
            Ok(true)
        }
    }

    fn service() -> SyncService {
        let fetcher = FeedFetcher::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap();
        SyncService::new(
            fetcher,
            FixedOffset::east_opt(7 * 3600).unwrap(),
            Duration::from_millis(200),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 12).unwrap()
    }

    fn item(title: &str, link: &str, body: &str) -> FeedItem {
        FeedItem {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            published: Some(Utc.with_ymd_and_hms(2024, 2, 11, 23, 0, 0).unwrap()),
            content: Some(format!("<p><strong>Bacaan:</strong> Yohanes 3:16</p><p>{body}</p>")),
        }
    }

    fn content_of(rows: &[Devotional]) -> Vec<(i64, String, NaiveDate, String, Option<String>, bool)> {
        rows.iter()
            .map(|d| (d.id, d.title.clone(), d.date, d.body.clone(), d.source_url.clone(), d.visible))
            .collect()
    }

    #[tokio::test]
    async fn second_run_of_same_snapshot_changes_nothing() {
        let store = MemoryStore::default();
        let items = vec![
            item("Kasih Allah", "https://x/a", "Isi A"),
            item("Pengharapan", "https://x/b", "Isi B"),
        ];

        let first = service().sync_items_on(&store, items.clone(), today()).await;
        let after_first = store.snapshot();
        let second = service().sync_items_on(&store, items, today()).await;

        assert_eq!(first.synced, 2);
        assert_eq!(second.synced, 2);
        assert_eq!(content_of(&after_first), content_of(&store.snapshot()));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn identical_titles_with_distinct_links_stay_distinct() {
        let store = MemoryStore::default();
        let items = vec![
            item("Renungan Pagi", "https://x/1", "Satu"),
            item("Renungan Pagi", "https://x/2", "Dua"),
        ];

        let summary = service().sync_items_on(&store, items, today()).await;

        assert_eq!(summary.synced, 2);
        let rows = store.snapshot();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].source_url, rows[1].source_url);
    }

    #[tokio::test]
    async fn resync_preserves_admin_visibility() {
        let store = MemoryStore::default();
        let items = vec![item("Kasih Allah", "https://x/a", "Isi")];

        service().sync_items_on(&store, items.clone(), today()).await;
        store.rows.lock().unwrap()[0].visible = false;
        service().sync_items_on(&store, items, today()).await;

        assert!(!store.snapshot()[0].visible);
    }

    #[tokio::test]
    async fn extraction_failure_is_isolated_to_its_item() {
        let store = MemoryStore::default();
        let mut broken = item("Tanpa Tautan", "", "Isi");
        broken.link = None;
        let items = vec![
            item("Satu", "https://x/1", "Isi"),
            broken,
            item("Tiga", "https://x/3", "Isi"),
        ];

        let summary = service().sync_items_on(&store, items, today()).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.synced, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Tanpa Tautan:"));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn store_failure_is_isolated_to_its_item() {
        let store = MemoryStore {
            fail_title: Some("Dua".to_string()),
            ..MemoryStore::default()
        };
        let items = vec![
            item("Satu", "https://x/1", "Isi"),
            item("Dua", "https://x/2", "Isi"),
            item("Tiga", "https://x/3", "Isi"),
        ];

        let summary = service().sync_items_on(&store, items, today()).await;

        assert_eq!(summary.synced, 2);
        assert_eq!(summary.errors, vec!["Dua: disk full".to_string()]);
        let titles: Vec<_> = store.snapshot().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Satu", "Tiga"]);
    }

    #[tokio::test]
    async fn hung_store_write_times_out_and_sync_continues() {
        let store = MemoryStore {
            hang_title: Some("Macet".to_string()),
            ..MemoryStore::default()
        };
        let items = vec![
            item("Macet", "https://x/1", "Isi"),
            item("Lancar", "https://x/2", "Isi"),
        ];

        let summary = service().sync_items_on(&store, items, today()).await;

        assert_eq!(summary.synced, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Macet: Timed out: store write after"));
    }

    #[tokio::test]
    async fn empty_feed_reports_zero() {
        let store = MemoryStore::default();
        let summary = service().sync_items_on(&store, Vec::new(), today()).await;

        assert_eq!(summary.synced, 0);
        assert_eq!(summary.total, 0);
        assert!(summary.errors.is_empty());
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            serde_json::json!({"message": "No items found in feed", "synced": 0, "total": 0})
        );
    }

    #[tokio::test]
    async fn revised_title_updates_in_place_against_sqlite() {
        let repo = Repository::in_memory().await.unwrap();
        let service = service();

        let first = service
            .sync_items_on(
                &repo,
                vec![
                    item("Kasih Allah", "https://x/a", "..."),
                    item("Pengharapan", "https://x/b", "..."),
                ],
                today(),
            )
            .await;
        assert_eq!((first.synced, first.total), (2, 2));

        let a_before = repo.find_by_source_url("https://x/a").await.unwrap().unwrap();
        let b_before = repo.find_by_source_url("https://x/b").await.unwrap().unwrap();

        let second = service
            .sync_items_on(
                &repo,
                vec![
                    item("Kasih Allah (revisi)", "https://x/a", "..."),
                    item("Pengharapan", "https://x/b", "..."),
                ],
                today(),
            )
            .await;
        assert_eq!((second.synced, second.total), (2, 2));
        assert!(second.errors.is_empty());

        let a_after = repo.find_by_source_url("https://x/a").await.unwrap().unwrap();
        let b_after = repo.find_by_source_url("https://x/b").await.unwrap().unwrap();
        assert_eq!(a_after.id, a_before.id);
        assert_eq!(a_after.title, "Kasih Allah (revisi)");
        assert_eq!(b_after.id, b_before.id);
        assert_eq!(b_after.title, b_before.title);
        assert_eq!(a_after.reference.as_deref(), Some("Yohanes 3:16"));
        assert_eq!(a_after.date, today());
        assert_eq!(repo.get_all_devotionals().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reconcile_rejects_draft_without_source_url() {
        let store = MemoryStore::default();
        let draft = NewDevotional {
            title: "Manual".to_string(),
            date: today(),
            key_verse: None,
            reference: None,
            body: String::new(),
            hymn: None,
            prayer: None,
            quote: None,
            source_url: Some("  ".to_string()),
        };

        assert!(reconcile(&store, draft).await.is_err());
        assert!(store.snapshot().is_empty());
    }
}
