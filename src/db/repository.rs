use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    BibleVerse, Devotional, DevotionalSource, ListQuery, NewDevotional, TodayDevotional,
};

use super::schema::SCHEMA;
use super::store::DevotionalStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

const DEVOTIONAL_COLUMNS: &str = "id, title, date, key_verse, reference, body, hymn, prayer, \
     quote, source, source_url, visible, created_at, updated_at";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Devotional operations

    pub async fn insert_devotional(
        &self,
        draft: NewDevotional,
        source: DevotionalSource,
    ) -> Result<i64> {
        // Manual entries are never keyed by an external permalink.
        let source_url = match source {
            DevotionalSource::Synced => draft.source_url,
            DevotionalSource::Manual => None,
        };

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO devotionals
                           (title, date, key_verse, reference, body, hymn, prayer, quote, source, source_url, visible)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)"#,
                    params![
                        draft.title,
                        draft.date.format(DATE_FORMAT).to_string(),
                        draft.key_verse,
                        draft.reference,
                        draft.body,
                        draft.hymn,
                        draft.prayer,
                        draft.quote,
                        source.as_str(),
                        source_url,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Sync overwrite: content fields, source and permalink. `visible` is untouched.
    pub async fn update_synced_content(&self, id: i64, draft: NewDevotional) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE devotionals SET
                           title = ?1, date = ?2, key_verse = ?3, reference = ?4, body = ?5,
                           hymn = ?6, prayer = ?7, quote = ?8,
                           source = 'synced', source_url = ?9,
                           updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                       WHERE id = ?10"#,
                    params![
                        draft.title,
                        draft.date.format(DATE_FORMAT).to_string(),
                        draft.key_verse,
                        draft.reference,
                        draft.body,
                        draft.hymn,
                        draft.prayer,
                        draft.quote,
                        draft.source_url,
                        id,
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    /// Admin edit: content fields only, source and permalink stay as they are.
    pub async fn update_content(&self, id: i64, draft: NewDevotional) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE devotionals SET
                           title = ?1, date = ?2, key_verse = ?3, reference = ?4, body = ?5,
                           hymn = ?6, prayer = ?7, quote = ?8,
                           updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                       WHERE id = ?9"#,
                    params![
                        draft.title,
                        draft.date.format(DATE_FORMAT).to_string(),
                        draft.key_verse,
                        draft.reference,
                        draft.body,
                        draft.hymn,
                        draft.prayer,
                        draft.quote,
                        id,
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn get_devotional(&self, id: i64) -> Result<Option<Devotional>> {
        let devotional = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DEVOTIONAL_COLUMNS} FROM devotionals WHERE id = ?1"
                ))?;
                let devotional = stmt
                    .query_row(params![id], devotional_from_row)
                    .optional()?;
                Ok(devotional)
            })
            .await?;
        Ok(devotional)
    }

    pub async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Devotional>> {
        let source_url = source_url.to_string();
        let devotional = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DEVOTIONAL_COLUMNS} FROM devotionals WHERE source_url = ?1"
                ))?;
                let devotional = stmt
                    .query_row(params![source_url], devotional_from_row)
                    .optional()?;
                Ok(devotional)
            })
            .await?;
        Ok(devotional)
    }

    /// One page of devotionals, newest date first, plus the total matching count.
    pub async fn list_devotionals(&self, query: ListQuery) -> Result<(Vec<Devotional>, u64)> {
        let visible = query.visible;
        let source = query.source.map(|s| s.as_str().to_string());
        let limit = query.limit;
        let offset = query.offset();

        let page = self
            .conn
            .call(move |conn| {
                let total: i64 = conn.query_row(
                    r#"SELECT COUNT(*) FROM devotionals
                       WHERE (?1 IS NULL OR visible = ?1) AND (?2 IS NULL OR source = ?2)"#,
                    params![visible, source],
                    |row| row.get(0),
                )?;

                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {DEVOTIONAL_COLUMNS} FROM devotionals
                       WHERE (?1 IS NULL OR visible = ?1) AND (?2 IS NULL OR source = ?2)
                       ORDER BY date DESC, updated_at DESC, id DESC
                       LIMIT ?3 OFFSET ?4"#
                ))?;
                let items = stmt
                    .query_map(params![visible, source, limit, offset], devotional_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((items, total.max(0) as u64))
            })
            .await?;
        Ok(page)
    }

    pub async fn get_all_devotionals(&self) -> Result<Vec<Devotional>> {
        let devotionals = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DEVOTIONAL_COLUMNS} FROM devotionals ORDER BY date DESC, id DESC"
                ))?;
                let devotionals = stmt
                    .query_map([], devotional_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(devotionals)
            })
            .await?;
        Ok(devotionals)
    }

    /// Visible entry dated `today`, else the most recent visible entry before it.
    pub async fn today_or_latest(&self, today: NaiveDate) -> Result<TodayDevotional> {
        let today = today.format(DATE_FORMAT).to_string();
        let lookup = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {DEVOTIONAL_COLUMNS} FROM devotionals
                       WHERE visible = 1 AND date <= ?1
                       ORDER BY date DESC, updated_at DESC, id DESC
                       LIMIT 1"#
                ))?;
                let entry = stmt
                    .query_row(params![today], devotional_from_row)
                    .optional()?;
                let is_today = entry
                    .as_ref()
                    .is_some_and(|e| e.date.format(DATE_FORMAT).to_string() == today);
                Ok(TodayDevotional { entry, is_today })
            })
            .await?;
        Ok(lookup)
    }

    pub async fn set_visible(&self, id: i64, visible: bool) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE devotionals SET visible = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?2",
                    params![visible, id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn delete_devotional(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM devotionals WHERE id = ?1", params![id])?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn delete_all_devotionals(&self) -> Result<usize> {
        let deleted = self
            .conn
            .call(|conn| {
                let deleted = conn.execute("DELETE FROM devotionals", [])?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }

    // Bible verse operations

    /// Upserts each verse on its natural key. Returns the number of rows written.
    pub async fn upsert_bible_verses(&self, verses: Vec<BibleVerse>) -> Result<usize> {
        let written = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"INSERT INTO bible_verses (book, chapter, verse, translation, text)
                       VALUES (?1, ?2, ?3, ?4, ?5)
                       ON CONFLICT(book, chapter, verse, translation) DO UPDATE SET
                           text = excluded.text,
                           imported_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"#,
                )?;
                let mut written = 0;
                for verse in &verses {
                    written += stmt.execute(params![
                        verse.book,
                        verse.chapter,
                        verse.verse,
                        verse.translation,
                        verse.text,
                    ])?;
                }
                Ok(written)
            })
            .await?;
        Ok(written)
    }

    pub async fn count_bible_verses(&self, translation: &str) -> Result<u64> {
        let translation = translation.to_string();
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM bible_verses WHERE translation = ?1",
                    params![translation],
                    |row| row.get(0),
                )?;
                Ok(count.max(0) as u64)
            })
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl DevotionalStore for Repository {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<Devotional>> {
        Repository::find_by_source_url(self, source_url).await
    }

    async fn insert_synced(&self, draft: NewDevotional) -> Result<i64> {
        self.insert_devotional(draft, DevotionalSource::Synced).await
    }

    async fn update_synced(&self, id: i64, draft: NewDevotional) -> Result<bool> {
        self.update_synced_content(id, draft).await
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn devotional_from_row(row: &Row) -> rusqlite::Result<Devotional> {
    let date: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| conversion_error(2, format!("invalid date {date:?}: {e}")))?;

    let source: String = row.get(9)?;
    let source = DevotionalSource::parse(&source)
        .ok_or_else(|| conversion_error(9, format!("unknown source {source:?}")))?;

    Ok(Devotional {
        id: row.get(0)?,
        title: row.get(1)?,
        date,
        key_verse: row.get(3)?,
        reference: row.get(4)?,
        body: row.get(5)?,
        hymn: row.get(6)?,
        prayer: row.get(7)?,
        quote: row.get(8)?,
        source,
        source_url: row.get(10)?,
        visible: row.get::<_, i64>(11)? != 0,
        created_at: row
            .get::<_, String>(12)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(13)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn draft(title: &str, day: &str, url: Option<&str>) -> NewDevotional {
        NewDevotional {
            title: title.to_string(),
            date: date(day),
            key_verse: None,
            reference: Some("Yohanes 3:16".to_string()),
            body: format!("Isi renungan {title}"),
            hymn: None,
            prayer: None,
            quote: None,
            source_url: url.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn manual_insert_drops_source_url() {
        let repo = Repository::in_memory().await.unwrap();
        let id = repo
            .insert_devotional(draft("Manual", "2024-02-01", Some("https://x/m")), DevotionalSource::Manual)
            .await
            .unwrap();

        let stored = repo.get_devotional(id).await.unwrap().unwrap();
        assert_eq!(stored.source, DevotionalSource::Manual);
        assert!(stored.source_url.is_none());
        assert!(stored.visible);
        assert!(repo.find_by_source_url("https://x/m").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn source_url_is_unique() {
        let repo = Repository::in_memory().await.unwrap();
        assert_ok!(repo.insert_synced(draft("A", "2024-02-01", Some("https://x/a"))).await);
        assert!(repo
            .insert_synced(draft("A again", "2024-02-02", Some("https://x/a")))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn many_manual_entries_may_share_null_source_url() {
        let repo = Repository::in_memory().await.unwrap();
        for day in ["2024-02-01", "2024-02-02"] {
            assert_ok!(
                repo.insert_devotional(draft("Manual", day, None), DevotionalSource::Manual)
                    .await
            );
        }
        assert_eq!(repo.get_all_devotionals().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn synced_update_keeps_visibility() {
        let repo = Repository::in_memory().await.unwrap();
        let id = repo
            .insert_synced(draft("A", "2024-02-01", Some("https://x/a")))
            .await
            .unwrap();
        assert!(repo.set_visible(id, false).await.unwrap());

        let updated = repo
            .update_synced_content(id, draft("A (revisi)", "2024-02-01", Some("https://x/a")))
            .await
            .unwrap();
        assert!(updated);

        let stored = repo.get_devotional(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "A (revisi)");
        assert!(!stored.visible);
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_false() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(!repo
            .update_synced_content(42, draft("A", "2024-02-01", Some("https://x/a")))
            .await
            .unwrap());
        assert!(!repo.update_content(42, draft("A", "2024-02-01", None)).await.unwrap());
        assert!(!repo.set_visible(42, true).await.unwrap());
        assert!(!repo.delete_devotional(42).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_visibility_and_source() {
        let repo = Repository::in_memory().await.unwrap();
        let a = repo
            .insert_synced(draft("A", "2024-02-01", Some("https://x/a")))
            .await
            .unwrap();
        repo.insert_synced(draft("B", "2024-02-02", Some("https://x/b")))
            .await
            .unwrap();
        repo.insert_devotional(draft("C", "2024-02-03", None), DevotionalSource::Manual)
            .await
            .unwrap();
        repo.set_visible(a, false).await.unwrap();

        let (items, total) = repo
            .list_devotionals(ListQuery::new(Some(true), None, 1, 20))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            items.iter().map(|d| d.title.as_str()).collect::<Vec<_>>(),
            vec!["C", "B"]
        );

        let (items, total) = repo
            .list_devotionals(ListQuery::new(None, Some(DevotionalSource::Synced), 1, 1))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "B");

        let (items, _) = repo
            .list_devotionals(ListQuery::new(None, Some(DevotionalSource::Synced), 2, 1))
            .await
            .unwrap();
        assert_eq!(items[0].title, "A");
    }

    #[tokio::test]
    async fn today_lookup_prefers_exact_date() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_synced(draft("Kemarin", "2024-02-01", Some("https://x/1")))
            .await
            .unwrap();
        repo.insert_synced(draft("Hari ini", "2024-02-02", Some("https://x/2")))
            .await
            .unwrap();

        let today = repo.today_or_latest(date("2024-02-02")).await.unwrap();
        assert!(today.is_today);
        assert_eq!(today.entry.unwrap().title, "Hari ini");
    }

    #[tokio::test]
    async fn today_lookup_falls_back_to_latest_visible() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_synced(draft("Lama", "2024-01-30", Some("https://x/1")))
            .await
            .unwrap();
        let hidden = repo
            .insert_synced(draft("Tersembunyi", "2024-02-01", Some("https://x/2")))
            .await
            .unwrap();
        repo.set_visible(hidden, false).await.unwrap();
        repo.insert_synced(draft("Besok", "2024-02-03", Some("https://x/3")))
            .await
            .unwrap();

        let today = repo.today_or_latest(date("2024-02-02")).await.unwrap();
        assert!(!today.is_today);
        assert_eq!(today.entry.unwrap().title, "Lama");
    }

    #[tokio::test]
    async fn today_lookup_on_empty_store() {
        let repo = Repository::in_memory().await.unwrap();
        let today = repo.today_or_latest(date("2024-02-02")).await.unwrap();
        assert!(today.entry.is_none());
        assert!(!today.is_today);
    }

    #[tokio::test]
    async fn delete_all_clears_table() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_synced(draft("A", "2024-02-01", Some("https://x/a")))
            .await
            .unwrap();
        repo.insert_devotional(draft("B", "2024-02-01", None), DevotionalSource::Manual)
            .await
            .unwrap();

        assert_eq!(repo.delete_all_devotionals().await.unwrap(), 2);
        assert!(repo.get_all_devotionals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bible_upsert_is_idempotent_on_natural_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bible.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();

        let verse = |text: &str| BibleVerse {
            book: "JHN".to_string(),
            chapter: 3,
            verse: 16,
            translation: "TB".to_string(),
            text: text.to_string(),
        };

        repo.upsert_bible_verses(vec![verse("Karena begitu besar")])
            .await
            .unwrap();
        repo.upsert_bible_verses(vec![verse("Karena begitu besar kasih Allah")])
            .await
            .unwrap();

        assert_eq!(repo.count_bible_verses("TB").await.unwrap(), 1);
        assert_eq!(repo.count_bible_verses("KJV").await.unwrap(), 0);
    }
}
