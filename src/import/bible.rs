use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::BibleVerse;

use super::books::Book;
use super::retry::{classify_error, classify_status, FetchFailure, RetryPolicy};

#[derive(Debug, Deserialize)]
struct ChapterResponse {
    verses: Vec<VerseEntry>,
}

#[derive(Debug, Deserialize)]
struct VerseEntry {
    verse: u32,
    text: String,
}

/// Per-run counts, printed once the import finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTally {
    pub imported_units: usize,
    pub verses: usize,
    /// Chapters the API reports as absent (404).
    pub skipped: usize,
    pub failed: usize,
}

pub struct BibleImporter<'a> {
    client: Client,
    api_base: String,
    repository: &'a Repository,
    policy: RetryPolicy,
    unit_delay: Duration,
}

impl<'a> BibleImporter<'a> {
    pub fn new(
        repository: &'a Repository,
        api_base: &str,
        policy: RetryPolicy,
        unit_delay: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("renungan-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository,
            policy,
            unit_delay,
        })
    }

    pub fn from_config(repository: &'a Repository, config: &Config) -> Result<Self> {
        let api_base = config
            .import
            .bible_api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::Config("import.bible_api_url is not configured".to_string()))?;

        Self::new(
            repository,
            api_base,
            RetryPolicy::from_config(&config.import),
            Duration::from_millis(config.import.unit_delay_ms),
            config.http_timeout(),
        )
    }

    /// Imports every chapter of `books`, one chapter at a time.
    pub async fn import(&self, translation: &str, books: &[Book]) -> ImportTally {
        let mut tally = ImportTally::default();

        for book in books {
            for chapter in 1..=book.chapters {
                match self.import_chapter(translation, book, chapter).await {
                    Ok(count) => {
                        tally.imported_units += 1;
                        tally.verses += count;
                    }
                    Err(FetchFailure::NotFound) => {
                        tracing::info!("{} {} not found in {}, skipping", book.name, chapter, translation);
                        tally.skipped += 1;
                    }
                    Err(e) => {
                        tracing::error!("Failed to import {} {}: {}", book.name, chapter, e);
                        tally.failed += 1;
                    }
                }

                if !self.unit_delay.is_zero() {
                    tokio::time::sleep(self.unit_delay).await;
                }
            }
        }

        tally
    }

    async fn import_chapter(
        &self,
        translation: &str,
        book: &Book,
        chapter: u32,
    ) -> std::result::Result<usize, FetchFailure> {
        let url = chapter_url(&self.api_base, translation, book.code, chapter);
        let body = self.policy.run(|_| self.fetch(&url)).await?;

        let verses = parse_chapter(&body, book.code, chapter, translation)
            .map_err(|e| FetchFailure::Fatal(format!("invalid response: {e}")))?;

        self.repository
            .upsert_bible_verses(verses)
            .await
            .map_err(|e| FetchFailure::Fatal(e.to_string()))
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        if let Some(failure) = classify_status(response.status()) {
            return Err(failure);
        }

        response.text().await.map_err(|e| classify_error(&e))
    }
}

pub fn chapter_url(api_base: &str, translation: &str, book: &str, chapter: u32) -> String {
    format!(
        "{}/{}/{}/{}",
        api_base.trim_end_matches('/'),
        urlencoding::encode(translation),
        urlencoding::encode(book),
        chapter
    )
}

pub fn parse_chapter(
    body: &str,
    book: &str,
    chapter: u32,
    translation: &str,
) -> Result<Vec<BibleVerse>> {
    let response: ChapterResponse = serde_json::from_str(body)?;

    let verses = response
        .verses
        .into_iter()
        .map(|v| (v.verse, v.text.split_whitespace().collect::<Vec<_>>().join(" ")))
        .filter(|(_, text)| !text.is_empty())
        .map(|(verse, text)| BibleVerse {
            book: book.to_string(),
            chapter,
            verse,
            translation: translation.to_string(),
            text,
        })
        .collect();

    Ok(verses)
}
