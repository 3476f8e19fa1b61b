use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Link;
use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;

/// One entry of the upstream feed, before any content extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Full content when the feed carries it, otherwise the summary.
    pub content: Option<String>,
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("renungan-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches `url` and returns its entries in feed order.
    pub async fn fetch_items(&self, url: &str) -> Result<Vec<FeedItem>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let items = Self::parse_items(&bytes[..])?;
        tracing::debug!("Fetched {} items from {}", items.len(), url);
        Ok(items)
    }

    pub fn parse_items(bytes: &[u8]) -> Result<Vec<FeedItem>> {
        let feed = parser::parse(bytes)?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                // Try content first, then fall back to summary
                let content = entry
                    .content
                    .and_then(|c| c.body)
                    .filter(|body| !body.trim().is_empty())
                    .or_else(|| entry.summary.map(|s| s.content));

                FeedItem {
                    title: entry.title.map(|t| t.content),
                    link: permalink(&entry.links),
                    published: entry.published.or(entry.updated),
                    content,
                }
            })
            .collect();

        Ok(items)
    }
}

/// The entry's own page: the `alternate` link (or one without `rel`), else the
/// first link. Atom feeds often list `replies`/`self` links before it.
fn permalink(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel.eq_ignore_ascii_case("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Renungan Harian</title>
    <link>https://x/</link>
    <description>Renungan</description>
    <item>
      <title>Kasih Allah</title>
      <link>https://x/a</link>
      <pubDate>Mon, 12 Feb 2024 00:30:00 +0000</pubDate>
      <description>Ringkasan saja</description>
      <content:encoded><![CDATA[<p>Isi lengkap</p>]]></content:encoded>
    </item>
    <item>
      <title>Pengharapan</title>
      <link>https://x/b</link>
      <description><![CDATA[<p>Hanya ringkasan</p>]]></description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_in_feed_order() {
        let items = FeedFetcher::parse_items(RSS.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Kasih Allah"));
        assert_eq!(items[0].link.as_deref(), Some("https://x/a"));
        assert_eq!(items[1].link.as_deref(), Some("https://x/b"));
        assert!(items[0].published.is_some());
        assert!(items[1].published.is_none());
    }

    #[test]
    fn prefers_full_content_over_summary() {
        let items = FeedFetcher::parse_items(RSS.as_bytes()).unwrap();

        assert!(items[0].content.as_deref().unwrap().contains("Isi lengkap"));
        assert!(items[1].content.as_deref().unwrap().contains("Hanya ringkasan"));
    }

    #[test]
    fn atom_entry_links_to_the_alternate_page() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>tag:x,2024:blog</id>
  <title>Renungan Harian</title>
  <updated>2024-02-12T00:30:00Z</updated>
  <entry>
    <id>tag:x,2024:post-1</id>
    <title>Kasih Allah</title>
    <published>2024-02-12T00:30:00Z</published>
    <updated>2024-02-12T00:30:00Z</updated>
    <link rel="replies" type="application/atom+xml" href="https://x/feeds/1/comments"/>
    <link rel="self" type="application/atom+xml" href="https://x/feeds/posts/1"/>
    <link rel="alternate" type="text/html" href="https://x/2024/02/kasih-allah.html"/>
    <content type="html">&lt;p&gt;Isi&lt;/p&gt;</content>
  </entry>
  <entry>
    <id>tag:x,2024:post-2</id>
    <title>Pengharapan</title>
    <updated>2024-02-13T00:30:00Z</updated>
    <link rel="self" href="https://x/feeds/posts/2"/>
  </entry>
</feed>"#;

        let items = FeedFetcher::parse_items(atom.as_bytes()).unwrap();

        assert_eq!(items[0].link.as_deref(), Some("https://x/2024/02/kasih-allah.html"));
        // Nothing better than `self`, so the first link is kept
        assert_eq!(items[1].link.as_deref(), Some("https://x/feeds/posts/2"));
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Kosong</title></channel></rss>"#;
        assert!(FeedFetcher::parse_items(rss.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(FeedFetcher::parse_items(b"not a feed").is_err());
    }
}
