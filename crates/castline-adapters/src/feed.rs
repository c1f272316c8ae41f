//! RSS/Atom feed polling

use async_trait::async_trait;
use castline_core::http::get_bytes;
use castline_core::retry_with_backoff;
use castline_pipeline::{FeedPoller, FeedSource, FeedUnavailable, RawEntry};
use chrono::{DateTime, Utc};
use feed_rs::parser::{self, ParseFeedError};

const FEED_ACCEPT: &str = "application/rss+xml,application/atom+xml,application/xml,text/xml;q=0.9,*/*;q=0.8";

/// Polls feeds over HTTP and parses them with `feed-rs`.
pub struct HttpFeedPoller {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpFeedPoller {
    pub fn new(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }
}

#[async_trait]
impl FeedPoller for HttpFeedPoller {
    async fn poll(&self, feed: &FeedSource) -> Result<Vec<RawEntry>, FeedUnavailable> {
        let body = retry_with_backoff(feed.id(), self.max_retries, || {
            get_bytes(&self.client, &feed.url, FEED_ACCEPT)
        })
        .await
        .map_err(|e| FeedUnavailable::new(feed.id(), e.to_string()))?;

        let entries = parse_feed(&body, Utc::now())
            .map_err(|e| FeedUnavailable::new(feed.id(), format!("unparsable feed: {e}")))?;
        log::debug!("{}: polled {} entries", feed.id(), entries.len());
        Ok(entries)
    }
}

/// Parse an RSS or Atom document into raw entries.
///
/// The entry link is the item id. Entries without a link are skipped.
/// A missing publication date falls back to the update date, then to `now`.
pub fn parse_feed(bytes: &[u8], now: DateTime<Utc>) -> Result<Vec<RawEntry>, ParseFeedError> {
    let feed = parser::parse(bytes)?;
    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let Some(link) = entry.links.first() else {
                log::debug!("skipping entry {} without link", entry.id);
                return None;
            };
            let url = link.href.trim().to_string();
            if url.is_empty() {
                return None;
            }
            Some(RawEntry {
                item_id: url.clone(),
                url,
                title: entry
                    .title
                    .map(|t| t.content.trim().to_string())
                    .unwrap_or_default(),
                published_at: entry.published.or(entry.updated).unwrap_or(now),
            })
        })
        .collect();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example/</link>
    <description>Headlines</description>
    <item>
      <title>Second story</title>
      <link>https://news.example/2</link>
      <guid>https://news.example/2</guid>
      <pubDate>Sun, 09 Mar 2025 14:05:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated story</title>
      <link>https://news.example/undated</link>
    </item>
    <item>
      <title>No link here</title>
      <guid isPermaLink="false">abc-123</guid>
      <pubDate>Sun, 09 Mar 2025 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2025-03-09T18:30:02Z</updated>
  <entry>
    <title>Atom entry</title>
    <link href="https://atom.example/entry-1"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2025-03-09T18:30:02Z</updated>
  </entry>
</feed>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_rss_items_with_links() {
        let entries = parse_feed(RSS.as_bytes(), now()).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.item_id, "https://news.example/2");
        assert_eq!(first.url, "https://news.example/2");
        assert_eq!(first.title, "Second story");
        assert_eq!(
            first.published_at,
            Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 0).unwrap()
        );
    }

    #[test]
    fn undated_entry_uses_now() {
        let entries = parse_feed(RSS.as_bytes(), now()).unwrap();
        let undated = entries
            .iter()
            .find(|e| e.url.ends_with("undated"))
            .unwrap();
        assert_eq!(undated.published_at, now());
    }

    #[test]
    fn atom_falls_back_to_updated() {
        let entries = parse_feed(ATOM.as_bytes(), now()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_id, "https://atom.example/entry-1");
        assert_eq!(
            entries[0].published_at,
            Utc.with_ymd_and_hms(2025, 3, 9, 18, 30, 2).unwrap()
        );
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed(b"<html><body>not a feed</body></html>", now()).is_err());
    }

    /// Requires network access: `cargo test -p castline-adapters -- --ignored`
    #[test]
    #[ignore]
    fn polls_live_feed() {
        let poller = HttpFeedPoller::new(castline_core::http_client().clone(), 1);
        let feed = FeedSource::named("bbc", "https://feeds.bbci.co.uk/news/rss.xml");
        let entries = castline_core::block_on(poller.poll(&feed)).unwrap();
        assert!(!entries.is_empty());
    }
}
