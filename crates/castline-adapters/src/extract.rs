//! Article text extraction from HTML

use std::sync::LazyLock;

use async_trait::async_trait;
use castline_core::http::get_bytes;
use castline_core::retry_with_backoff;
use castline_pipeline::{BoxError, Extractor};
use scraper::{Html, Selector};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

static ARTICLE_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article p").expect("valid selector"));
static ALL_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Downloads a page and keeps its paragraph text.
pub struct HtmlExtractor {
    client: reqwest::Client,
    max_retries: u32,
}

impl HtmlExtractor {
    pub fn new(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn extract_text(&self, url: &str) -> Result<String, BoxError> {
        let body = retry_with_backoff(url, self.max_retries, || {
            get_bytes(&self.client, url, HTML_ACCEPT)
        })
        .await?;

        let html = String::from_utf8_lossy(&body);
        let paragraphs = extract_paragraphs(&html);
        if paragraphs.is_empty() {
            return Err(format!("no paragraphs found at {url}").into());
        }
        log::debug!("{url}: extracted {} paragraphs", paragraphs.len());
        Ok(paragraphs.join("\n"))
    }
}

/// Non-empty, whitespace-normalised paragraphs of a document.
///
/// Paragraphs inside `<article>` win; otherwise every `<p>` is used.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let collect = |selector: &Selector| -> Vec<String> {
        document
            .select(selector)
            .map(|p| normalize_whitespace(&p.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect()
    };

    let in_article = collect(&ARTICLE_PARAGRAPHS);
    if !in_article.is_empty() {
        return in_article;
    }
    collect(&ALL_PARAGRAPHS)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_paragraphs() {
        let html = r#"<html><body>
            <p>Cookie banner text.</p>
            <article>
              <h1>Title</h1>
              <p>First   paragraph
                 of the story.</p>
              <p>  </p>
              <p>Second <b>bold</b> paragraph.</p>
            </article>
            <footer><p>Copyright.</p></footer>
        </body></html>"#;
        assert_eq!(
            extract_paragraphs(html),
            vec![
                "First paragraph of the story.".to_string(),
                "Second bold paragraph.".to_string()
            ]
        );
    }

    #[test]
    fn falls_back_to_all_paragraphs() {
        let html = "<div><p>One.</p><section><p>Two.</p></section></div>";
        assert_eq!(extract_paragraphs(html), vec!["One.", "Two."]);
    }

    #[test]
    fn no_paragraphs_is_empty() {
        assert!(extract_paragraphs("<div>Just a div</div>").is_empty());
    }

    /// Requires network access: `cargo test -p castline-adapters -- --ignored`
    #[test]
    #[ignore]
    fn extracts_live_page() {
        let extractor = HtmlExtractor::new(castline_core::http_client().clone(), 1);
        let text =
            castline_core::block_on(extractor.extract_text("https://www.rust-lang.org/")).unwrap();
        assert!(!text.is_empty());
    }
}
