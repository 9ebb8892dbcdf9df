//! Article link extraction from a fetched page.
//!
//! A link counts as an article when its path is a single first-level segment
//! that contains more than one hyphen, e.g. `https://example.com/some-article-title`.
//! This is a slug heuristic, not a guarantee.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("valid url regex"));

static ANCHOR: LazyLock<scraper::Selector> =
    LazyLock::new(|| scraper::Selector::parse("a[href]").expect("valid selector"));

/// All absolute `a[href]` targets of `html`, deduplicated and sorted.
pub fn extract_links(html: &str) -> BTreeSet<String> {
    let document = scraper::Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| ABSOLUTE_URL.find(href).map(|m| m.as_str().to_string()))
        .collect()
}

/// Whether `link` looks like a first-level article slug.
pub fn is_article_link(link: &str) -> bool {
    let Ok(parsed) = Url::parse(link) else {
        return false;
    };
    let path = parsed.path().trim_end_matches('/');
    path.matches('/').count() == 1 && path.matches('-').count() > 1
}

/// Article links of a page.
pub fn extract_articles(html: &str) -> BTreeSet<String> {
    extract_links(html)
        .into_iter()
        .filter(|link| is_article_link(link))
        .collect()
}
