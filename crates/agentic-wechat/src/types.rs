//! Structured records produced by the API and scrape paths.

use serde::{Deserialize, Serialize};

/// Characters read per minute when estimating reading time.
const READ_CHARS_PER_MINUTE: usize = 300;

/// Material counts reported for the configured account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialStats {
    pub image_count: u64,
    pub voice_count: u64,
    pub video_count: u64,
    pub news_count: u64,
}

/// Basic information about the configured official account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub kind: String,
    pub verified: bool,
    pub status: String,
    pub stats: MaterialStats,
    pub api_quota: Vec<QuotaNote>,
}

/// A documented daily API limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaNote {
    pub api: String,
    pub limit: String,
}

/// One article in the owned material list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub media_id: String,
    pub title: String,
    pub author: String,
    pub digest: String,
    pub url: String,
    pub content_source_url: String,
    pub thumb_media_id: String,
    pub show_cover_pic: i64,
    pub update_time: String,
}

/// Full content of an owned article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub media_id: String,
    pub title: String,
    pub author: String,
    pub digest: String,
    /// Article body as HTML.
    pub content: String,
    pub content_source_url: String,
    pub url: String,
    pub thumb_media_id: String,
    pub show_cover_pic: i64,
    pub need_open_comment: i64,
    pub only_fans_can_comment: i64,
    pub word_count: usize,
    pub read_time_minutes: usize,
}

/// One hit from the public article search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub account: String,
    pub url: String,
    pub digest: String,
    pub publish_time: String,
}

/// One hit from the public account search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSearchResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wechat_id: Option<String>,
    pub description: String,
    pub verified: bool,
}

/// A public article fetched and extracted from its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicArticle {
    pub title: String,
    pub author: String,
    pub publish_time: String,
    /// Plain-text body, one text run per line.
    pub content: String,
    pub url: String,
    pub images: Vec<String>,
    pub word_count: usize,
    pub read_time_minutes: usize,
}

/// Offset of China Standard Time, used for every displayed timestamp.
const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Render a unix timestamp as `YYYY-MM-DD HH:MM:SS` in China Standard Time.
pub fn format_timestamp(secs: i64) -> String {
    let Some(offset) = chrono::FixedOffset::east_opt(CST_OFFSET_SECS) else {
        return String::new();
    };
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Character count and estimated reading minutes (at least one).
pub fn reading_stats(text: &str) -> (usize, usize) {
    let words = text.chars().count();
    (words, (words / READ_CHARS_PER_MINUTE).max(1))
}
