//! Output for the official account tools.

use serde_json::{json, Value};

use agentic_wechat::parse::html_text;
use agentic_wechat::{AccountInfo, ArticleContent, ArticleSummary};

use super::{clip, pretty_json, Detail, OutputFormat, CONCISE_BODY_CHARS};

pub fn account_info(info: &AccountInfo, format: OutputFormat, detail: Detail) -> String {
    match (format, detail) {
        (OutputFormat::Json, Detail::Concise) => pretty_json(&json!({
            "name": info.name,
            "type": info.kind,
            "verified": info.verified,
            "status": info.status,
        })),
        (OutputFormat::Json, Detail::Detailed) => pretty_json(info),
        (OutputFormat::Markdown, _) => {
            let mut lines = vec![
                "# Account Information\n".to_string(),
                format!("**Name**: {}", info.name),
                format!("**Type**: {}", info.kind),
                format!(
                    "**Verified**: {}",
                    if info.verified { "yes" } else { "no" }
                ),
                format!("**Status**: {}", info.status),
            ];
            if detail == Detail::Detailed {
                let stats = &info.stats;
                lines.push("\n## Material Counts".to_string());
                lines.push(format!("**Images**: {}", stats.image_count));
                lines.push(format!("**Voice**: {}", stats.voice_count));
                lines.push(format!("**Video**: {}", stats.video_count));
                lines.push(format!("**Articles**: {}", stats.news_count));

                if !info.api_quota.is_empty() {
                    lines.push("\n## API Quota".to_string());
                    for quota in &info.api_quota {
                        lines.push(format!("**{}**: {}", quota.api, quota.limit));
                    }
                }
            }
            lines.join("\n")
        }
    }
}

pub fn article_list(articles: &[ArticleSummary], format: OutputFormat, detail: Detail) -> String {
    match (format, detail) {
        (OutputFormat::Json, Detail::Concise) => {
            let rows: Vec<Value> = articles
                .iter()
                .map(|a| {
                    json!({
                        "media_id": a.media_id,
                        "title": a.title,
                        "url": a.url,
                        "update_time": a.update_time,
                        "author": a.author,
                    })
                })
                .collect();
            pretty_json(&rows)
        }
        (OutputFormat::Json, Detail::Detailed) => pretty_json(&articles),
        (OutputFormat::Markdown, _) => {
            let mut lines = vec!["# Articles\n".to_string()];
            for (i, article) in articles.iter().enumerate() {
                lines.push(format!("## {}. {}", i + 1, or_untitled(&article.title)));
                lines.push(format!("**Author**: {}", or_unknown(&article.author)));
                lines.push(format!("**media_id**: `{}`", article.media_id));
                if !article.update_time.is_empty() {
                    lines.push(format!("**Updated**: {}", article.update_time));
                }
                if !article.url.is_empty() {
                    lines.push(format!("**Link**: [Read]({})", article.url));
                }
                if detail == Detail::Detailed && !article.digest.is_empty() {
                    lines.push(format!("**Digest**: {}", article.digest));
                }
                lines.push(String::new());
            }
            lines.join("\n")
        }
    }
}

/// Owned articles carry an HTML body; everything except `include_html` JSON shows it as text.
pub fn article_content(
    article: &ArticleContent,
    format: OutputFormat,
    detail: Detail,
    include_html: bool,
) -> String {
    let text = html_text(&article.content);
    match (format, detail) {
        (OutputFormat::Json, Detail::Concise) => pretty_json(&json!({
            "title": article.title,
            "author": article.author,
            "content": clip(&text, CONCISE_BODY_CHARS),
            "url": article.url,
        })),
        (OutputFormat::Json, Detail::Detailed) => {
            let mut value = serde_json::to_value(article).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                if !include_html {
                    map.remove("content");
                }
                map.insert("text".to_string(), Value::String(text));
            }
            pretty_json(&value)
        }
        (OutputFormat::Markdown, _) => {
            let mut lines = vec![
                format!("# {}\n", or_untitled(&article.title)),
                format!("**Author**: {}", or_unknown(&article.author)),
            ];
            if detail == Detail::Detailed {
                if !article.digest.is_empty() {
                    lines.push(format!("**Digest**: {}", article.digest));
                }
                if !article.url.is_empty() {
                    lines.push(format!("**Link**: [Read]({})", article.url));
                }
                lines.push(format!(
                    "**Length**: {} characters, about {} min read",
                    article.word_count, article.read_time_minutes
                ));
            }
            lines.push("\n## Content\n".to_string());
            lines.push(text);
            lines.join("\n")
        }
    }
}

pub(crate) fn or_untitled(title: &str) -> &str {
    if title.is_empty() {
        "Untitled"
    } else {
        title
    }
}

pub(crate) fn or_unknown(author: &str) -> &str {
    if author.is_empty() {
        "Unknown author"
    } else {
        author
    }
}
