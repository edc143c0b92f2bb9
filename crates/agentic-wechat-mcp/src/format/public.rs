//! Output for the public search tools.

use serde_json::{json, Value};

use agentic_wechat::{AccountSearchResult, PublicArticle, SearchResult};

use super::official::{or_unknown, or_untitled};
use super::{clip, pretty_json, Detail, OutputFormat, CONCISE_BODY_CHARS};

pub fn search_results(results: &[SearchResult], format: OutputFormat, detail: Detail) -> String {
    match (format, detail) {
        (OutputFormat::Json, Detail::Concise) => {
            let rows: Vec<Value> = results
                .iter()
                .map(|r| {
                    json!({
                        "title": r.title,
                        "account": r.account,
                        "url": r.url,
                        "publish_time": r.publish_time,
                    })
                })
                .collect();
            pretty_json(&rows)
        }
        (OutputFormat::Json, Detail::Detailed) => pretty_json(&results),
        (OutputFormat::Markdown, _) => {
            let mut lines = vec!["# Search Results\n".to_string()];
            for (i, result) in results.iter().enumerate() {
                lines.push(format!("## {}. {}", i + 1, or_untitled(&result.title)));
                lines.push(format!("**Account**: {}", result.account));
                if !result.publish_time.is_empty() {
                    lines.push(format!("**Published**: {}", result.publish_time));
                }
                if !result.url.is_empty() {
                    lines.push(format!("**Link**: [Read]({})", result.url));
                }
                if detail == Detail::Detailed && !result.digest.is_empty() {
                    lines.push(format!("**Digest**: {}", result.digest));
                }
                lines.push(String::new());
            }
            lines.join("\n")
        }
    }
}

pub fn account_results(results: &[AccountSearchResult], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty_json(&results),
        OutputFormat::Markdown => {
            let mut lines = vec!["# Account Search Results\n".to_string()];
            for (i, account) in results.iter().enumerate() {
                lines.push(format!("## {}. {}", i + 1, account.name));
                if let Some(id) = &account.wechat_id {
                    lines.push(format!("**WeChat ID**: {id}"));
                }
                lines.push(format!(
                    "**Verified**: {}",
                    if account.verified { "yes" } else { "no" }
                ));
                if !account.description.is_empty() {
                    lines.push(format!("**Description**: {}", account.description));
                }
                lines.push(String::new());
            }
            lines.join("\n")
        }
    }
}

/// Image links are only shown when `extract_images` is set.
pub fn public_article(
    article: &PublicArticle,
    format: OutputFormat,
    detail: Detail,
    extract_images: bool,
) -> String {
    match (format, detail) {
        (OutputFormat::Json, Detail::Concise) => pretty_json(&json!({
            "title": article.title,
            "author": article.author,
            "content": clip(&article.content, CONCISE_BODY_CHARS),
            "url": article.url,
        })),
        (OutputFormat::Json, Detail::Detailed) => {
            let mut value = serde_json::to_value(article).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                if !extract_images {
                    map.remove("images");
                }
            }
            pretty_json(&value)
        }
        (OutputFormat::Markdown, _) => {
            let mut lines = vec![
                format!("# {}\n", or_untitled(&article.title)),
                format!("**Author**: {}", or_unknown(&article.author)),
            ];
            if detail == Detail::Detailed {
                if !article.publish_time.is_empty() {
                    lines.push(format!("**Published**: {}", article.publish_time));
                }
                lines.push(format!("**Link**: [Read]({})", article.url));
                lines.push(format!(
                    "**Length**: {} characters, about {} min read",
                    article.word_count, article.read_time_minutes
                ));
            }
            lines.push("\n## Content\n".to_string());
            if article.content.is_empty() {
                lines.push("_The article body could not be extracted._".to_string());
            } else {
                lines.push(article.content.clone());
            }
            if extract_images && !article.images.is_empty() {
                lines.push("\n## Images\n".to_string());
                lines.extend(article.images.iter().map(|src| format!("- {src}")));
            }
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> PublicArticle {
        PublicArticle {
            title: "Public".into(),
            author: "Writer".into(),
            publish_time: "2024-01-02".into(),
            content: "line one\nline two".into(),
            url: "https://mp.weixin.qq.com/s/x".into(),
            images: vec!["https://img.example/1.png".into()],
            word_count: 17,
            read_time_minutes: 1,
        }
    }

    #[test]
    fn test_images_hidden_unless_requested() {
        let plain: Value = serde_json::from_str(&public_article(
            &article(),
            OutputFormat::Json,
            Detail::Detailed,
            false,
        ))
        .unwrap();
        assert!(plain.get("images").is_none());

        let md = public_article(&article(), OutputFormat::Markdown, Detail::Detailed, true);
        assert!(md.contains("## Images"));
        assert!(md.contains("- https://img.example/1.png"));
        assert!(md.contains("**Published**: 2024-01-02"));
    }

    #[test]
    fn test_concise_search_json_omits_digest() {
        let results = vec![SearchResult {
            title: "T".into(),
            account: "A".into(),
            url: "u".into(),
            digest: "long digest".into(),
            publish_time: "2024-01-01".into(),
        }];
        let value: Value =
            serde_json::from_str(&search_results(&results, OutputFormat::Json, Detail::Concise))
                .unwrap();
        assert_eq!(value[0]["account"], "A");
        assert!(value[0].get("digest").is_none());
    }

    #[test]
    fn test_account_markdown() {
        let results = vec![AccountSearchResult {
            name: "Rust".into(),
            wechat_id: Some("rust-lang".into()),
            description: "news".into(),
            verified: false,
        }];
        let md = account_results(&results, OutputFormat::Markdown);
        assert!(md.contains("## 1. Rust"));
        assert!(md.contains("**WeChat ID**: rust-lang"));
        assert!(md.contains("**Verified**: no"));
    }
}
