//! Rendering of records into tool output text.

pub mod official;
pub mod public;

use serde::{Deserialize, Serialize};

use agentic_wechat::WechatError;

/// Upper bound on a single tool response, in characters.
pub const MAX_RESPONSE_CHARS: usize = 100_000;

/// Body length kept in concise JSON article output, in characters.
pub const CONCISE_BODY_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    #[default]
    Concise,
    Detailed,
}

/// Pretty JSON with non-ASCII text left as is.
pub fn pretty_json(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Keep at most `max` characters, marking the cut with an ellipsis.
pub fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Cap a response at [`MAX_RESPONSE_CHARS`] and say so when it was cut.
pub fn truncate_response(text: String) -> String {
    let total = text.chars().count();
    let Some((cut, _)) = text.char_indices().nth(MAX_RESPONSE_CHARS) else {
        return text;
    };
    format!(
        "{}\n\n... [response truncated]\n\n\
         Suggestions:\n\
         1. Use the 'concise' detail level\n\
         2. Fetch content in smaller pages\n\
         3. Use more specific search terms\n\n\
         Total characters: {total}\n\
         Characters shown: {MAX_RESPONSE_CHARS}\n",
        &text[..cut]
    )
}

/// Tool-level failure text: kind, message, and what to do about it.
pub fn error_text(context: &str, err: &WechatError) -> String {
    format!(
        "{context} failed [{kind}]: {err}\n\nHint: {hint}",
        kind = err.kind(),
        hint = err.hint()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_counts_characters() {
        assert_eq!(clip("微信公众号", 2), "微信...");
        assert_eq!(clip("short", 10), "short");
    }

    #[test]
    fn test_truncate_response_adds_notice() {
        let short = "x".repeat(10);
        assert_eq!(truncate_response(short.clone()), short);

        let long = "字".repeat(MAX_RESPONSE_CHARS + 5);
        let out = truncate_response(long);
        assert!(out.starts_with(&"字".repeat(MAX_RESPONSE_CHARS)));
        assert!(out.contains("[response truncated]"));
        assert!(out.contains(&format!("Total characters: {}", MAX_RESPONSE_CHARS + 5)));
    }

    #[test]
    fn test_error_text_includes_hint() {
        let err = WechatError::Upstream {
            code: 45009,
            message: "reach max api daily quota limit".into(),
        };
        let text = error_text("Listing articles", &err);
        assert!(text.starts_with("Listing articles failed [upstream]"));
        assert!(text.contains("45009"));
        assert!(text.contains("quota"));
    }
}
