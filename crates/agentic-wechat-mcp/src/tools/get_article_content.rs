//! Tool `get_article_content`: Full body of an owned article.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::format::{self, Detail, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpError, McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArticleContentParams {
    media_id: String,
    #[serde(default = "markdown")]
    format: OutputFormat,
    #[serde(default = "detailed")]
    detail: Detail,
    #[serde(default)]
    include_html: bool,
}

fn markdown() -> OutputFormat {
    OutputFormat::Markdown
}

fn detailed() -> Detail {
    Detail::Detailed
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_article_content".to_string(),
        description: Some(
            "Fetch the full content of one of the account's articles by media_id \
             (obtain media_id from list_articles)."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "media_id": { "type": "string", "minLength": 1,
                              "description": "Article media_id from list_articles" },
                "format": args::format_schema("markdown"),
                "detail": args::detail_schema("detailed"),
                "include_html": { "type": "boolean", "default": false,
                                  "description": "Include the raw HTML body (json format only)" }
            },
            "required": ["media_id"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(true, false)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: ArticleContentParams = args::parse(args)?;
    if params.media_id.trim().is_empty() {
        return Err(McpError::InvalidParams(
            "media_id must not be empty".to_string(),
        ));
    }

    match ctx.official().article_content(&params.media_id).await {
        Ok(article) => Ok(ToolCallResult::text(format::truncate_response(
            format::official::article_content(
                &article,
                params.format,
                params.detail,
                params.include_html,
            ),
        ))),
        Err(e) => {
            tracing::warn!("get_article_content({}) failed: {e}", params.media_id);
            Ok(ToolCallResult::error(format::error_text(
                "Fetching article content",
                &e,
            )))
        }
    }
}
