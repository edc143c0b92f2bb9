//! Tool `list_articles`: Page through the account's own articles.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_wechat::official::MAX_PAGE_SIZE;

use crate::format::{self, Detail, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpError, McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

const NO_ARTICLES: &str = "No articles found. Check that:\n\
     1. The account has published articles\n\
     2. offset is within the number of published articles\n\
     3. The account has material management permission";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArticlesParams {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_count")]
    count: i64,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    detail: Detail,
}

fn default_count() -> i64 {
    10
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_articles".to_string(),
        description: Some(
            "List the official account's published articles, newest first, with paging. \
             The media_id of each entry can be passed to get_article_content."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "offset": { "type": "integer", "minimum": 0, "default": 0,
                            "description": "Index of the first article to return" },
                "count": { "type": "integer", "minimum": 1, "maximum": MAX_PAGE_SIZE, "default": 10,
                           "description": "Number of articles to return" },
                "format": args::format_schema("json"),
                "detail": args::detail_schema("concise")
            },
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(true, true)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: ListArticlesParams = args::parse(args)?;
    args::check_min("offset", params.offset, 0)?;
    args::check_range("count", params.count, 1, i64::from(MAX_PAGE_SIZE))?;
    let offset = u32::try_from(params.offset)
        .map_err(|_| McpError::InvalidParams("offset is too large".to_string()))?;

    match ctx
        .official()
        .list_articles(offset, params.count as u32)
        .await
    {
        Ok(articles) if articles.is_empty() => Ok(ToolCallResult::text(NO_ARTICLES.to_string())),
        Ok(articles) => Ok(ToolCallResult::text(format::truncate_response(
            format::official::article_list(&articles, params.format, params.detail),
        ))),
        Err(e) => {
            tracing::warn!("list_articles failed: {e}");
            Ok(ToolCallResult::error(format::error_text("Listing articles", &e)))
        }
    }
}
