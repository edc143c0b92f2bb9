//! Tool `search_public_articles`: Keyword search over public articles.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::format::{self, Detail, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArticlesParams {
    query: String,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    detail: Detail,
}

fn default_limit() -> i64 {
    10
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_public_articles".to_string(),
        description: Some(
            "Search public WeChat articles from any account via Sogou WeChat search. \
             No API credentials needed, but requests are throttled upstream; search sparingly."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1, "maxLength": 100,
                           "description": "Search keywords" },
                "account_name": { "type": "string",
                                  "description": "Restrict results to this account (optional)" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 20, "default": 10 },
                "format": args::format_schema("json"),
                "detail": args::detail_schema("concise")
            },
            "required": ["query"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(true, true)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: SearchArticlesParams = args::parse(args)?;
    args::check_len("query", &params.query, 1, 100)?;
    args::check_range("limit", params.limit, 1, 20)?;

    let result = ctx
        .public()
        .search_articles(
            &params.query,
            params.account_name.as_deref(),
            params.limit as usize,
        )
        .await;

    match result {
        Ok(results) if results.is_empty() => Ok(ToolCallResult::text(no_results(&params.query))),
        Ok(results) => Ok(ToolCallResult::text(format::truncate_response(
            format::public::search_results(&results, params.format, params.detail),
        ))),
        Err(e) => {
            tracing::warn!("search_public_articles failed: {e}");
            Ok(ToolCallResult::error(format::error_text(
                "Searching public articles",
                &e,
            )))
        }
    }
}

fn no_results(query: &str) -> String {
    format!(
        "No articles matched \"{query}\".\n\n\
         Suggestions:\n\
         1. Try broader keywords\n\
         2. Check the spelling\n\
         3. Drop account_name to widen the search\n\
         4. Retry later; the search surface may be throttling"
    )
}
