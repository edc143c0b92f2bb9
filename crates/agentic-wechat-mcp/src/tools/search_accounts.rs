//! Tool `search_accounts`: Find public accounts by name or keyword.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::format::{self, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchAccountsParams {
    query: String,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    format: OutputFormat,
}

fn default_limit() -> i64 {
    10
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_accounts".to_string(),
        description: Some(
            "Search public official accounts by name or keyword via Sogou WeChat search."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1, "maxLength": 50,
                           "description": "Account name or keyword" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 20, "default": 10 },
                "format": args::format_schema("json")
            },
            "required": ["query"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(true, true)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: SearchAccountsParams = args::parse(args)?;
    args::check_len("query", &params.query, 1, 50)?;
    args::check_range("limit", params.limit, 1, 20)?;

    match ctx
        .public()
        .search_accounts(&params.query, params.limit as usize)
        .await
    {
        Ok(results) if results.is_empty() => Ok(ToolCallResult::text(format!(
            "No accounts matched \"{}\". Try a shorter or more general name.",
            params.query
        ))),
        Ok(results) => Ok(ToolCallResult::text(format::truncate_response(
            format::public::account_results(&results, params.format),
        ))),
        Err(e) => {
            tracing::warn!("search_accounts failed: {e}");
            Ok(ToolCallResult::error(format::error_text(
                "Searching accounts",
                &e,
            )))
        }
    }
}
