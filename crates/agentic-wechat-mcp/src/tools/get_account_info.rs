//! Tool `get_account_info`: Confirm credentials and show account metadata.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::format::{self, Detail, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccountInfoParams {
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    detail: Detail,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_account_info".to_string(),
        description: Some(
            "Show basic information and material counts for the configured official account. \
             Call this first to verify WECHAT_APPID / WECHAT_SECRET."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "format": args::format_schema("json"),
                "detail": args::detail_schema("concise")
            },
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(true, false)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: AccountInfoParams = args::parse(args)?;

    let swept = ctx.sweep_cache().await;
    if swept > 0 {
        tracing::debug!("Swept {swept} expired cache entries");
    }

    match ctx.official().account_info().await {
        Ok(info) => Ok(ToolCallResult::text(format::truncate_response(
            format::official::account_info(&info, params.format, params.detail),
        ))),
        Err(e) => {
            tracing::warn!("get_account_info failed: {e}");
            Ok(ToolCallResult::error(format::error_text(
                "Fetching account information",
                &e,
            )))
        }
    }
}
