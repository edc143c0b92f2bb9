//! Tool `get_public_article_content`: Fetch and extract a public article.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_wechat::WechatError;

use crate::format::{self, Detail, OutputFormat};
use crate::service::ServiceContext;
use crate::types::{McpError, McpResult, ToolAnnotations, ToolCallResult, ToolDefinition};

use super::args;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PublicArticleParams {
    article_url: String,
    #[serde(default = "markdown")]
    format: OutputFormat,
    #[serde(default = "detailed")]
    detail: Detail,
    #[serde(default)]
    extract_images: bool,
}

fn markdown() -> OutputFormat {
    OutputFormat::Markdown
}

fn detailed() -> Detail {
    Detail::Detailed
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_public_article_content".to_string(),
        description: Some(
            "Fetch the text of a public article (https://mp.weixin.qq.com/s/...), usually a \
             link from search_public_articles. Subject to anti-automation pushback."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "article_url": { "type": "string",
                                 "description": "Article link, https://mp.weixin.qq.com/s/..." },
                "format": args::format_schema("markdown"),
                "detail": args::detail_schema("detailed"),
                "extract_images": { "type": "boolean", "default": false,
                                    "description": "Include image links found in the article" }
            },
            "required": ["article_url"],
            "additionalProperties": false
        }),
        annotations: Some(ToolAnnotations::read_only(false, true)),
    }
}

pub async fn execute(args: Value, ctx: &ServiceContext) -> McpResult<ToolCallResult> {
    let params: PublicArticleParams = args::parse(args)?;

    match ctx.public().public_article(&params.article_url).await {
        Ok(article) => Ok(ToolCallResult::text(format::truncate_response(
            format::public::public_article(
                &article,
                params.format,
                params.detail,
                params.extract_images,
            ),
        ))),
        // A malformed link is an argument problem, not a fetch failure.
        Err(WechatError::Validation(message)) => Err(McpError::InvalidParams(message)),
        Err(e) => {
            tracing::warn!("get_public_article_content failed: {e}");
            Ok(ToolCallResult::error(format::error_text(
                "Fetching public article",
                &e,
            )))
        }
    }
}
