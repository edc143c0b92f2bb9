//! Tool registration and dispatch.

use serde_json::Value;

use crate::service::ServiceContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    get_account_info, get_article_content, get_public_article_content, list_articles,
    search_accounts, search_public_articles,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            get_account_info::definition(),
            list_articles::definition(),
            get_article_content::definition(),
            search_public_articles::definition(),
            get_public_article_content::definition(),
            search_accounts::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        ctx: &ServiceContext,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "get_account_info" => get_account_info::execute(args, ctx).await,
            "list_articles" => list_articles::execute(args, ctx).await,
            "get_article_content" => get_article_content::execute(args, ctx).await,
            "search_public_articles" => search_public_articles::execute(args, ctx).await,
            "get_public_article_content" => get_public_article_content::execute(args, ctx).await,
            "search_accounts" => search_accounts::execute(args, ctx).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
