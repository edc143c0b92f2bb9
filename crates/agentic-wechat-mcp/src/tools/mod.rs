//! MCP tool implementations.

pub mod args;
pub mod get_account_info;
pub mod get_article_content;
pub mod get_public_article_content;
pub mod list_articles;
pub mod registry;
pub mod search_accounts;
pub mod search_public_articles;

pub use registry::ToolRegistry;
