//! AgenticWeChat MCP Server: agent access to WeChat Official Account content
//! and public article search.

pub mod config;
pub mod format;
pub mod protocol;
pub mod service;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{client_config_from_env, resolve_cache_dir};
pub use protocol::ProtocolHandler;
pub use service::ServiceContext;
pub use transport::StdioTransport;
