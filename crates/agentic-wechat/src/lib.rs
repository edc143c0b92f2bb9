//! AgenticWeChat: cached, token-aware access to WeChat Official Account content
//! and public article search.

pub mod cache;
pub mod config;
pub mod error;
pub mod official;
pub mod parse;
pub mod public;
pub mod scrape;
pub mod token;
pub mod types;
pub mod upstream;

pub use cache::{cache_key, CacheEntry, CacheParams, CacheStats, CacheStore, Clock, SystemClock};
pub use config::{ClientConfig, Credentials, Namespace, Pacing, RetryPolicy};
pub use error::{Remediation, WechatError, WechatResult};
pub use official::OfficialAccountService;
pub use public::PublicSearchService;
pub use scrape::ScrapeInvoker;
pub use token::TokenProvider;
pub use types::*;
pub use upstream::UpstreamInvoker;
