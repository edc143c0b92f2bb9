//! Client settings, cache namespaces, and pacing/retry policies.

use std::time::Duration;

/// Default base of the official JSON API.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com/cgi-bin";

/// Default base of the public search surface.
pub const DEFAULT_SEARCH_BASE: &str = "https://weixin.sogou.com";

/// Origin that public article URLs must belong to.
pub const DEFAULT_ARTICLE_ORIGIN: &str = "https://mp.weixin.qq.com";

/// Safety margin subtracted from the declared token lifetime.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 300;

/// Lower bound for the cached token TTL.
pub const TOKEN_MIN_TTL_SECS: i64 = 60;

/// Lifetime assumed when the token response omits `expires_in`.
pub const TOKEN_DEFAULT_LIFETIME_SECS: i64 = 7200;

/// Cached operation, each with its own TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    AccessToken,
    AccountInfo,
    ArticleList,
    ArticleContent,
    SearchResults,
    AccountSearch,
    PublicArticle,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::AccessToken => "access_token",
            Namespace::AccountInfo => "account_info",
            Namespace::ArticleList => "articles_list",
            Namespace::ArticleContent => "article_content",
            Namespace::SearchResults => "search_results",
            Namespace::AccountSearch => "account_search",
            Namespace::PublicArticle => "public_article",
        }
    }

    /// TTL in seconds. The token namespace is derived from the server's
    /// declared lifetime instead; see [`token_ttl_secs`].
    pub fn ttl_secs(&self) -> i64 {
        match self {
            Namespace::AccessToken => TOKEN_DEFAULT_LIFETIME_SECS - TOKEN_SAFETY_MARGIN_SECS,
            Namespace::AccountInfo | Namespace::ArticleList => 1800,
            Namespace::SearchResults | Namespace::AccountSearch => 3600,
            Namespace::ArticleContent | Namespace::PublicArticle => 86_400,
        }
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Cache TTL for a token with the given declared lifetime.
pub fn token_ttl_secs(expires_in: i64) -> i64 {
    expires_in
        .saturating_sub(TOKEN_SAFETY_MARGIN_SECS)
        .max(TOKEN_MIN_TTL_SECS)
}

/// Official account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

/// Bounded retry for the official API.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Fixed pause after a token-expiry signal.
    pub token_refresh_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            token_refresh_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Randomized pre-request delays for the scrape path.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub search: (Duration, Duration),
    pub content: (Duration, Duration),
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            search: (Duration::from_secs(1), Duration::from_secs(3)),
            content: (Duration::from_secs(2), Duration::from_secs(5)),
        }
    }
}

impl Pacing {
    /// No pacing at all.
    pub fn disabled() -> Self {
        Self {
            search: (Duration::ZERO, Duration::ZERO),
            content: (Duration::ZERO, Duration::ZERO),
        }
    }
}

/// Everything the upstream clients need to reach the platform.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Option<Credentials>,
    pub api_base: String,
    pub search_base: String,
    pub article_origin: String,
    pub api_timeout: Duration,
    pub search_timeout: Duration,
    pub content_timeout: Duration,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            api_base: DEFAULT_API_BASE.to_string(),
            search_base: DEFAULT_SEARCH_BASE.to_string(),
            article_origin: DEFAULT_ARTICLE_ORIGIN.to_string(),
            api_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(30),
            content_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            pacing: Pacing::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_credentials(mut self, app_id: &str, app_secret: &str) -> Self {
        if !app_id.is_empty() && !app_secret.is_empty() {
            self.credentials = Some(Credentials {
                app_id: app_id.to_string(),
                app_secret: app_secret.to_string(),
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ttl_margin_and_floor() {
        assert_eq!(token_ttl_secs(7200), 6900);
        assert_eq!(token_ttl_secs(320), TOKEN_MIN_TTL_SECS);
        assert_eq!(token_ttl_secs(0), TOKEN_MIN_TTL_SECS);
        assert_eq!(token_ttl_secs(i64::MIN), TOKEN_MIN_TTL_SECS);
        assert_eq!(token_ttl_secs(i64::MAX), i64::MAX - TOKEN_SAFETY_MARGIN_SECS);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_blank_credentials_are_ignored() {
        let config = ClientConfig::default().with_credentials("wx123", "");
        assert!(config.credentials.is_none());
        let config = ClientConfig::default().with_credentials("wx123", "secret");
        assert!(config.credentials.is_some());
        assert!(!format!("{:?}", config.credentials).contains("secret"));
    }
}
