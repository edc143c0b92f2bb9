//! Error taxonomy and the remediation table for platform error codes.

/// Error code the platform returns when an access token has expired.
pub const TOKEN_EXPIRED_CODE: i64 = 42001;

/// What a user has to do about an upstream rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    AuthMisconfiguration,
    TokenExpired,
    QuotaExceeded,
    PermissionDenied,
    InvalidParameter,
    Unknown,
}

impl Remediation {
    /// Map a platform `errcode` to its remediation category.
    pub fn for_code(code: i64) -> Self {
        match code {
            40001 | 40013 | 40125 | 40164 | 41002 | 41004 => Remediation::AuthMisconfiguration,
            40014 | TOKEN_EXPIRED_CODE => Remediation::TokenExpired,
            45009 | 45011 => Remediation::QuotaExceeded,
            48001 | 50001 | 50002 => Remediation::PermissionDenied,
            40004 | 40007 | 40008 | 44002 | 47001 => Remediation::InvalidParameter,
            _ => Remediation::Unknown,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Remediation::AuthMisconfiguration => {
                "Check WECHAT_APPID and WECHAT_SECRET, make sure the AppSecret belongs to this \
                 AppID, and add this server's IP address to the platform whitelist."
            }
            Remediation::TokenExpired => {
                "The access token expired. It is refreshed automatically; retry shortly and \
                 check the system clock if this persists."
            }
            Remediation::QuotaExceeded => {
                "The daily API quota is exhausted (token fetch: 2000/day, material management: \
                 10/day). Rely on cached results and retry tomorrow."
            }
            Remediation::PermissionDenied => {
                "This account is not authorized for the API. Confirm the account type and \
                 verification status in the platform console."
            }
            Remediation::InvalidParameter => {
                "A request parameter was rejected. Verify identifiers such as media_id \
                 (obtain them from list_articles) and paging values."
            }
            Remediation::Unknown => "Consult the platform error code reference.",
        }
    }
}

/// Errors produced by the core library.
#[derive(thiserror::Error, Debug)]
pub enum WechatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error ({code}): {message}")]
    Upstream { code: i64, message: String },

    #[error("Search rate limited, cool down for {cooldown}")]
    RateLimited { cooldown: &'static str },

    #[error("Verification challenge served, cool down for {cooldown}")]
    Challenge { cooldown: &'static str },

    #[error("Fetch failed (HTTP {status})")]
    Fetch { status: u16 },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl WechatError {
    /// Short machine-friendly kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            WechatError::Configuration(_) => "configuration",
            WechatError::Network(_) => "network",
            WechatError::Upstream { .. } => "upstream",
            WechatError::RateLimited { .. } => "rate_limited",
            WechatError::Challenge { .. } => "challenge",
            WechatError::Fetch { .. } => "fetch",
            WechatError::Validation(_) => "validation",
            WechatError::Parse(_) => "parse",
            WechatError::NotFound(_) => "not_found",
        }
    }

    /// Human-actionable advice for this error.
    pub fn hint(&self) -> &'static str {
        match self {
            WechatError::Configuration(_) => {
                "Set WECHAT_APPID and WECHAT_SECRET (platform console: Development > Basic \
                 configuration) and whitelist this server's IP address."
            }
            WechatError::Network(_) => "Check network connectivity and retry later.",
            WechatError::Upstream { code, .. } => Remediation::for_code(*code).hint(),
            WechatError::RateLimited { .. } => {
                "Search requests are being throttled. Wait 5-10 minutes, search less often, \
                 and use more specific keywords."
            }
            WechatError::Challenge { .. } => {
                "A verification page was served. It cannot be solved automatically; wait \
                 10-30 minutes and prefer the official API tools meanwhile."
            }
            WechatError::Fetch { .. } => "The page could not be fetched. Retry later.",
            WechatError::Validation(_) => "Correct the input and try again.",
            WechatError::Parse(_) => "The upstream response had an unexpected shape.",
            WechatError::NotFound(_) => "Use list_articles to obtain a valid media_id.",
        }
    }

    /// Remediation category for upstream rejections.
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            WechatError::Upstream { code, .. } => Some(Remediation::for_code(*code)),
            _ => None,
        }
    }

    pub(crate) fn upstream(code: i64, message: impl Into<String>) -> Self {
        WechatError::Upstream {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for WechatError {
    fn from(e: reqwest::Error) -> Self {
        WechatError::Network(e.to_string())
    }
}

/// Convenience result type.
pub type WechatResult<T> = Result<T, WechatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_table() {
        assert_eq!(Remediation::for_code(40001), Remediation::AuthMisconfiguration);
        assert_eq!(Remediation::for_code(45009), Remediation::QuotaExceeded);
        assert_eq!(Remediation::for_code(48001), Remediation::PermissionDenied);
        assert_eq!(Remediation::for_code(40007), Remediation::InvalidParameter);
        assert_eq!(Remediation::for_code(99999), Remediation::Unknown);
    }

    #[test]
    fn test_upstream_hint_follows_code() {
        let err = WechatError::upstream(45009, "reach max api daily quota limit");
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.remediation(), Some(Remediation::QuotaExceeded));
        assert!(err.hint().contains("quota"));
        assert!(err.to_string().contains("45009"));
    }
}
