//! Unauthenticated fetches against the public search surface.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use url::Url;

use crate::config::{ClientConfig, Pacing};
use crate::error::{WechatError, WechatResult};
use crate::parse;
use crate::types::{AccountSearchResult, PublicArticle, SearchResult};

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Strings that only appear on verification/anti-automation pages.
const CHALLENGE_MARKERS: &[&str] = &["验证码", "captcha", "antispider"];

const RATE_LIMIT_COOLDOWN: &str = "5-10 minutes";
const CHALLENGE_COOLDOWN: &str = "10-30 minutes";

/// Which page a response is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Search,
    Article,
}

/// What kind of search the surface should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchKind {
    Accounts = 1,
    Articles = 2,
}

/// Fetches search pages and article pages, then hands the markup to [`parse`].
pub struct ScrapeInvoker {
    http: reqwest::Client,
    search_url: String,
    article_origin: Url,
    pacing: Pacing,
    search_timeout: Duration,
    content_timeout: Duration,
}

impl ScrapeInvoker {
    pub fn new(config: &ClientConfig) -> WechatResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.8,en-US;q=0.5,en;q=0.3"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| WechatError::Configuration(format!("HTTP client: {e}")))?;

        let article_origin = Url::parse(&config.article_origin).map_err(|e| {
            WechatError::Configuration(format!(
                "Invalid article origin {}: {e}",
                config.article_origin
            ))
        })?;

        Ok(Self {
            http,
            search_url: format!("{}/weixin", config.search_base.trim_end_matches('/')),
            article_origin,
            pacing: config.pacing.clone(),
            search_timeout: config.search_timeout,
            content_timeout: config.content_timeout,
        })
    }

    /// Search public articles, optionally restricted to one account.
    pub async fn search(
        &self,
        query: &str,
        account: Option<&str>,
        limit: usize,
    ) -> WechatResult<Vec<SearchResult>> {
        let (html, final_url) = self.search_page(query, account, SearchKind::Articles).await?;
        Ok(parse::search_results(&html, &final_url, limit))
    }

    /// Search public accounts by name or keyword.
    pub async fn search_accounts(
        &self,
        query: &str,
        limit: usize,
    ) -> WechatResult<Vec<AccountSearchResult>> {
        let (html, _) = self.search_page(query, None, SearchKind::Accounts).await?;
        Ok(parse::account_results(&html, limit))
    }

    /// Fetch and extract a public article.
    pub async fn fetch_content(&self, url: &str) -> WechatResult<PublicArticle> {
        let url = self.validate_article_url(url)?;
        pause(self.pacing.content).await;

        let response = self
            .http
            .get(url.clone())
            .timeout(self.content_timeout)
            .send()
            .await?;
        let html = read_page(response, PageKind::Article).await?;
        Ok(parse::public_article(&html, url.as_str()))
    }

    /// Reject anything that is not an article link on the configured origin.
    pub fn validate_article_url(&self, raw: &str) -> WechatResult<Url> {
        let invalid = || {
            WechatError::Validation(format!(
                "Not an article link: {raw} (expected {}/s/...)",
                self.article_origin.as_str().trim_end_matches('/')
            ))
        };

        let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        if url.host_str() != self.article_origin.host_str()
            || url.port() != self.article_origin.port()
        {
            return Err(invalid());
        }
        let path = url.path();
        let is_article = (path.starts_with("/s/") && path.len() > 3)
            || (path == "/s" && url.query().is_some_and(|q| !q.is_empty()));
        if !is_article {
            return Err(invalid());
        }
        Ok(url)
    }

    async fn search_page(
        &self,
        query: &str,
        account: Option<&str>,
        kind: SearchKind,
    ) -> WechatResult<(String, Url)> {
        pause(self.pacing.search).await;

        let kind_param = (kind as u8).to_string();
        let mut params = vec![
            ("query", query),
            ("type", kind_param.as_str()),
            ("page", "1"),
            ("ie", "utf8"),
        ];
        if let Some(account) = account.filter(|a| !a.is_empty()) {
            params.push(("account", account));
        }

        let response = self
            .http
            .get(&self.search_url)
            .query(&params)
            .timeout(self.search_timeout)
            .send()
            .await?;
        let final_url = response.url().clone();
        let html = read_page(response, PageKind::Search).await?;
        Ok((html, final_url))
    }
}

/// Map a response to its body or to the matching pushback error.
pub fn classify(status: u16, body: &str) -> WechatResult<()> {
    if status == 429 {
        return Err(WechatError::RateLimited {
            cooldown: RATE_LIMIT_COOLDOWN,
        });
    }
    let lowered = body.to_lowercase();
    if CHALLENGE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Err(WechatError::Challenge {
            cooldown: CHALLENGE_COOLDOWN,
        });
    }
    if !(200..300).contains(&status) {
        return Err(WechatError::Fetch { status });
    }
    Ok(())
}

/// Like [`classify`], except that a successful page carrying an article body is
/// accepted whatever its text mentions.
pub fn classify_article(status: u16, body: &str) -> WechatResult<()> {
    if (200..300).contains(&status) && parse::has_article_body(body) {
        return Ok(());
    }
    classify(status, body)
}

async fn read_page(response: reqwest::Response, kind: PageKind) -> WechatResult<String> {
    let status = response.status().as_u16();
    // Challenge pages are reached by redirect; the marker can live in the URL.
    let redirected_to_challenge = response.url().path().contains("antispider");
    let body = response.text().await?;
    if redirected_to_challenge {
        tracing::warn!("Search surface redirected to a verification page");
        return Err(WechatError::Challenge {
            cooldown: CHALLENGE_COOLDOWN,
        });
    }
    let verdict = match kind {
        PageKind::Search => classify(status, &body),
        PageKind::Article => classify_article(status, &body),
    };
    verdict.inspect_err(|e| tracing::warn!("Scrape pushback: {e}"))?;
    Ok(body)
}

async fn pause((min, max): (Duration, Duration)) {
    if max.is_zero() {
        return;
    }
    let delay = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    tracing::debug!("Pacing request by {delay:?}");
    tokio::time::sleep(delay).await;
}
