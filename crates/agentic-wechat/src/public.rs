//! Cache-then-scrape access to public articles and accounts.

use std::sync::Arc;

use crate::cache::{CacheParams, CacheStore};
use crate::config::{ClientConfig, Namespace};
use crate::error::{WechatError, WechatResult};
use crate::scrape::ScrapeInvoker;
use crate::types::{AccountSearchResult, PublicArticle, SearchResult};

pub struct PublicSearchService {
    cache: Arc<CacheStore>,
    scrape: ScrapeInvoker,
}

impl PublicSearchService {
    pub fn new(config: &ClientConfig, cache: Arc<CacheStore>) -> WechatResult<Self> {
        Ok(Self {
            cache,
            scrape: ScrapeInvoker::new(config)?,
        })
    }

    /// Search public articles, optionally within one account.
    pub async fn search_articles(
        &self,
        query: &str,
        account_name: Option<&str>,
        limit: usize,
    ) -> WechatResult<Vec<SearchResult>> {
        let query = non_empty_query(query)?;
        let account_name = account_name.map(str::trim).filter(|a| !a.is_empty());
        let params = CacheParams::new()
            .with("query", query)
            .with("account_name", account_name)
            .with("limit", limit);

        if let Some(hit) = self.cache.get(Namespace::SearchResults, &params) {
            return Ok(hit);
        }
        let results = self.scrape.search(query, account_name, limit).await?;
        tracing::debug!("Search '{query}' returned {} results", results.len());
        self.cache.set(
            Namespace::SearchResults,
            &results,
            Namespace::SearchResults.ttl_secs(),
            &params,
        );
        Ok(results)
    }

    pub async fn search_accounts(
        &self,
        query: &str,
        limit: usize,
    ) -> WechatResult<Vec<AccountSearchResult>> {
        let query = non_empty_query(query)?;
        let params = CacheParams::new().with("query", query).with("limit", limit);

        if let Some(hit) = self.cache.get(Namespace::AccountSearch, &params) {
            return Ok(hit);
        }
        let results = self.scrape.search_accounts(query, limit).await?;
        self.cache.set(
            Namespace::AccountSearch,
            &results,
            Namespace::AccountSearch.ttl_secs(),
            &params,
        );
        Ok(results)
    }

    /// Fetch a public article. The link is validated before the cache is consulted.
    pub async fn public_article(&self, url: &str) -> WechatResult<PublicArticle> {
        let url = self.scrape.validate_article_url(url)?;
        let params = CacheParams::new().with("url", url.as_str());

        if let Some(hit) = self.cache.get(Namespace::PublicArticle, &params) {
            return Ok(hit);
        }
        let article = self.scrape.fetch_content(url.as_str()).await?;
        self.cache.set(
            Namespace::PublicArticle,
            &article,
            Namespace::PublicArticle.ttl_secs(),
            &params,
        );
        Ok(article)
    }
}

fn non_empty_query(query: &str) -> WechatResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(WechatError::Validation("query must not be empty".to_string()));
    }
    Ok(query)
}
