//! Cache-then-fetch access to the configured official account.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::cache::{CacheParams, CacheStore};
use crate::config::{ClientConfig, Namespace};
use crate::error::{WechatError, WechatResult};
use crate::token::TokenProvider;
use crate::types::{
    format_timestamp, reading_stats, AccountInfo, ArticleContent, ArticleSummary, MaterialStats,
    QuotaNote,
};
use crate::upstream::UpstreamInvoker;

/// Largest page the material list endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MaterialList {
    item: Vec<MaterialItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MaterialItem {
    media_id: String,
    update_time: i64,
    content: NewsContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsContent {
    news_item: Vec<NewsItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsItem {
    title: String,
    author: String,
    digest: String,
    content: String,
    content_source_url: String,
    url: String,
    thumb_media_id: String,
    show_cover_pic: i64,
    need_open_comment: i64,
    only_fans_can_comment: i64,
}

/// Account metadata, the owned article list, and owned article bodies.
pub struct OfficialAccountService {
    cache: Arc<CacheStore>,
    upstream: UpstreamInvoker,
}

impl OfficialAccountService {
    /// Build the service with its own HTTP client and token holder.
    pub fn new(config: &ClientConfig, cache: Arc<CacheStore>) -> WechatResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()
            .map_err(|e| WechatError::Configuration(format!("HTTP client: {e}")))?;
        let tokens = Arc::new(TokenProvider::new(config, http.clone(), Arc::clone(&cache)));
        Ok(Self {
            cache,
            upstream: UpstreamInvoker::new(config, http, tokens),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.upstream.tokens().is_configured()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub async fn account_info(&self) -> WechatResult<AccountInfo> {
        let params = CacheParams::new();
        self.cached(Namespace::AccountInfo, &params, || async {
            let body = self
                .upstream
                .invoke("material/get_materialcount", Map::new(), Method::POST)
                .await?;
            let stats: MaterialStats = decode(body)?;
            Ok(AccountInfo {
                name: "Current official account".to_string(),
                kind: "official_account".to_string(),
                // Only verified accounts may call the material API at all.
                verified: true,
                status: "active".to_string(),
                stats,
                api_quota: vec![
                    QuotaNote {
                        api: "access_token".to_string(),
                        limit: "2000/day".to_string(),
                    },
                    QuotaNote {
                        api: "material management".to_string(),
                        limit: "10/day".to_string(),
                    },
                ],
            })
        })
        .await
    }

    /// One page of owned articles, flattened so multi-article items yield several rows.
    pub async fn list_articles(&self, offset: u32, count: u32) -> WechatResult<Vec<ArticleSummary>> {
        let params = CacheParams::new().with("offset", offset).with("count", count);
        let page_size = count.clamp(1, MAX_PAGE_SIZE);

        self.cached(Namespace::ArticleList, &params, || async {
            let request = json!({ "type": "news", "offset": offset, "count": page_size });
            let body = self
                .upstream
                .invoke("material/batchget_material", as_map(request), Method::POST)
                .await?;
            let list: MaterialList = decode(body)?;

            Ok(list
                .item
                .into_iter()
                .flat_map(|item| {
                    let update_time = format_timestamp(item.update_time);
                    let media_id = item.media_id;
                    item.content
                        .news_item
                        .into_iter()
                        .map(move |news| ArticleSummary {
                            media_id: media_id.clone(),
                            title: news.title,
                            author: news.author,
                            digest: news.digest,
                            url: news.url,
                            content_source_url: news.content_source_url,
                            thumb_media_id: news.thumb_media_id,
                            show_cover_pic: news.show_cover_pic,
                            update_time: update_time.clone(),
                        })
                })
                .collect())
        })
        .await
    }

    /// Full body of an owned article.
    pub async fn article_content(&self, media_id: &str) -> WechatResult<ArticleContent> {
        let media_id = media_id.trim();
        if media_id.is_empty() {
            return Err(WechatError::Validation("media_id must not be empty".to_string()));
        }
        let params = CacheParams::new().with("media_id", media_id);

        self.cached(Namespace::ArticleContent, &params, || async {
            let body = self
                .upstream
                .invoke(
                    "material/get_material",
                    as_map(json!({ "media_id": media_id })),
                    Method::POST,
                )
                .await?;
            let content: NewsContent = decode(body)?;
            let news = content.news_item.into_iter().next().ok_or_else(|| {
                WechatError::NotFound(format!("No article with media_id {media_id}"))
            })?;

            let (word_count, read_time_minutes) = reading_stats(&news.content);
            Ok(ArticleContent {
                media_id: media_id.to_string(),
                title: news.title,
                author: news.author,
                digest: news.digest,
                content: news.content,
                content_source_url: news.content_source_url,
                url: news.url,
                thumb_media_id: news.thumb_media_id,
                show_cover_pic: news.show_cover_pic,
                need_open_comment: news.need_open_comment,
                only_fans_can_comment: news.only_fans_can_comment,
                word_count,
                read_time_minutes,
            })
        })
        .await
    }

    async fn cached<T, F, Fut>(&self, ns: Namespace, params: &CacheParams, fetch: F) -> WechatResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = WechatResult<T>>,
    {
        if let Some(hit) = self.cache.get::<T>(ns, params) {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.cache.set(ns, &value, ns.ttl_secs(), params);
        Ok(value)
    }
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> WechatResult<T> {
    serde_json::from_value(body)
        .map_err(|e| WechatError::Parse(format!("Unexpected response shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_list_tolerates_missing_fields() {
        let list: MaterialList = decode(json!({
            "item": [{ "media_id": "M1", "content": { "news_item": [{ "title": "T" }] } }],
            "total_count": 1
        }))
        .unwrap();
        assert_eq!(list.item.len(), 1);
        assert_eq!(list.item[0].update_time, 0);
        assert_eq!(list.item[0].content.news_item[0].author, "");
    }

    #[test]
    fn test_wrong_shape_is_parse_error() {
        let err = decode::<MaterialList>(json!({ "item": "nope" })).unwrap_err();
        assert!(matches!(err, WechatError::Parse(_)));
    }
}
