//! Access-token lifecycle for the official API.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::{CacheParams, CacheStore};
use crate::config::{token_ttl_secs, ClientConfig, Credentials, Namespace, TOKEN_DEFAULT_LIFETIME_SECS};
use crate::error::{WechatError, WechatResult};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Granted {
        access_token: String,
        #[serde(default)]
        expires_in: Option<i64>,
    },
    Rejected {
        #[serde(default)]
        errcode: i64,
        #[serde(default)]
        errmsg: Option<String>,
    },
}

/// Fetches and caches the bearer credential, refreshing it on demand.
pub struct TokenProvider {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    token_url: String,
    cache: Arc<CacheStore>,
    refresh: Mutex<()>,
}

impl TokenProvider {
    pub fn new(config: &ClientConfig, http: reqwest::Client, cache: Arc<CacheStore>) -> Self {
        Self {
            http,
            credentials: config.credentials.clone(),
            token_url: format!("{}/token", config.api_base.trim_end_matches('/')),
            cache,
            refresh: Mutex::new(()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Return a valid token, fetching one if none is cached.
    pub async fn get_token(&self) -> WechatResult<String> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            WechatError::Configuration(
                "WECHAT_APPID and WECHAT_SECRET must both be set".to_string(),
            )
        })?;

        let params = CacheParams::new();
        if let Some(token) = self.cache.get::<String>(Namespace::AccessToken, &params) {
            return Ok(token);
        }

        // Concurrent misses wait here; whoever got in first has usually filled the cache.
        let _guard = self.refresh.lock().await;
        if let Some(token) = self.cache.get::<String>(Namespace::AccessToken, &params) {
            return Ok(token);
        }

        let (token, expires_in) = self.fetch(credentials).await?;
        let ttl = token_ttl_secs(expires_in);
        self.cache.set(Namespace::AccessToken, &token, ttl, &params);
        tracing::info!("Fetched access token (lifetime {expires_in}s, cached for {ttl}s)");
        Ok(token)
    }

    /// Drop the cached token so the next call refetches it.
    pub fn invalidate(&self) {
        self.cache
            .set(Namespace::AccessToken, &Value::Null, 0, &CacheParams::new());
    }

    async fn fetch(&self, credentials: &Credentials) -> WechatResult<(String, i64)> {
        let response = self
            .http
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", credentials.app_id.as_str()),
                ("secret", credentials.app_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WechatError::Network(format!(
                "Token endpoint returned HTTP {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| WechatError::Parse(format!("Unexpected token response: {e}")))?;

        match body {
            TokenResponse::Granted {
                access_token,
                expires_in,
            } => Ok((
                access_token,
                expires_in.unwrap_or(TOKEN_DEFAULT_LIFETIME_SECS),
            )),
            TokenResponse::Rejected { errcode, errmsg } => Err(WechatError::upstream(
                errcode,
                errmsg.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, cache: Arc<CacheStore>) -> TokenProvider {
        let config = ClientConfig {
            api_base: server.uri(),
            ..ClientConfig::default()
        }
        .with_credentials("wx-app", "wx-secret");
        TokenProvider::new(&config, reqwest::Client::new(), cache)
    }

    #[tokio::test]
    async fn test_unconfigured_is_configuration_error() {
        let cache = Arc::new(CacheStore::in_memory());
        let provider = TokenProvider::new(&ClientConfig::default(), reqwest::Client::new(), cache);
        let err = provider.get_token().await.unwrap_err();
        assert!(matches!(err, WechatError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_token_cached_with_safety_margin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(query_param("grant_type", "client_credential"))
            .and(query_param("appid", "wx-app"))
            .and(query_param("secret", "wx-secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "TOKEN-1", "expires_in": 7200 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(CacheStore::in_memory());
        let provider = provider(&server, cache.clone());

        assert_eq!(provider.get_token().await.unwrap(), "TOKEN-1");
        assert_eq!(provider.get_token().await.unwrap(), "TOKEN-1");

        let entry = cache
            .entry(Namespace::AccessToken, &CacheParams::new())
            .unwrap();
        assert_eq!(entry.ttl().num_seconds(), 6900);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "errcode": 40013, "errmsg": "invalid appid" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Arc::new(CacheStore::in_memory()));
        match provider.get_token().await.unwrap_err() {
            WechatError::Upstream { code, message } => {
                assert_eq!(code, 40013);
                assert_eq!(message, "invalid appid");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_absurd_lifetime_is_used_but_not_cached() {
        let server = MockServer::start().await;
        Mock::given(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "access_token": "T", "expires_in": 10_000_000_000_000_i64 }),
            ))
            .expect(2)
            .mount(&server)
            .await;

        let cache = Arc::new(CacheStore::in_memory());
        let provider = provider(&server, cache.clone());
        assert_eq!(provider.get_token().await.unwrap(), "T");
        assert!(cache
            .entry(Namespace::AccessToken, &CacheParams::new())
            .is_none());
        assert_eq!(provider.get_token().await.unwrap(), "T");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let server = MockServer::start().await;
        Mock::given(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "T", "expires_in": 7200 })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server, Arc::new(CacheStore::in_memory()));
        provider.get_token().await.unwrap();
        provider.invalidate();
        provider.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let server = MockServer::start().await;
        Mock::given(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "SHARED", "expires_in": 7200 }))
                    .set_delay(std::time::Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(provider(&server, Arc::new(CacheStore::in_memory())));
        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move { provider.get_token().await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "SHARED");
        }
    }
}
