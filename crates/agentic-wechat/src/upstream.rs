//! Authenticated calls against the official JSON API with bounded retry.
//!
//! Each call is a small state machine over the attempt count:
//!
//! - transport failures (connect, timeout, non-success HTTP status) back off
//!   `base * 2^attempt` and retry; exhaustion yields [`WechatError::Network`]
//! - errcode 42001 invalidates the token, pauses briefly, and retries
//! - any other non-zero errcode fails at once as [`WechatError::Upstream`]

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{Map, Value};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{WechatError, WechatResult, TOKEN_EXPIRED_CODE};
use crate::token::TokenProvider;

/// Outcome of a single attempt.
enum Attempt {
    Done(Value),
    TokenExpired(String),
    Transient(String),
    Rejected { code: i64, message: String },
}

/// Issues requests against the official API.
pub struct UpstreamInvoker {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<TokenProvider>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl UpstreamInvoker {
    pub fn new(config: &ClientConfig, http: reqwest::Client, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens,
            retry: config.retry.clone(),
            timeout: config.api_timeout,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Call `endpoint` and return the raw JSON body of a successful response.
    ///
    /// GET sends `params` as the query string, anything else as a JSON body.
    /// The access token always travels as the `access_token` query parameter.
    pub async fn invoke(
        &self,
        endpoint: &str,
        params: Map<String, Value>,
        method: Method,
    ) -> WechatResult<Value> {
        let url = format!("{}/{}", self.api_base, endpoint.trim_start_matches('/'));
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let token = self.tokens.get_token().await?;
            let last = attempt + 1 >= max_attempts;

            match self.attempt(&url, &params, &method, &token).await? {
                Attempt::Done(body) => {
                    if attempt > 0 {
                        tracing::debug!("{endpoint} succeeded after {} retries", attempt);
                    }
                    return Ok(body);
                }
                Attempt::Rejected { code, message } => {
                    return Err(WechatError::upstream(code, message));
                }
                Attempt::TokenExpired(message) => {
                    if last {
                        return Err(WechatError::upstream(TOKEN_EXPIRED_CODE, message));
                    }
                    tracing::warn!(
                        "{endpoint}: access token expired (attempt {}/{max_attempts}), refreshing",
                        attempt + 1
                    );
                    self.tokens.invalidate();
                    tokio::time::sleep(self.retry.token_refresh_delay).await;
                }
                Attempt::Transient(reason) => {
                    if last {
                        return Err(WechatError::Network(format!(
                            "{endpoint} failed after {max_attempts} attempts: {reason}"
                        )));
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        "{endpoint}: attempt {}/{max_attempts} failed ({reason}), retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        url: &str,
        params: &Map<String, Value>,
        method: &Method,
        token: &str,
    ) -> WechatResult<Attempt> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .timeout(self.timeout)
            .query(&[("access_token", token)]);

        request = if *method == Method::GET {
            let query: Vec<(&str, String)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), query_value(v)))
                .collect();
            request.query(&query)
        } else {
            request.json(params)
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Transient(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(Attempt::Transient(format!("HTTP {status}")));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Ok(Attempt::Transient(e.to_string())),
        };

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| WechatError::Parse(format!("Invalid JSON from {url}: {e}")))?;

        let code = body.get("errcode").and_then(Value::as_i64).unwrap_or(0);
        if code == 0 {
            return Ok(Attempt::Done(body));
        }

        let message = body
            .get("errmsg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();

        Ok(if code == TOKEN_EXPIRED_CODE {
            Attempt::TokenExpired(message)
        } else {
            Attempt::Rejected { code, message }
        })
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheParams, CacheStore};
    use crate::config::Namespace;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(server: &MockServer) -> ClientConfig {
        ClientConfig {
            api_base: server.uri(),
            api_timeout: Duration::from_millis(200),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(20),
                token_refresh_delay: Duration::from_millis(5),
            },
            ..ClientConfig::default()
        }
        .with_credentials("wx-app", "wx-secret")
    }

    fn invoker(config: &ClientConfig, cache: Arc<CacheStore>) -> UpstreamInvoker {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenProvider::new(config, http.clone(), cache));
        UpstreamInvoker::new(config, http, tokens)
    }

    async fn mount_token(server: &MockServer, expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "TOKEN", "expires_in": 7200 })),
            )
            .expect(expected_fetches)
            .mount(server)
            .await;
    }

    fn seeded_cache() -> Arc<CacheStore> {
        let cache = Arc::new(CacheStore::in_memory());
        cache.set(Namespace::AccessToken, &"TOKEN", 6900, &CacheParams::new());
        cache
    }

    #[tokio::test]
    async fn test_success_passes_token_and_body() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/material/batchget_material"))
            .and(query_param("access_token", "TOKEN"))
            .and(body_json(json!({ "type": "news", "offset": 0, "count": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "item": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let invoker = invoker(&config, Arc::new(CacheStore::in_memory()));
        let params = json!({ "type": "news", "offset": 0, "count": 10 });
        let body = invoker
            .invoke(
                "material/batchget_material",
                params.as_object().cloned().unwrap(),
                Method::POST,
            )
            .await
            .unwrap();
        assert_eq!(body, json!({ "item": [] }));
    }

    #[tokio::test]
    async fn test_get_sends_params_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/info"))
            .and(query_param("access_token", "TOKEN"))
            .and(query_param("openid", "o-1"))
            .and(query_param("lang", "zh_CN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let invoker = invoker(&config, seeded_cache());
        let params = json!({ "openid": "o-1", "lang": "zh_CN" });
        invoker
            .invoke("user/info", params.as_object().cloned().unwrap(), Method::GET)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_token_expiry_twice_then_success() {
        let server = MockServer::start().await;
        mount_token(&server, 3).await;
        Mock::given(path("/material/get_materialcount"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "errcode": 42001, "errmsg": "access_token expired" })),
            )
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/material/get_materialcount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "news_count": 4 })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(CacheStore::in_memory());
        let config = fast_config(&server);
        let invoker = invoker(&config, cache.clone());
        let body = invoker
            .invoke("material/get_materialcount", Map::new(), Method::POST)
            .await
            .unwrap();

        assert_eq!(body["news_count"], 4);
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[tokio::test]
    async fn test_token_expiry_on_every_attempt_surfaces() {
        let server = MockServer::start().await;
        mount_token(&server, 3).await;
        Mock::given(path("/material/get_materialcount"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "errcode": 42001, "errmsg": "access_token expired" })),
            )
            .expect(3)
            .mount(&server)
            .await;

        let cache = Arc::new(CacheStore::in_memory());
        let config = fast_config(&server);
        let err = invoker(&config, cache.clone())
            .invoke("material/get_materialcount", Map::new(), Method::POST)
            .await
            .unwrap_err();

        assert!(matches!(err, WechatError::Upstream { code: 42001, .. }));
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[tokio::test]
    async fn test_transport_timeout_exhausts_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(path("/material/get_materialcount"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(3)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let invoker = invoker(&config, seeded_cache());
        let started = Instant::now();
        let err = invoker
            .invoke("material/get_materialcount", Map::new(), Method::POST)
            .await
            .unwrap_err();

        assert!(matches!(err, WechatError::Network(_)), "got {err:?}");
        // Two backoffs (20ms, 40ms) between three attempts.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(path("/material/get_materialcount"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let err = invoker(&config, seeded_cache())
            .invoke("material/get_materialcount", Map::new(), Method::POST)
            .await
            .unwrap_err();
        assert!(matches!(err, WechatError::Network(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig {
            api_base: format!("http://{addr}"),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(10),
                token_refresh_delay: Duration::from_millis(5),
            },
            ..ClientConfig::default()
        }
        .with_credentials("wx-app", "wx-secret");

        let started = Instant::now();
        let err = invoker(&config, seeded_cache())
            .invoke("material/get_materialcount", Map::new(), Method::POST)
            .await
            .unwrap_err();
        assert!(matches!(err, WechatError::Network(_)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_other_errcodes_fail_without_retry() {
        let server = MockServer::start().await;
        Mock::given(path("/material/get_material"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "errcode": 45009, "errmsg": "reach max api daily quota limit" }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let err = invoker(&config, seeded_cache())
            .invoke("material/get_material", Map::new(), Method::POST)
            .await
            .unwrap_err();

        match err {
            WechatError::Upstream { code, ref message } => {
                assert_eq!(code, 45009);
                assert!(message.contains("quota"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(path("/material/get_material"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast_config(&server);
        let err = invoker(&config, seeded_cache())
            .invoke("material/get_material", Map::new(), Method::POST)
            .await
            .unwrap_err();
        assert!(matches!(err, WechatError::Parse(_)));
    }
}
