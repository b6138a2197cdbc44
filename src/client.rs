use chrono::Utc;
use indicatif::ProgressBar;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::{CachedResponse, ResponseCache};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// A successful API response, fresh or replayed from cache.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: u16,
    pub link: Option<String>,
    pub rate_limit_remaining: Option<u32>,
    pub body: Value,
    pub from_cache: bool,
}

impl From<CachedResponse> for ApiResponse {
    fn from(entry: CachedResponse) -> Self {
        ApiResponse {
            url: entry.url,
            status: entry.status,
            link: entry.link,
            rate_limit_remaining: entry.rate_limit_remaining,
            body: entry.body,
            from_cache: true,
        }
    }
}

pub struct GitHubClient {
    client: Client,
    token: String,
    cache: Option<ResponseCache>,
    max_retries: u32,
    progress: ProgressBar,
}

impl GitHubClient {
    pub fn new(config: &SearchConfig, cache: Option<ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("github-search/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubClient {
            client,
            token: config.token.clone(),
            cache,
            max_retries: config.max_retries,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report rate-limit waits on this progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// GET `url` with `params` appended to its query string, waiting out
    /// rate limits and serving from the cache when possible.
    pub async fn get(&self, url: &str, params: &[(String, String)]) -> Result<ApiResponse> {
        let url = build_url(url, params)?;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(url.as_str()).await {
                return Ok(hit.into());
            }
        }

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            debug!("Requesting URL: {}", url);
            let response = self
                .client
                .get(url.clone())
                .header(ACCEPT, ACCEPT_V3)
                .header(AUTHORIZATION, format!("token {}", self.token))
                .header("X-GitHub-Api-Version", API_VERSION)
                .send()
                .await?;

            let status = response.status();
            let headers = response.headers().clone();

            if is_rate_limited(status, &headers) {
                if attempts > self.max_retries {
                    return Err(SearchError::RateLimited { attempts });
                }
                let wait = rate_limit_wait(&headers, Utc::now().timestamp());
                warn!("Rate limit exceeded. Waiting for {} seconds.", wait.as_secs());
                self.wait_with_countdown(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    message: error_message(status, &body),
                });
            }

            let link = header_str(&headers, LINK.as_str()).map(str::to_string);
            let rate_limit_remaining = header_u64(&headers, RATE_LIMIT_REMAINING).and_then(|v| u32::try_from(v).ok());
            let body: Value = response.json().await?;

            let api = ApiResponse {
                url: url.to_string(),
                status: status.as_u16(),
                link,
                rate_limit_remaining,
                body,
                from_cache: false,
            };

            if let Some(cache) = &self.cache {
                let entry = CachedResponse {
                    url: api.url.clone(),
                    stored_at: Utc::now(),
                    status: api.status,
                    link: api.link.clone(),
                    rate_limit_remaining: api.rate_limit_remaining,
                    body: api.body.clone(),
                };
                if let Err(e) = cache.put(&entry).await {
                    warn!("Failed to cache response for {}: {}", api.url, e);
                }
            }

            // Out of requests: sit out the window now rather than fail the next page.
            if rate_limit_remaining == Some(0) {
                let wait = rate_limit_wait(&headers, Utc::now().timestamp());
                info!("Rate limit exhausted, waiting {} seconds before continuing", wait.as_secs());
                self.wait_with_countdown(wait).await;
            }

            return Ok(api);
        }
    }

    async fn wait_with_countdown(&self, wait: Duration) {
        let original_msg = self.progress.message();
        let end = Instant::now() + wait;

        while Instant::now() < end {
            let remaining = end - Instant::now();
            self.progress
                .set_message(format!("Rate limited - waiting {}s", remaining.as_secs() + 1));
            tokio::time::sleep(remaining.min(Duration::from_millis(500))).await;
        }

        self.progress.set_message(original_msg);
    }
}

fn build_url(url: &str, params: &[(String, String)]) -> Result<Url> {
    let parsed = if params.is_empty() {
        Url::parse(url)
    } else {
        Url::parse_with_params(url, params)
    };
    parsed.map_err(|e| SearchError::config(format!("invalid URL '{}': {}", url, e)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|v| v.parse().ok())
}

/// 429 is always a rate limit. 403 only when GitHub says so through its
/// headers, otherwise it is a permission error.
pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            header_u64(headers, RATE_LIMIT_REMAINING) == Some(0) || headers.contains_key(RETRY_AFTER)
        }
        _ => false,
    }
}

/// How long to wait before retrying: `Retry-After` plus one second if present,
/// otherwise until `X-RateLimit-Reset` plus one second.
pub fn rate_limit_wait(headers: &HeaderMap, now: i64) -> Duration {
    if let Some(retry_after) = header_u64(headers, RETRY_AFTER.as_str()) {
        return Duration::from_secs(retry_after + 1);
    }
    let reset = header_u64(headers, RATE_LIMIT_RESET).unwrap_or(0) as i64;
    let until_reset = (reset - now).max(0) as u64;
    Duration::from_secs(until_reset + 1)
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn forbidden_needs_rate_limit_evidence() {
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new()));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &HeaderMap::new()));
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &headers(&[("x-ratelimit-remaining", "0")])));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &headers(&[("x-ratelimit-remaining", "12")])));
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &headers(&[("retry-after", "30")])));
        assert!(!is_rate_limited(StatusCode::OK, &headers(&[("x-ratelimit-remaining", "0")])));
    }

    #[test]
    fn wait_runs_until_reset_plus_one() {
        let h = headers(&[("x-ratelimit-reset", "1000")]);
        assert_eq!(rate_limit_wait(&h, 990), Duration::from_secs(11));
        // reset already passed
        assert_eq!(rate_limit_wait(&h, 2000), Duration::from_secs(1));
        assert_eq!(rate_limit_wait(&HeaderMap::new(), 2000), Duration::from_secs(1));
    }

    #[test]
    fn retry_after_wins_over_reset() {
        let h = headers(&[("x-ratelimit-reset", "1000"), ("retry-after", "5")]);
        assert_eq!(rate_limit_wait(&h, 0), Duration::from_secs(6));
    }

    #[test]
    fn build_url_encodes_params() {
        let params = vec![("q".to_string(), "quasar in:topics".to_string()), ("per_page".to_string(), "2".to_string())];
        let url = build_url("https://api.github.com/search/repositories", &params).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/search/repositories?q=quasar+in%3Atopics&per_page=2");

        let next = build_url("https://api.github.com/search/repositories?q=x&page=2", &[]).unwrap();
        assert_eq!(next.as_str(), "https://api.github.com/search/repositories?q=x&page=2");

        assert!(matches!(build_url("not a url", &[]), Err(SearchError::Config { .. })));
    }

    #[test]
    fn error_message_prefers_body() {
        let msg = error_message(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"Validation Failed"}"#);
        assert_eq!(msg, "Validation Failed");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "<html>"), "Bad Gateway");
    }
}
