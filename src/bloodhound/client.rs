//! Signed HTTP client for the BloodHound CE REST API.
//!
//! All calls go through [`BloodhoundClient::request`], which signs each
//! attempt afresh, classifies failures into [`ApiErrorKind`]s and retries the
//! transient ones with exponential backoff. Listing endpoints are walked with
//! skip/limit paging via [`BloodhoundClient::list`] or the lazy
//! [`BloodhoundClient::paginate`] stream.

use std::collections::VecDeque;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use futures::stream::{self, Stream};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::cache;
use super::error::{ApiError, ApiErrorKind};
use super::signer::{Credential, Signer};
use crate::config::BloodhoundSettings;

const USER_AGENT: &str = concat!("bloodhound-mcp/", env!("CARGO_PKG_VERSION"));

/// Transport and retry knobs for [`BloodhoundClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// `scheme://host:port`, without a trailing slash
    pub base_url: String,
    pub timeout: Duration,
    /// Deadline for a single raw graph query; such queries are never resent
    /// after running out of time
    pub query_timeout: Duration,
    /// Retries after the first attempt; 2 means at most 3 attempts
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Items requested per page when walking listings
    pub page_size: u32,
    /// Upper bound on the serialized size of a raw query result
    pub max_result_bytes: usize,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(180),
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            page_size: 100,
            max_result_bytes: 1_000_000,
        }
    }
}

impl From<&BloodhoundSettings> for ClientOptions {
    fn from(settings: &BloodhoundSettings) -> Self {
        Self {
            base_url: settings.base_url(),
            timeout: Duration::from_secs(settings.request_timeout_secs),
            query_timeout: Duration::from_secs(180),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.retry_max_backoff_ms),
            page_size: settings.page_size,
            max_result_bytes: settings.max_query_result_bytes,
        }
    }
}

/// Ordered query parameters. Encoded exactly once so the signed URI and the
/// URI on the wire are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `path` followed by the percent-encoded query string, if any.
    pub fn append_to(&self, path: &str) -> String {
        if self.0.is_empty() {
            return path.to_string();
        }
        let encoded: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{path}?{}", encoded.join("&"))
    }
}

/// Position in a skip/limit listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub skip: u64,
    /// Total reported by the server, once seen
    pub total: Option<u64>,
    exhausted: bool,
}

impl PageCursor {
    pub fn starting_at(skip: u64) -> Self {
        Self {
            skip,
            total: None,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn exhaust(&mut self) {
        self.exhausted = true;
    }

    fn advance(&mut self, returned: usize, requested: u32, total: Option<u64>) {
        self.skip += returned as u64;
        if total.is_some() {
            self.total = total;
        }
        let short_page = returned == 0 || returned < requested as usize;
        let past_total = self.total.is_some_and(|t| self.skip >= t);
        if short_page || past_total {
            self.exhausted = true;
        }
    }
}

/// How long one attempt may run, and whether running out of time is worth
/// another attempt.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    timeout: Duration,
    retry_on_timeout: bool,
}

/// One window of a listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub data: Vec<Value>,
    /// Server-reported total, or the number of items returned when the
    /// endpoint does not report one
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct BloodhoundClient {
    http: reqwest::Client,
    signer: Signer,
    options: ClientOptions,
}

impl BloodhoundClient {
    pub fn new(credential: Credential, options: ClientOptions) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            signer: Signer::new(credential),
            options,
        })
    }

    pub fn from_settings(settings: &BloodhoundSettings) -> Result<Self, ApiError> {
        Self::new(settings.credential(), ClientOptions::from(settings))
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub async fn get(&self, path: &str, query: &QueryParams) -> Result<Value, ApiError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, &QueryParams::new(), Some(body))
            .await
    }

    /// `POST` a raw graph query under the query deadline.
    ///
    /// A query that times out is not resent: it would only run out of time
    /// again while holding the server busy.
    pub(crate) async fn post_query(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let deadline = Deadline {
            timeout: self.options.query_timeout,
            retry_on_timeout: false,
        };
        self.request_within(Method::POST, path, &QueryParams::new(), Some(body), deadline)
            .await
    }

    /// Issue a signed request, retrying transient failures.
    ///
    /// GET responses are served from the turn cache when one is in scope.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &QueryParams,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let deadline = Deadline {
            timeout: self.options.timeout,
            retry_on_timeout: true,
        };
        self.request_within(method, path, query, body, deadline).await
    }

    async fn request_within(
        &self,
        method: Method,
        path: &str,
        query: &QueryParams,
        body: Option<&Value>,
        deadline: Deadline,
    ) -> Result<Value, ApiError> {
        let path_and_query = query.append_to(path);
        let cache_key = (method == Method::GET).then(|| format!("GET {path_and_query}"));

        if cache_key.is_some() {
            if !cache::in_scope() {
                debug!(path = %path_and_query, "No turn in scope; reading BloodHound uncached");
            } else if let Some(hit) = cache_key.as_deref().and_then(cache::lookup) {
                debug!(path = %path_and_query, "Serving BloodHound response from turn cache");
                return Ok(hit);
            }
        }

        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::decode(format!("failed to encode request body: {e}")))?;

        let value = self
            .send_with_retry(&method, &path_and_query, body.as_deref(), deadline)
            .await?;

        if let Some(key) = cache_key.as_deref() {
            cache::store(key, &value);
        }
        Ok(value)
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        path_and_query: &str,
        body: Option<&[u8]>,
        deadline: Deadline,
    ) -> Result<Value, ApiError> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.options.initial_backoff)
            .with_max_interval(self.options.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once(method, path_and_query, body, deadline.timeout).await {
                Ok(value) => return Ok(value),
                Err(err)
                    if err.kind.is_retryable()
                        && (deadline.retry_on_timeout || !err.timed_out)
                        && attempt <= self.options.max_retries =>
                {
                    let delay = err
                        .retry_after
                        .map(|d| d.min(self.options.max_backoff))
                        .or_else(|| backoff.next_backoff())
                        .unwrap_or(self.options.max_backoff);
                    warn!(
                        method = %method,
                        path = %path_and_query,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying BloodHound request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(method = %method, path = %path_and_query, attempt, error = %err, "BloodHound request failed");
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path_and_query: &str,
        body: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let headers = self
            .signer
            .sign(method.as_str(), path_and_query, body.unwrap_or_default())
            .map_err(|_| {
                ApiError::new(
                    ApiErrorKind::AuthFailure,
                    "API token key cannot be used for request signing",
                )
            })?;

        let url = format!("{}{}", self.options.base_url, path_and_query);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .timeout(timeout)
            .header(AUTHORIZATION, headers.authorization)
            .header("RequestDate", headers.request_date)
            .header("Signature", headers.signature)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &text).with_retry_after(retry_after));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::decode(format!("invalid JSON from {path_and_query}: {e}")))
    }

    /// Fetch the next page at `cursor`, advancing it.
    ///
    /// Returns `None` once the listing is exhausted.
    pub async fn fetch_page(
        &self,
        path: &str,
        query: &QueryParams,
        cursor: &mut PageCursor,
        limit: u32,
    ) -> Result<Option<Vec<Value>>, ApiError> {
        if cursor.is_exhausted() {
            return Ok(None);
        }
        let page_query = query
            .clone()
            .with("skip", cursor.skip)
            .with("limit", limit);
        let body = self.get(path, &page_query).await?;

        let items = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                cursor.exhaust();
                return Err(ApiError::decode(format!("expected a list under `data` from {path}")));
            }
        };
        let total = body.get("count").and_then(Value::as_u64);
        cursor.advance(items.len(), limit, total);

        Ok((!items.is_empty()).then_some(items))
    }

    /// Collect up to `limit` items starting at `skip`, paging as needed.
    pub async fn list(
        &self,
        path: &str,
        query: &QueryParams,
        skip: u64,
        limit: usize,
    ) -> Result<Listing, ApiError> {
        let mut cursor = PageCursor::starting_at(skip);
        let mut data = Vec::new();

        while data.len() < limit {
            let want = page_limit(self.options.page_size, limit - data.len());
            match self.fetch_page(path, query, &mut cursor, want).await? {
                Some(items) => data.extend(items),
                None => break,
            }
        }
        data.truncate(limit);

        let count = cursor.total.unwrap_or(data.len() as u64);
        Ok(Listing { data, count })
    }

    /// Lazily walk a listing one item at a time.
    ///
    /// Pages are fetched only as the stream is polled. The stream ends at the
    /// first short or empty page, once the server-reported total is reached,
    /// after `max_items` items, or right after yielding an error.
    pub fn paginate<'a>(
        &'a self,
        path: &'a str,
        query: QueryParams,
        skip: u64,
        max_items: Option<usize>,
    ) -> impl Stream<Item = Result<Value, ApiError>> + 'a {
        let page_size = self.options.page_size;
        let state = PageState {
            cursor: PageCursor::starting_at(skip),
            buffer: VecDeque::new(),
            yielded: 0,
            query,
        };

        stream::unfold(state, move |mut state| async move {
            loop {
                if max_items.is_some_and(|max| state.yielded >= max) {
                    return None;
                }
                if let Some(item) = state.buffer.pop_front() {
                    state.yielded += 1;
                    return Some((Ok(item), state));
                }

                let remaining = max_items.map_or(usize::MAX, |max| max - state.yielded);
                let limit = page_limit(page_size, remaining);
                match self
                    .fetch_page(path, &state.query, &mut state.cursor, limit)
                    .await
                {
                    Ok(Some(items)) => state.buffer.extend(items),
                    Ok(None) => return None,
                    Err(err) => {
                        state.cursor.exhaust();
                        return Some((Err(err), state));
                    }
                }
            }
        })
    }

    /// `GET /api/version`
    pub async fn version(&self) -> Result<Value, ApiError> {
        self.get("/api/version", &QueryParams::new()).await
    }

    /// `GET /api/v2/self`
    pub async fn self_info(&self) -> Result<Value, ApiError> {
        self.get("/api/v2/self", &QueryParams::new()).await
    }
}

struct PageState {
    cursor: PageCursor,
    buffer: VecDeque<Value>,
    yielded: usize,
    query: QueryParams,
}

fn page_limit(page_size: u32, remaining: usize) -> u32 {
    let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
    page_size.max(1).min(remaining)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
