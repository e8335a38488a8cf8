//! Minimal HTTP client with safe logging, retries, and flexible auth.
//!
//! - Request options: `Auth`, query params, timeout, retries
//! - JSON and form bodies, plus newline-delimited response streams
//! - Redacts sensitive query params and never logs secret values
//! - Retries 429/5xx with exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `CHORUS_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), chorus_http::HttpError> {
//! let client = chorus_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", chorus_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/basic/oauth1/none), not the secret.

mod oauth1;

pub use oauth1::OAuth1Keys;

use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "CHORUS_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn next_request_id() -> String {
    format!("r{:06}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status of an API error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use chorus_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Authorization: Basic base64(username:password)
    Basic {
        username: &'a str,
        password: &'a str,
    },
    /// Authorization: OAuth ... (HMAC-SHA1 signed per request)
    OAuth1(OAuth1Keys<'a>),
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Basic { .. } => "basic",
            Auth::OAuth1(_) => "oauth1",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use chorus_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     auth: Some(Auth::Bearer("demo")),
///     query: Some(vec![("max_results", "100".into())]),
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert_eq!(opts.query.as_ref().unwrap().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

enum Payload<'a> {
    Json(Vec<u8>),
    Form(&'a [(&'a str, &'a str)]),
}

/// Newline-delimited response body, one item per line without the terminator.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, HttpError>> + Send>>;

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use chorus_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json(Method::GET, path, None, opts).await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        self.request_json(Method::POST, path, Some(Payload::Json(bytes)), opts)
            .await
    }

    /// POST an `application/x-www-form-urlencoded` body and decode a JSON response.
    pub async fn post_form<T>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(Payload::Form(form)), opts)
            .await
    }

    /// Open a long-lived GET and yield the body line by line.
    ///
    /// No retries happen here and no timeout applies unless `opts.timeout` is set,
    /// since the body is expected to stay open. Non-success statuses surface as
    /// [`HttpError::Api`] before any line is produced.
    pub async fn get_lines(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<LineStream, HttpError> {
        let url = self.resolve(path)?;
        let req_id = next_request_id();

        let mut rb = self.inner.get(url.clone());
        if let Some(timeout) = opts.timeout {
            rb = rb.timeout(timeout);
        }
        rb = apply_query(rb, &opts);
        rb = apply_auth(rb, &Method::GET, &url, &opts, &[])?;

        tracing::debug!(
            req_id=%req_id,
            host_path=%host_path(&url),
            query=?redact_query(&opts),
            auth_kind=opts.auth.as_ref().map(Auth::kind).unwrap_or("none"),
            "http.stream.connect"
        );

        let resp = rb
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let request_id = request_id_header(resp.headers());
            let bytes = resp.bytes().await.unwrap_or_default();
            let message = extract_error_message(&bytes);
            tracing::warn!(req_id=%req_id, %status, message=%message, "http.stream.rejected");
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }

        tracing::info!(req_id=%req_id, %status, "http.stream.open");

        let mut body = resp.bytes_stream();
        let stream = async_stream::stream! {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => buf.extend_from_slice(&bytes),
                    Err(err) => {
                        buf.clear();
                        yield Err(HttpError::Network(err.to_string()));
                        break;
                    }
                }
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&line);
                    yield Ok(text.trim_end_matches(['\r', '\n']).to_string());
                }
            }
            if !buf.is_empty() {
                yield Ok(String::from_utf8_lossy(&buf).into_owned());
            }
        };
        Ok(Box::pin(stream))
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn request_json<T>(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload<'_>>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let redacted_q = redact_query(&opts);
        let mut attempt = 0usize;

        loop {
            let req_id = next_request_id();
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);
            rb = apply_query(rb, &opts);
            rb = match &payload {
                Some(Payload::Json(bytes)) => rb
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes.clone()),
                Some(Payload::Form(pairs)) => rb.form(pairs),
                None => rb,
            };
            let form: &[(&str, &str)] = match &payload {
                Some(Payload::Form(pairs)) => *pairs,
                _ => &[],
            };
            rb = apply_auth(rb, &method, &url, &opts, form)?;

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path(&url),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=%payload.is_some(),
                "http.request.start"
            );
            if raw_enabled() {
                if let Some(Payload::Json(bytes)) = &payload {
                    tracing::debug!(target: "http.raw", %req_id, body=%snip(bytes, RAW_MAX_BODY), "request");
                }
            }

            let t0 = std::time::Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|bytes| (status, headers, bytes))
                }
                Err(err) => Err(err),
            };
            let (status, headers, bytes) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%message, "http.network_error");
                    return Err(HttpError::Network(message));
                }
            };

            let request_id = request_id_header(&headers);
            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=t0.elapsed().as_millis() as u64,
                body_len=bytes.len(),
                x_request_id=%request_id,
                rate_limit.remaining=?headers.get("x-rate-limit-remaining").and_then(|v| v.to_str().ok()),
                rate_limit.reset=?headers.get("x-rate-limit-reset").and_then(|v| v.to_str().ok()),
                "http.response.headers"
            );
            if raw_enabled() {
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    %status,
                    headers=?redact_headers(&headers),
                    body=%snip(&bytes, RAW_MAX_BODY),
                    "response"
                );
            }

            let snippet = snip(&bytes, SNIPPET_MAX);

            if status.is_success() {
                if let Ok(val) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                    let meta = val.get("meta");
                    tracing::debug!(
                        req_id=%req_id,
                        result_count=?meta.and_then(|m| m.get("result_count")),
                        next_token=?meta.and_then(|m| m.get("next_token")),
                        "http.response.meta"
                    );
                }
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        req_id=%req_id,
                        serde_line=%e.line(),
                        serde_col=%e.column(),
                        serde_err=%e,
                        body_snippet=%snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet.clone())
                });
            }

            let message = extract_error_message(&bytes);
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;

            if (is_429 || status.is_server_error()) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => backoff(attempt).max(Duration::from_millis(1100)),
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn apply_query(rb: RequestBuilder, opts: &RequestOpts<'_>) -> RequestBuilder {
    match &opts.query {
        Some(q) => {
            let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb.query(&pairs)
        }
        None => rb,
    }
}

fn apply_auth(
    rb: RequestBuilder,
    method: &Method,
    url: &Url,
    opts: &RequestOpts<'_>,
    form: &[(&str, &str)],
) -> Result<RequestBuilder, HttpError> {
    Ok(match &opts.auth {
        Some(Auth::Bearer(tok)) => rb.bearer_auth(sanitize_api_key(tok)?),
        Some(Auth::Basic { username, password }) => rb.basic_auth(username, Some(password)),
        Some(Auth::OAuth1(keys)) => {
            // signed over everything that ends up on the wire
            let mut params: Vec<(&str, &str)> = opts
                .query
                .iter()
                .flatten()
                .map(|(k, v)| (*k, v.as_ref()))
                .collect();
            params.extend_from_slice(form);
            let header = oauth1::authorization(
                keys,
                method,
                url,
                &params,
                &oauth1::nonce(),
                oauth1::timestamp()?,
            )?;
            rb.header(reqwest::header::AUTHORIZATION, header)
        }
        Some(Auth::None) | None => rb,
    })
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(10)))
}

fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

fn redact_query(opts: &RequestOpts<'_>) -> Vec<(String, String)> {
    opts.query
        .as_ref()
        .map(|q| {
            q.iter()
                .map(|(k, v)| {
                    let shown = if is_secret_param(k) {
                        "<redacted>".to_string()
                    } else {
                        v.to_string()
                    };
                    ((*k).to_string(), shown)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie") {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

fn request_id_header(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-transaction-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn extract_error_message(body: &[u8]) -> String {
    // Twitter v2: {"errors":[{"message":"...", "detail":"...", "title":"..."}]}
    #[derive(Deserialize)]
    struct TwErrors {
        errors: Vec<Detail>,
    }
    // Twitter v2 problem documents and generic APIs: {"detail":"..."} / {"message":"..."}
    #[derive(Deserialize)]
    struct Detail {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    fn first_non_empty(d: Detail) -> Option<String> {
        [d.message, d.detail, d.title]
            .into_iter()
            .find(|s| !s.is_empty())
    }

    if let Ok(tw) = serde_json::from_slice::<TwErrors>(body) {
        if let Some(msg) = tw.errors.into_iter().next().and_then(first_non_empty) {
            return msg;
        }
    }
    if let Ok(d) = serde_json::from_slice::<Detail>(body) {
        if let Some(msg) = first_non_empty(d) {
            return msg;
        }
    }
    snip(body, SNIPPET_MAX)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn snip(body: &[u8], max: usize) -> String {
    let mut text = String::from_utf8_lossy(body).into_owned();
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_quoted_tokens() {
        assert_eq!(sanitize_api_key("  \"abc def\" ").unwrap(), "abcdef");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("tök").is_err());
    }

    #[test]
    fn redacts_secret_query_params() {
        let opts = RequestOpts {
            query: Some(vec![
                ("max_results", "10".into()),
                ("token", "s3cret".into()),
            ]),
            ..Default::default()
        };
        let shown = redact_query(&opts);
        assert_eq!(shown[0], ("max_results".to_string(), "10".to_string()));
        assert_eq!(shown[1], ("token".to_string(), "<redacted>".to_string()));
    }

    #[test]
    fn extracts_twitter_error_messages() {
        let body = br#"{"errors":[{"message":"","detail":"Could not find user","title":"Not Found"}]}"#;
        assert_eq!(extract_error_message(body), "Could not find user");
        let problem = br#"{"title":"Unauthorized","detail":"","type":"about:blank"}"#;
        assert_eq!(extract_error_message(problem), "Unauthorized");
        assert_eq!(extract_error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn snip_respects_char_boundaries() {
        let text = "é".repeat(300);
        let out = snip(text.as_bytes(), 5);
        assert!(out.ends_with("..."));
        assert_eq!(out.trim_end_matches("..."), "éé");
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(50), Duration::from_millis(200 * 1024));
    }
}
