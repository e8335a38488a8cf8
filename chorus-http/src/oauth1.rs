//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849) for user-context calls.
use crate::HttpError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::{Method, Url};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Consumer credentials plus the access token of the acting user.
#[derive(Clone, Copy)]
pub struct OAuth1Keys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

impl std::fmt::Debug for OAuth1Keys<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Keys")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, UNRESERVED).to_string()
}

pub(crate) fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub(crate) fn timestamp() -> Result<u64, HttpError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| HttpError::Build(format!("system clock before epoch: {e}")))
}

/// `scheme://host[:port]/path`, with default ports dropped.
fn base_url(url: &Url) -> Result<String, HttpError> {
    let host = url
        .host_str()
        .ok_or_else(|| HttpError::Url(format!("{url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}{}", url.scheme(), url.path()),
        None => format!("{}://{host}{}", url.scheme(), url.path()),
    })
}

/// Build the `Authorization: OAuth ...` header value.
///
/// `params` are the query and form pairs sent alongside `url`; pairs already in
/// `url`'s query string are picked up as well.
pub(crate) fn authorization(
    keys: &OAuth1Keys<'_>,
    method: &Method,
    url: &Url,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: u64,
) -> Result<String, HttpError> {
    let timestamp = timestamp.to_string();
    let oauth = [
        ("oauth_consumer_key", keys.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", keys.token),
        ("oauth_version", "1.0"),
    ];

    let mut encoded: Vec<(String, String)> = oauth
        .iter()
        .copied()
        .chain(params.iter().copied())
        .map(|(k, v)| (encode(k), encode(v)))
        .chain(url.query_pairs().map(|(k, v)| (encode(&k), encode(&v))))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        encode(&base_url(url)?),
        encode(&normalized)
    );
    let key = format!("{}&{}", encode(keys.consumer_secret), encode(keys.token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| HttpError::Build(format!("oauth1 signing key: {e}")))?;
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let mut header: Vec<(&str, &str)> = oauth.to_vec();
    header.push(("oauth_signature", signature.as_str()));
    header.sort();
    let fields = header
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}
