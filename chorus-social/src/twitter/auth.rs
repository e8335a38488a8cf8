//! Authentication for the Twitter/X API.
//!
//! With consumer key/secret and an access token pair configured, requests are
//! signed in user context (OAuth 1.0a), which the home timeline requires.
//! Otherwise an app-only bearer token is used: a configured one is passed through
//! untouched, or the consumer key and secret are exchanged for one through the
//! OAuth 2.0 client credentials grant (`POST oauth2/token`).
use crate::twitter::types::TokenResponse;
use anyhow::{Context, Result, anyhow, bail};
use chorus_http::{Auth, HttpClient, OAuth1Keys, RequestOpts};

#[derive(Clone, Default)]
pub struct Credentials {
    pub bearer_token: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("consumer_key", &self.consumer_key.as_ref().map(|_| "<redacted>"))
            .field("consumer_secret", &self.consumer_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("access_token_secret", &self.access_token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct UserToken {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

/// What requests are authorized with once credentials are resolved.
#[derive(Clone)]
pub enum AccessToken {
    /// App-only OAuth 2.0 bearer token.
    Bearer(String),
    /// OAuth 1.0a user context.
    User(UserToken),
}

impl AccessToken {
    pub fn auth(&self) -> Auth<'_> {
        match self {
            AccessToken::Bearer(token) => Auth::Bearer(token),
            AccessToken::User(user) => Auth::OAuth1(OAuth1Keys {
                consumer_key: &user.consumer_key,
                consumer_secret: &user.consumer_secret,
                token: &user.token,
                token_secret: &user.token_secret,
            }),
        }
    }

    pub fn is_user_context(&self) -> bool {
        matches!(self, AccessToken::User(_))
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessToken::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            AccessToken::User(_) => f.write_str("User(<redacted>)"),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub struct TwitterAuthenticator {
    http: HttpClient,
    credentials: Credentials,
}

impl TwitterAuthenticator {
    pub fn new(http: HttpClient, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    /// Prefer user context when the full OAuth 1.0a key set is configured,
    /// falling back to an app-only bearer token.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        let creds = &self.credentials;
        if let (Some(consumer_key), Some(consumer_secret), Some(token), Some(token_secret)) = (
            present(&creds.consumer_key),
            present(&creds.consumer_secret),
            present(&creds.access_token),
            present(&creds.access_token_secret),
        ) {
            tracing::debug!(method = "oauth1", "twitter.auth.resolved");
            return Ok(AccessToken::User(UserToken {
                consumer_key: consumer_key.to_string(),
                consumer_secret: consumer_secret.to_string(),
                token: token.to_string(),
                token_secret: token_secret.to_string(),
            }));
        }
        if present(&creds.access_token).is_some() != present(&creds.access_token_secret).is_some() {
            tracing::warn!("twitter.auth.partial_access_token");
        }
        self.authenticate_twitter_app().await.map(AccessToken::Bearer)
    }

    /// Resolve a bearer token usable for app-only endpoints.
    pub async fn authenticate_twitter_app(&self) -> Result<String> {
        if let Some(bearer) = present(&self.credentials.bearer_token) {
            tracing::debug!(method = "bearer", "twitter.auth.resolved");
            return Ok(bearer.to_string());
        }

        let (Some(key), Some(secret)) = (
            present(&self.credentials.consumer_key),
            present(&self.credentials.consumer_secret),
        ) else {
            bail!("no Twitter credentials: set twitter.bearer_token or twitter.consumer_key/consumer_secret");
        };

        let resp: TokenResponse = self
            .http
            .post_form(
                "oauth2/token",
                &[("grant_type", "client_credentials")],
                RequestOpts {
                    auth: Some(Auth::Basic {
                        username: key,
                        password: secret,
                    }),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .context("exchanging consumer credentials for a bearer token")?;

        if !resp.token_type.eq_ignore_ascii_case("bearer") {
            return Err(anyhow!(
                "unexpected token type from oauth2/token: {}",
                resp.token_type
            ));
        }

        tracing::debug!(method = "client_credentials", "twitter.auth.resolved");
        Ok(resp.access_token)
    }
}
