//! Thin wrapper around the Twitter/X v2 REST API with Chorus defaults.
//!
//! Handles auth, field selection, and paging before delegating to the shared
//! HTTP client. List endpoints go through [`Cursor`] so callers only say how many
//! items they want.
use crate::twitter::auth::{AccessToken, Credentials, TwitterAuthenticator};
use crate::twitter::cursor::Cursor;
use crate::twitter::types::{Single, Tweet, User};
use anyhow::{Context, Result, anyhow, ensure};
use chorus_http::{Auth, HttpClient, HttpError, LineStream, RequestOpts};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

pub(crate) const TWEET_FIELDS: &str = "created_at,public_metrics,source";

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    access: AccessToken,
}

impl TwitterApi {
    pub fn new(bearer_token: String) -> Result<Self> {
        let http = HttpClient::new(DEFAULT_BASE_URL)?;
        Ok(Self::with_http(http, bearer_token))
    }

    pub fn with_http(http: HttpClient, bearer_token: String) -> Self {
        Self::with_access(http, AccessToken::Bearer(bearer_token))
    }

    pub fn with_access(http: HttpClient, access: AccessToken) -> Self {
        Self { http, access }
    }

    /// Authenticate with whatever credentials are configured and build a client.
    /// User context wins when the access token pair is present.
    pub async fn connect(http: HttpClient, credentials: Credentials) -> Result<Self> {
        let access = TwitterAuthenticator::new(http.clone(), credentials)
            .authenticate()
            .await?;
        Ok(Self::with_access(http, access))
    }

    /// Like [`TwitterApi::connect`] but always app-only, as the filtered stream
    /// and its rules endpoints require.
    pub async fn connect_app_only(http: HttpClient, credentials: Credentials) -> Result<Self> {
        let bearer = TwitterAuthenticator::new(http.clone(), credentials)
            .authenticate_twitter_app()
            .await?;
        Ok(Self::with_http(http, bearer))
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    pub(crate) fn auth(&self) -> Auth<'_> {
        self.access.auth()
    }

    pub fn is_user_context(&self) -> bool {
        self.access.is_user_context()
    }

    fn cursor<T>(&self, path: String) -> Cursor<T>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        Cursor::new(self.http.clone(), self.access.clone(), path)
    }

    /// Look up an account by handle; a leading `@` is ignored.
    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        let handle = normalize_handle(username)?;
        let resp: Single<User> = self
            .http
            .get_json(
                &format!("2/users/by/username/{handle}"),
                RequestOpts {
                    auth: Some(self.auth()),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("looking up @{handle}"))?;

        match resp.data {
            Some(user) => {
                tracing::debug!(user_id = %user.id, username = %user.username, "twitter.user.resolved");
                Ok(user)
            }
            None => {
                let reason = resp
                    .errors
                    .as_ref()
                    .and_then(|e| e.first())
                    .map(|p| p.describe())
                    .unwrap_or_else(|| "no such user".to_string());
                Err(anyhow!("@{handle}: {reason}"))
            }
        }
    }

    /// Most recent tweets authored by `user_id`, newest first.
    pub async fn user_timeline_tweets(&self, user_id: &str, num_tweets: usize) -> Result<Vec<Tweet>> {
        let tweets = self
            .cursor::<Tweet>(format!("2/users/{user_id}/tweets"))
            .param("tweet.fields", TWEET_FIELDS)
            .page_bounds(5..=100)
            .collect(num_tweets)
            .await?;
        tracing::info!(user_id, requested = num_tweets, fetched = tweets.len(), "twitter.user_timeline");
        Ok(tweets)
    }

    /// Reverse-chronological home timeline of `user_id`.
    ///
    /// The endpoint requires user context; app-only bearer tokens are rejected
    /// with 403 by the API.
    pub async fn home_timeline_tweets(&self, user_id: &str, num_tweets: usize) -> Result<Vec<Tweet>> {
        if !self.is_user_context() {
            tracing::warn!(user_id, "twitter.home_timeline.app_only");
        }
        let tweets = self
            .cursor::<Tweet>(format!("2/users/{user_id}/timelines/reverse_chronological"))
            .param("tweet.fields", TWEET_FIELDS)
            .page_bounds(1..=100)
            .collect(num_tweets)
            .await?;
        tracing::info!(user_id, requested = num_tweets, fetched = tweets.len(), "twitter.home_timeline");
        Ok(tweets)
    }

    /// Accounts `user_id` follows.
    pub async fn friend_list(&self, user_id: &str, num_friends: usize) -> Result<Vec<User>> {
        let friends = self
            .cursor::<User>(format!("2/users/{user_id}/following"))
            .page_bounds(1..=1000)
            .collect(num_friends)
            .await?;
        tracing::info!(user_id, requested = num_friends, fetched = friends.len(), "twitter.friend_list");
        Ok(friends)
    }

    /// Connect to the filtered stream; rules must already be in place.
    pub async fn open_filtered_stream(&self) -> std::result::Result<LineStream, HttpError> {
        self.http
            .get_lines(
                "2/tweets/search/stream",
                RequestOpts {
                    auth: Some(self.auth()),
                    query: Some(vec![("tweet.fields", TWEET_FIELDS.into())]),
                    ..Default::default()
                },
            )
            .await
    }
}

fn normalize_handle(raw: &str) -> Result<&str> {
    let handle = raw.trim().trim_start_matches('@');
    ensure!(!handle.is_empty(), "username must not be empty");
    ensure!(
        handle.len() <= 15 && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "invalid Twitter username: {raw:?}"
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_normalized() {
        assert_eq!(normalize_handle(" @rustlang ").unwrap(), "rustlang");
        assert_eq!(normalize_handle("jack_1").unwrap(), "jack_1");
        assert!(normalize_handle("@").is_err());
        assert!(normalize_handle("bad handle").is_err());
        assert!(normalize_handle("much_too_long_for_twitter").is_err());
    }
}
