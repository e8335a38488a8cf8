use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// `data` carries no `#[serde(default)]`: on a generic field that would demand
// `T: Default`, and a missing `Option` already decodes as `None`.

/// One page of a list endpoint (`data` + `meta.next_token`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Option<Vec<T>>,
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Meta {
    #[serde(default)]
    pub result_count: Option<u64>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Partial errors returned alongside a 200 response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiProblem {
    pub fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Single-object lookups such as `2/users/by/username/{username}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Single<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Client label ("Twitter for iPhone"), only present for some tokens and tweets.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<PublicMetrics>,
}

impl Tweet {
    /// `created_at` parsed as RFC 3339; `None` when absent or malformed.
    pub fn created_at_utc(&self) -> Option<OffsetDateTime> {
        self.created_at
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
    }

    pub fn retweet_count(&self) -> u64 {
        self.public_metrics
            .as_ref()
            .and_then(|m| m.retweet_count)
            .unwrap_or(0)
    }

    pub fn like_count(&self) -> u64 {
        self.public_metrics
            .as_ref()
            .and_then(|m| m.like_count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublicMetrics {
    #[serde(default, alias = "favorite_count")]
    pub like_count: Option<u64>,
    #[serde(default, alias = "repost_count")]
    pub retweet_count: Option<u64>,
}

/// App-only token exchange response from `oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}

// ---- filtered stream ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesRequest {
    Add(Vec<StreamRule>),
    Delete { ids: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulesResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamRule>>,
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}
