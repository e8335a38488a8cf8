//! Pagination over v2 list endpoints.
//!
//! Each page is requested with `max_results` and, after the first, the previous
//! page's `meta.next_token` as `pagination_token`. The cursor stops at the item
//! limit, at an empty page, or when the API stops handing out tokens.
use crate::twitter::auth::AccessToken;
use crate::twitter::types::Page;
use anyhow::{Context, Result, anyhow};
use chorus_http::{HttpClient, RequestOpts};
use futures::stream::{BoxStream, TryStreamExt};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

pub struct Cursor<T> {
    http: HttpClient,
    access: AccessToken,
    path: String,
    params: Vec<(&'static str, String)>,
    page_bounds: RangeInclusive<u32>,
    _item: PhantomData<fn() -> T>,
}

impl<T> Cursor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(http: HttpClient, access: AccessToken, path: impl Into<String>) -> Self {
        Self {
            http,
            access,
            path: path.into(),
            params: Vec::new(),
            page_bounds: 1..=100,
            _item: PhantomData,
        }
    }

    /// Extra query parameter sent with every page.
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Allowed `max_results` range of the endpoint.
    pub fn page_bounds(mut self, bounds: RangeInclusive<u32>) -> Self {
        self.page_bounds = bounds;
        self
    }

    fn page_size(&self, limit: usize) -> u32 {
        let wanted = u32::try_from(limit).unwrap_or(u32::MAX);
        wanted.clamp(*self.page_bounds.start(), *self.page_bounds.end())
    }

    /// Stream at most `limit` items across as many pages as needed.
    pub fn items(self, limit: usize) -> BoxStream<'static, Result<T>> {
        let page_size = self.page_size(limit).to_string();
        let Cursor {
            http,
            access,
            path,
            params,
            ..
        } = self;

        let stream = async_stream::stream! {
            let mut emitted = 0usize;
            let mut next_token: Option<String> = None;
            let mut page_no = 0u32;

            'pages: while emitted < limit {
                page_no += 1;
                let mut query: Vec<(&str, Cow<'_, str>)> = params
                    .iter()
                    .map(|(k, v)| (*k, Cow::Borrowed(v.as_str())))
                    .collect();
                query.push(("max_results", Cow::Borrowed(page_size.as_str())));
                if let Some(token) = &next_token {
                    query.push(("pagination_token", Cow::Owned(token.clone())));
                }

                let fetched = http
                    .get_json::<Page<T>>(
                        &path,
                        RequestOpts {
                            auth: Some(access.auth()),
                            query: Some(query),
                            ..Default::default()
                        },
                    )
                    .await
                    .with_context(|| format!("fetching page {page_no} of {path}"));

                let page = match fetched {
                    Ok(page) => page,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                };

                let items = page.data.unwrap_or_default();
                if items.is_empty() {
                    if let Some(problem) = page.errors.as_ref().and_then(|e| e.first()) {
                        yield Err(anyhow!("{path}: {}", problem.describe()));
                    }
                    break;
                }
                tracing::debug!(path = %path, page = page_no, items = items.len(), emitted, "twitter.cursor.page");

                for item in items {
                    if emitted >= limit {
                        break 'pages;
                    }
                    emitted += 1;
                    yield Ok(item);
                }

                next_token = page.meta.and_then(|m| m.next_token);
                if next_token.is_none() {
                    break;
                }
            }
        };
        Box::pin(stream)
    }

    /// Collect at most `limit` items, failing on the first page error.
    pub async fn collect(self, limit: usize) -> Result<Vec<T>> {
        self.items(limit).try_collect().await
    }
}
