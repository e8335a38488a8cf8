//! Filtered-stream listener.
//!
//! [`TwitterStreamer::filter`] installs one rule per tracked term, connects to the
//! v2 filtered stream and hands every payload line to a [`StreamListener`].
//! Dropped connections are retried with exponential backoff until the listener
//! says stop, the cancellation token fires, or the reconnect budget runs out.
use crate::twitter::client::TwitterApi;
use crate::twitter::types::{RulesRequest, RulesResponse, StreamRule};
use anyhow::{Context, Result, anyhow, bail, ensure};
use async_trait::async_trait;
use chorus_http::RequestOpts;
use futures::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

const RULES_PATH: &str = "2/tweets/search/stream/rules";
const MAX_BACKOFF: Duration = Duration::from_secs(320);

/// Receives raw stream payloads. Returning `false` from either hook ends the stream.
#[async_trait]
pub trait StreamListener: Send {
    async fn on_data(&mut self, raw: &str) -> bool;

    async fn on_error(&mut self, status: u16) -> bool;
}

/// Echoes each payload to stdout and appends it to a file.
pub struct FileListener {
    path: PathBuf,
    echo: bool,
    received: u64,
}

impl FileListener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
            received: 0,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    async fn append(&self, raw: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(raw.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

#[async_trait]
impl StreamListener for FileListener {
    async fn on_data(&mut self, raw: &str) -> bool {
        self.received += 1;
        if self.echo {
            println!("{raw}");
        }
        if let Err(err) = self.append(raw).await {
            tracing::warn!(path = %self.path.display(), error = %err, "stream.listener.write_failed");
        }
        true
    }

    async fn on_error(&mut self, status: u16) -> bool {
        // 420 (legacy "enhance your calm") and 429 mean we are being rate limited
        if status == 420 || status == 429 {
            tracing::warn!(status, "stream.listener.rate_limited");
            return false;
        }
        tracing::warn!(status, "stream.listener.error");
        true
    }
}

/// Why [`TwitterStreamer::filter`] returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Cancelled,
    StoppedByListener,
    Rejected(u16),
}

pub struct TwitterStreamer {
    api: TwitterApi,
    max_reconnects: u32,
    base_backoff: Duration,
}

impl TwitterStreamer {
    pub fn new(api: TwitterApi) -> Self {
        Self {
            api,
            max_reconnects: 5,
            base_backoff: Duration::from_secs(5),
        }
    }

    pub fn with_max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnects = n;
        self
    }

    pub fn with_base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    fn backoff(&self, failures: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << failures.saturating_sub(1).min(6))
            .min(MAX_BACKOFF)
    }

    /// Replace all existing stream rules with one rule per tracked term.
    pub async fn sync_rules(&self, track: &[String]) -> Result<Vec<StreamRule>> {
        let wanted: Vec<StreamRule> = track
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(|term| StreamRule {
                id: None,
                value: term.to_string(),
                tag: Some(term.to_string()),
            })
            .collect();
        ensure!(!wanted.is_empty(), "no terms to track");

        let http = self.api.http();

        let current: RulesResponse = http
            .get_json(
                RULES_PATH,
                RequestOpts {
                    auth: Some(self.api.auth()),
                    ..Default::default()
                },
            )
            .await
            .context("listing stream rules")?;

        let stale: Vec<String> = current
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "stream.rules.delete");
            let _: Value = http
                .post_json(
                    RULES_PATH,
                    &RulesRequest::Delete { ids: stale },
                    RequestOpts {
                        auth: Some(self.api.auth()),
                        ..Default::default()
                    },
                )
                .await
                .context("deleting stale stream rules")?;
        }

        let added: RulesResponse = http
            .post_json(
                RULES_PATH,
                &RulesRequest::Add(wanted),
                RequestOpts {
                    auth: Some(self.api.auth()),
                    ..Default::default()
                },
            )
            .await
            .context("adding stream rules")?;

        if let Some(problem) = added.errors.as_ref().and_then(|e| e.first()) {
            return Err(anyhow!("stream rule rejected: {}", problem.describe()));
        }
        let rules = added.data.unwrap_or_default();
        tracing::info!(rules = rules.len(), "stream.rules.synced");
        Ok(rules)
    }

    /// Follow tweets matching `track` until the listener, the token, or the API stops us.
    pub async fn filter<L>(
        &self,
        track: &[String],
        listener: &mut L,
        cancel: CancellationToken,
    ) -> Result<StreamOutcome>
    where
        L: StreamListener + ?Sized,
    {
        self.sync_rules(track).await?;

        let mut failures = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Ok(StreamOutcome::Cancelled);
            }

            match self.api.open_filtered_stream().await {
                Ok(mut lines) => {
                    let mut delivered = false;
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                            next = lines.next() => match next {
                                Some(Ok(line)) => {
                                    if !delivered {
                                        delivered = true;
                                        failures = 0;
                                    }
                                    // blank lines are keep-alive heartbeats
                                    if line.trim().is_empty() {
                                        continue;
                                    }
                                    if !listener.on_data(&line).await {
                                        return Ok(StreamOutcome::StoppedByListener);
                                    }
                                }
                                Some(Err(err)) => {
                                    tracing::warn!(error = %err, "stream.disconnected");
                                    break;
                                }
                                None => {
                                    tracing::info!("stream.closed_by_server");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(err) => match err.status() {
                    Some(status) => {
                        if !listener.on_error(status.as_u16()).await {
                            return Ok(StreamOutcome::Rejected(status.as_u16()));
                        }
                    }
                    None => tracing::warn!(error = %err, "stream.connect_failed"),
                },
            }

            failures += 1;
            if failures > self.max_reconnects {
                bail!("filtered stream failed {failures} times in a row; giving up");
            }
            let delay = self.backoff(failures);
            tracing::info!(attempt = failures, delay_ms = delay.as_millis() as u64, "stream.reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
