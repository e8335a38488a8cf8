use anyhow::{Context, Result};
use chorus_analysis::export::{write_csv, write_timeseries};
use chorus_analysis::lexicon::LexiconScorer;
use chorus_analysis::sentiment::SentimentClassifier;
use chorus_analysis::table::TweetTable;
use chorus_common::ChorusError;
use chorus_config::TwitterConfig;
use chorus_http::HttpClient;
use chorus_social::twitter::{
    Credentials, FileListener, StreamOutcome, TwitterApi, TwitterStreamer, User,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const CSV_FILE: &str = "tweets.csv";
pub const TIMESERIES_FILE: &str = "timeseries.json";

/// Which timeline `analyze` pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeline {
    User,
    Home,
}

fn client_parts(cfg: &TwitterConfig) -> Result<(HttpClient, Credentials)> {
    let http = HttpClient::new(&cfg.base_url)
        .with_context(|| format!("invalid twitter.base_url {:?}", cfg.base_url))?
        .with_timeout(Duration::from_secs(cfg.timeout_secs))
        .with_retries(cfg.retries);
    let credentials = Credentials {
        bearer_token: cfg.bearer_token.clone(),
        consumer_key: cfg.consumer_key.clone(),
        consumer_secret: cfg.consumer_secret.clone(),
        access_token: cfg.access_token.clone(),
        access_token_secret: cfg.access_token_secret.clone(),
    };
    Ok((http, credentials))
}

/// REST client; signs in user context when an access token pair is configured.
pub async fn connect(cfg: &TwitterConfig) -> Result<TwitterApi> {
    let (http, credentials) = client_parts(cfg)?;
    TwitterApi::connect(http, credentials).await
}

/// App-only client for the filtered stream.
pub async fn connect_stream(cfg: &TwitterConfig) -> Result<TwitterApi> {
    let (http, credentials) = client_parts(cfg)?;
    TwitterApi::connect_app_only(http, credentials).await
}

pub struct AnalysisReport {
    pub user: User,
    pub table: TweetTable,
    pub csv_path: PathBuf,
    pub timeseries_path: PathBuf,
}

impl AnalysisReport {
    /// Head of the table followed by the summary statistics.
    pub fn summary(&self, head_rows: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "@{}: {} tweets analyzed",
            self.user.username,
            self.table.len()
        );
        out.push_str(&self.table.render_head(head_rows));
        match self.table.mean_likes() {
            Some(mean) => {
                let _ = writeln!(out, "mean likes: {mean:.2}");
            }
            None => out.push_str("mean likes: n/a\n"),
        }
        match self.table.max_length() {
            Some(max) => {
                let _ = writeln!(out, "max length: {max}");
            }
            None => out.push_str("max length: n/a\n"),
        }
        let _ = writeln!(out, "wrote {}", self.csv_path.display());
        let _ = writeln!(out, "wrote {}", self.timeseries_path.display());
        out
    }
}

/// Fetch a timeline, classify every tweet and write both exports into `out_dir`.
pub async fn analyze(
    api: &TwitterApi,
    timeline: Timeline,
    username: &str,
    count: usize,
    out_dir: &Path,
) -> Result<AnalysisReport> {
    if count == 0 {
        return Err(ChorusError::Config("tweet count must be positive".into()).into());
    }

    let user = api.user_by_username(username).await?;
    tracing::info!(user = %user.username, id = %user.id, ?timeline, count, "analysis.start");

    let tweets = match timeline {
        Timeline::User => api.user_timeline_tweets(&user.id, count).await?,
        Timeline::Home => api.home_timeline_tweets(&user.id, count).await?,
    };

    let mut table = TweetTable::from_tweets(&tweets);
    table
        .classify(&SentimentClassifier::new(LexiconScorer::english()))
        .context("classifying tweets")?;

    let csv_path = out_dir.join(CSV_FILE);
    let timeseries_path = out_dir.join(TIMESERIES_FILE);
    write_csv(&table, &csv_path).context("writing tweet table")?;
    write_timeseries(&table, &timeseries_path).context("writing time series")?;

    tracing::info!(rows = table.len(), "analysis.done");
    Ok(AnalysisReport {
        user,
        table,
        csv_path,
        timeseries_path,
    })
}

pub async fn friends(api: &TwitterApi, username: &str, count: usize) -> Result<Vec<User>> {
    let user = api.user_by_username(username).await?;
    api.friend_list(&user.id, count).await
}

/// Follow the filtered stream until Ctrl-C, the listener, or the API ends it.
pub async fn stream(
    api: TwitterApi,
    track: &[String],
    output: &Path,
    max_reconnects: u32,
) -> Result<StreamOutcome> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("stream.ctrl_c");
            on_signal.cancel();
        }
    });

    let mut listener = FileListener::new(output);
    let outcome = TwitterStreamer::new(api)
        .with_max_reconnects(max_reconnects)
        .filter(track, &mut listener, cancel)
        .await?;
    tracing::info!(?outcome, received = listener.received(), "stream.finished");
    Ok(outcome)
}
