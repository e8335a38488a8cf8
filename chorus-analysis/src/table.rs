use crate::sentiment::{PolarityScorer, Sentiment, SentimentClassifier};
use chorus_common::Result;
use chorus_social::twitter::Tweet;
use std::fmt::Write as _;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const PREVIEW_CHARS: usize = 48;

/// One row per fetched tweet.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetRecord {
    pub text: String,
    /// Unicode scalar values in the raw text.
    pub length: usize,
    pub source: String,
    pub retweets: u64,
    pub likes: u64,
    pub date: Option<OffsetDateTime>,
    pub sentiment: Sentiment,
}

impl TweetRecord {
    pub fn from_tweet(tweet: &Tweet) -> Self {
        Self {
            text: tweet.text.clone(),
            length: tweet.text.chars().count(),
            source: tweet.source.clone().unwrap_or_default(),
            retweets: tweet.retweet_count(),
            likes: tweet.like_count(),
            date: tweet.created_at_utc(),
            sentiment: Sentiment::Neutral,
        }
    }

    /// RFC 3339 timestamp, or an empty string for rows without a date.
    pub fn date_rfc3339(&self) -> String {
        self.date
            .and_then(|d| d.format(&Rfc3339).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TweetTable {
    records: Vec<TweetRecord>,
}

impl TweetTable {
    pub fn from_tweets(tweets: &[Tweet]) -> Self {
        Self {
            records: tweets.iter().map(TweetRecord::from_tweet).collect(),
        }
    }

    /// Fill the sentiment column. On error the table is left untouched.
    pub fn classify<S: PolarityScorer>(&mut self, classifier: &SentimentClassifier<S>) -> Result<()> {
        let labels = classifier.classify_all(self.records.iter().map(|r| r.text.as_str()))?;
        for (record, label) in self.records.iter_mut().zip(labels) {
            record.sentiment = label;
        }
        tracing::debug!(rows = self.records.len(), "table.classified");
        Ok(())
    }

    pub fn records(&self) -> &[TweetRecord] {
        &self.records
    }

    pub fn head(&self, n: usize) -> &[TweetRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mean_likes(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: u64 = self.records.iter().map(|r| r.likes).sum();
        Some(total as f64 / self.records.len() as f64)
    }

    pub fn max_length(&self) -> Option<usize> {
        self.records.iter().map(|r| r.length).max()
    }

    pub fn likes_series(&self) -> Vec<(OffsetDateTime, u64)> {
        self.series(|r| r.likes)
    }

    pub fn retweets_series(&self) -> Vec<(OffsetDateTime, u64)> {
        self.series(|r| r.retweets)
    }

    // Stable sort keeps fetch order for tweets sharing a timestamp.
    fn series(&self, value: impl Fn(&TweetRecord) -> u64) -> Vec<(OffsetDateTime, u64)> {
        let mut points: Vec<_> = self
            .records
            .iter()
            .filter_map(|r| r.date.map(|d| (d, value(r))))
            .collect();
        points.sort_by_key(|(d, _)| *d);
        points
    }

    /// Fixed-width text rendering of the first `n` rows.
    pub fn render_head(&self, n: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>3}  {:<width$}  {:>6}  {:>8}  {:>6}  {:>9}",
            "#",
            "text",
            "len",
            "retweets",
            "likes",
            "sentiment",
            width = PREVIEW_CHARS
        );
        for (i, r) in self.head(n).iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>3}  {:<width$}  {:>6}  {:>8}  {:>6}  {:>9}",
                i,
                preview(&r.text),
                r.length,
                r.retweets,
                r.likes,
                r.sentiment.value(),
                width = PREVIEW_CHARS
            );
        }
        out
    }
}

fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconScorer;
    use chorus_common::ChorusError;
    use serde_json::json;

    fn tweet(text: &str, likes: u64, retweets: u64, created_at: Option<&str>) -> Tweet {
        serde_json::from_value(json!({
            "id": "1",
            "text": text,
            "created_at": created_at,
            "source": "Twitter Web App",
            "public_metrics": {"like_count": likes, "retweet_count": retweets}
        }))
        .unwrap()
    }

    fn sample() -> Vec<Tweet> {
        vec![
            tweet("What a great release 🎉", 10, 2, Some("2024-05-03T09:00:00.000Z")),
            tweet("terrible outage today", 4, 8, Some("2024-05-01T09:00:00.000Z")),
            tweet("shipping the patch", 1, 0, None),
        ]
    }

    #[test]
    fn builds_one_row_per_tweet() {
        let table = TweetTable::from_tweets(&sample());
        assert_eq!(table.len(), 3);
        let first = &table.records()[0];
        assert_eq!(first.length, 22);
        assert_eq!(first.source, "Twitter Web App");
        assert_eq!(first.sentiment, Sentiment::Neutral);
        assert_eq!(table.records()[2].date, None);
        assert_eq!(table.records()[2].date_rfc3339(), "");
    }

    #[test]
    fn missing_fields_default() {
        let bare: Tweet = serde_json::from_value(json!({"id": "9", "text": "hi"})).unwrap();
        let record = TweetRecord::from_tweet(&bare);
        assert_eq!(record.source, "");
        assert_eq!((record.likes, record.retweets), (0, 0));
        assert!(record.date.is_none());
    }

    #[test]
    fn classify_fills_sentiment() {
        let mut table = TweetTable::from_tweets(&sample());
        table
            .classify(&SentimentClassifier::new(LexiconScorer::english()))
            .unwrap();
        let labels: Vec<i8> = table.records().iter().map(|r| r.sentiment.value()).collect();
        assert_eq!(labels, vec![1, -1, 0]);
    }

    #[test]
    fn classify_errors_leave_table_unchanged() {
        struct Broken;
        impl PolarityScorer for Broken {
            fn polarity(&self, _text: &str) -> Result<f64> {
                Err(ChorusError::Scorer("offline".into()))
            }
        }

        let mut table = TweetTable::from_tweets(&sample());
        let before = table.clone();
        assert!(table.classify(&SentimentClassifier::new(Broken)).is_err());
        assert_eq!(table, before);
    }

    #[test]
    fn summary_statistics() {
        let table = TweetTable::from_tweets(&sample());
        assert_eq!(table.mean_likes(), Some(5.0));
        assert_eq!(table.max_length(), Some(22));

        let empty = TweetTable::default();
        assert!(empty.is_empty());
        assert_eq!(empty.mean_likes(), None);
        assert_eq!(empty.max_length(), None);
    }

    #[test]
    fn series_are_time_ordered_and_skip_undated_rows() {
        let table = TweetTable::from_tweets(&sample());
        let likes: Vec<u64> = table.likes_series().into_iter().map(|(_, v)| v).collect();
        let retweets: Vec<u64> = table.retweets_series().into_iter().map(|(_, v)| v).collect();
        assert_eq!(likes, vec![4, 10]);
        assert_eq!(retweets, vec![8, 2]);
        let dates = table.likes_series();
        assert!(dates[0].0 < dates[1].0);
    }

    #[test]
    fn head_is_bounded() {
        let table = TweetTable::from_tweets(&sample());
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 3);
        assert!(TweetTable::default().head(5).is_empty());
    }

    #[test]
    fn render_head_lists_requested_rows() {
        let long = "a".repeat(120);
        let table = TweetTable::from_tweets(&[
            tweet(&long, 1, 1, None),
            tweet("line\nbreak", 2, 2, None),
            tweet("third", 3, 3, None),
        ]);
        let rendered = table.render_head(2);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("sentiment"));
        assert!(lines[1].contains("..."));
        assert!(lines[2].contains("line break"));
        assert!(!rendered.contains("third"));
    }
}
