use chorus_analysis::export::{write_csv, write_timeseries};
use chorus_analysis::lexicon::LexiconScorer;
use chorus_analysis::sentiment::{Sentiment, SentimentClassifier};
use chorus_analysis::table::TweetTable;
use chorus_social::twitter::Tweet;
use serde_json::json;

fn timeline() -> Vec<Tweet> {
    let texts = [
        "Loving the new #rustlang release! https://blog.rust-lang.org @rustlang",
        "@support this is the worst update ever",
        "Meeting at 10",
        "not bad at all",
        "RT @ferris: really awesome crab content",
    ];
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::from_value(json!({
                "id": i.to_string(),
                "text": text,
                "created_at": format!("2024-06-0{}T08:00:00.000Z", 5 - i),
                "public_metrics": {"like_count": i * 10, "retweet_count": i}
            }))
            .unwrap()
        })
        .collect()
}

#[test]
fn timeline_to_files() {
    let tweets = timeline();
    let mut table = TweetTable::from_tweets(&tweets);
    let classifier = SentimentClassifier::new(LexiconScorer::english().with_word("loving", 0.6));
    table.classify(&classifier).unwrap();

    assert_eq!(table.len(), tweets.len());
    for (record, tweet) in table.records().iter().zip(&tweets) {
        assert_eq!(record.text, tweet.text);
    }
    let labels: Vec<Sentiment> = table.records().iter().map(|r| r.sentiment).collect();
    assert_eq!(
        labels,
        vec![
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Neutral,
            Sentiment::Positive,
            Sentiment::Positive,
        ]
    );
    assert_eq!(table.mean_likes(), Some(20.0));

    // newest tweet first in the timeline, oldest first in the series
    let likes: Vec<u64> = table.likes_series().into_iter().map(|(_, v)| v).collect();
    assert_eq!(likes, vec![40, 30, 20, 10, 0]);

    let tmp = tempfile::tempdir().unwrap();
    write_csv(&table, tmp.path().join("tweets.csv")).unwrap();
    write_timeseries(&table, tmp.path().join("timeseries.json")).unwrap();

    let csv = std::fs::read_to_string(tmp.path().join("tweets.csv")).unwrap();
    assert_eq!(csv.lines().count(), tweets.len() + 1);
}
