//! Writers for the tweet table (CSV) and its like/retweet series (chart-ready JSON).
use crate::table::TweetTable;
use chorus_common::{ChorusError, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    text: &'a str,
    length: usize,
    source: &'a str,
    retweets: u64,
    date: String,
    likes: u64,
    sentiment: i8,
}

#[derive(Debug, Serialize)]
pub struct SeriesDoc {
    pub series: Vec<Series>,
}

#[derive(Debug, Serialize)]
pub struct Series {
    pub label: &'static str,
    pub color: &'static str,
    pub points: Vec<Point>,
}

#[derive(Debug, Serialize)]
pub struct Point {
    pub date: String,
    pub value: u64,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Columns: `text,length,source,retweets,date,likes,sentiment`.
pub fn write_csv(table: &TweetTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let export_err = |e: csv::Error| ChorusError::Export(format!("{}: {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    for record in table.records() {
        writer
            .serialize(CsvRow {
                text: &record.text,
                length: record.length,
                source: &record.source,
                retweets: record.retweets,
                date: record.date_rfc3339(),
                likes: record.likes,
                sentiment: record.sentiment.value(),
            })
            .map_err(export_err)?;
    }
    // serialize() only emits the header alongside the first row
    if table.is_empty() {
        writer
            .write_record(["text", "length", "source", "retweets", "date", "likes", "sentiment"])
            .map_err(export_err)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = table.len(), "export.csv.written");
    Ok(())
}

fn points(raw: Vec<(OffsetDateTime, u64)>) -> Result<Vec<Point>> {
    raw.into_iter()
        .map(|(date, value)| -> Result<Point> {
            let date = date
                .format(&Rfc3339)
                .map_err(|e| ChorusError::Export(format!("formatting {date}: {e}")))?;
            Ok(Point { date, value })
        })
        .collect()
}

pub fn timeseries(table: &TweetTable) -> Result<SeriesDoc> {
    Ok(SeriesDoc {
        series: vec![
            Series {
                label: "Likes",
                color: "r",
                points: points(table.likes_series())?,
            },
            Series {
                label: "Re-Tweets",
                color: "b",
                points: points(table.retweets_series())?,
            },
        ],
    })
}

/// Likes and retweets over time as `{"series": [...]}`.
pub fn write_timeseries(table: &TweetTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let doc = timeseries(table)?;
    fs::write(path, serde_json::to_vec_pretty(&doc)?)?;
    tracing::info!(path = %path.display(), points = doc.series[0].points.len(), "export.timeseries.written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconScorer;
    use crate::sentiment::SentimentClassifier;
    use chorus_social::twitter::Tweet;
    use serde_json::{Value, json};

    fn table() -> TweetTable {
        let tweets: Vec<Tweet> = serde_json::from_value(json!([
            {
                "id": "1",
                "text": "great, \"quoted\" news",
                "created_at": "2024-05-02T12:00:00Z",
                "source": "Twitter for iPhone",
                "public_metrics": {"like_count": 7, "retweet_count": 3}
            },
            {
                "id": "2",
                "text": "bad day",
                "created_at": "2024-05-01T12:00:00Z",
                "public_metrics": {"like_count": 1, "retweet_count": 5}
            },
            {"id": "3", "text": "no date here"}
        ]))
        .unwrap();
        let mut table = TweetTable::from_tweets(&tweets);
        table
            .classify(&SentimentClassifier::new(LexiconScorer::english()))
            .unwrap();
        table
    }

    #[test]
    fn csv_has_header_and_one_row_per_tweet() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/out/tweets.csv");
        write_csv(&table(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            ["text", "length", "source", "retweets", "date", "likes", "sentiment"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "great, \"quoted\" news");
        assert_eq!(&rows[0][2], "Twitter for iPhone");
        assert_eq!(&rows[0][4], "2024-05-02T12:00:00Z");
        assert_eq!(&rows[0][6], "1");
        assert_eq!(&rows[1][6], "-1");
        assert_eq!(&rows[2][4], "");
        assert_eq!(&rows[2][6], "0");
    }

    #[test]
    fn empty_table_still_gets_a_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tweets.csv");
        write_csv(&TweetTable::default(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim_end(), "text,length,source,retweets,date,likes,sentiment");
    }

    #[test]
    fn timeseries_document_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plots/timeseries.json");
        write_timeseries(&table(), &path).unwrap();

        let doc: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let series = doc["series"].as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["label"], "Likes");
        assert_eq!(series[0]["color"], "r");
        assert_eq!(series[1]["label"], "Re-Tweets");
        assert_eq!(series[1]["color"], "b");
        assert_eq!(
            series[0]["points"],
            json!([
                {"date": "2024-05-01T12:00:00Z", "value": 1},
                {"date": "2024-05-02T12:00:00Z", "value": 7}
            ])
        );
        assert_eq!(series[1]["points"][0]["value"], 5);
    }
}
