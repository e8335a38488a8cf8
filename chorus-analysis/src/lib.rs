//! Tweet text cleaning, polarity classification and tabulation.
//!
//! The pipeline is strictly sequential: [`normalize::clean_tweet`] strips mentions,
//! URLs and punctuation; a [`sentiment::PolarityScorer`] scores the cleaned text;
//! [`sentiment::SentimentClassifier`] maps the score to a [`sentiment::Sentiment`];
//! [`table::TweetTable`] holds one row per tweet and [`export`] writes it out.
//!
//! ```
//! use chorus_analysis::lexicon::LexiconScorer;
//! use chorus_analysis::sentiment::{Sentiment, SentimentClassifier};
//!
//! let classifier = SentimentClassifier::new(LexiconScorer::english());
//! let label = classifier.analyze_sentiment("Great day! http://x.co @joe").unwrap();
//! assert_eq!(label, Sentiment::Positive);
//! assert_eq!(label.value(), 1);
//! ```
pub mod export;
pub mod lexicon;
pub mod normalize;
pub mod sentiment;
pub mod table;
