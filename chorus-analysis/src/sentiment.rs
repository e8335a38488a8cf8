//! Three-way sentiment classification on top of a polarity score.
use crate::normalize::clean_tweet;
use chorus_common::Result;
use std::fmt;

/// Produces a polarity in `[-1.0, 1.0]` for already-cleaned text.
pub trait PolarityScorer {
    fn polarity(&self, text: &str) -> Result<f64>;
}

impl<S: PolarityScorer + ?Sized> PolarityScorer for &S {
    fn polarity(&self, text: &str) -> Result<f64> {
        (**self).polarity(text)
    }
}

impl<S: PolarityScorer + ?Sized> PolarityScorer for Box<S> {
    fn polarity(&self, text: &str) -> Result<f64> {
        (**self).polarity(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// `> 0` is positive, `< 0` negative, anything else (zero, NaN) neutral.
    pub fn from_polarity(score: f64) -> Self {
        if score > 0.0 {
            Sentiment::Positive
        } else if score < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Numeric encoding: +1, 0, -1.
    pub fn value(self) -> i8 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Neutral => 0,
            Sentiment::Negative => -1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct SentimentClassifier<S> {
    scorer: S,
}

impl<S: PolarityScorer> SentimentClassifier<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Clean `raw` and return the scorer's polarity for it.
    pub fn polarity(&self, raw: &str) -> Result<f64> {
        self.scorer.polarity(&clean_tweet(raw))
    }

    /// Clean, score and classify one tweet. Scorer errors are returned as-is.
    pub fn analyze_sentiment(&self, raw: &str) -> Result<Sentiment> {
        self.polarity(raw).map(Sentiment::from_polarity)
    }

    /// One label per input, in input order; stops at the first scorer error.
    pub fn classify_all<'a, I>(&self, texts: I) -> Result<Vec<Sentiment>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts
            .into_iter()
            .map(|text| self.analyze_sentiment(text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_common::ChorusError;
    use std::cell::RefCell;

    struct Fixed(f64);

    impl PolarityScorer for Fixed {
        fn polarity(&self, _text: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct Recording {
        seen: RefCell<Vec<String>>,
    }

    impl PolarityScorer for Recording {
        fn polarity(&self, text: &str) -> Result<f64> {
            self.seen.borrow_mut().push(text.to_string());
            Ok(text.len() as f64 - 5.0)
        }
    }

    struct Failing;

    impl PolarityScorer for Failing {
        fn polarity(&self, text: &str) -> Result<f64> {
            if text.contains("boom") {
                Err(ChorusError::Scorer(format!("cannot score {text:?}")))
            } else {
                Ok(0.1)
            }
        }
    }

    #[test]
    fn stub_scores_map_to_labels() {
        assert_eq!(SentimentClassifier::new(Fixed(0.5)).analyze_sentiment("x").unwrap().value(), 1);
        assert_eq!(SentimentClassifier::new(Fixed(0.0)).analyze_sentiment("x").unwrap().value(), 0);
        assert_eq!(SentimentClassifier::new(Fixed(-0.3)).analyze_sentiment("x").unwrap().value(), -1);
    }

    #[test]
    fn nan_is_neutral() {
        assert_eq!(Sentiment::from_polarity(f64::NAN), Sentiment::Neutral);
        assert_eq!(Sentiment::from_polarity(-0.0), Sentiment::Neutral);
    }

    #[test]
    fn scorer_sees_cleaned_text() {
        let classifier = SentimentClassifier::new(Recording::default());
        classifier.analyze_sentiment("Great day! http://x.co @joe").unwrap();
        assert_eq!(*classifier.scorer().seen.borrow(), vec!["Great day".to_string()]);
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = SentimentClassifier::new(Recording::default());
        let first = classifier.analyze_sentiment("so so good").unwrap();
        let second = classifier.analyze_sentiment("so so good").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn classify_all_preserves_count_and_order() {
        // Recording scores len - 5: "abc" negative, "abcde" neutral, "abcdefg" positive
        let classifier = SentimentClassifier::new(Recording::default());
        let labels = classifier
            .classify_all(["abcdefg", "abc", "abcde", "abcdefg"])
            .unwrap();
        assert_eq!(
            labels,
            vec![
                Sentiment::Positive,
                Sentiment::Negative,
                Sentiment::Neutral,
                Sentiment::Positive
            ]
        );
        assert!(classifier.classify_all(std::iter::empty()).unwrap().is_empty());
    }

    #[test]
    fn scorer_errors_propagate_unmodified() {
        let classifier = SentimentClassifier::new(Failing);
        match classifier.analyze_sentiment("boom!") {
            Err(ChorusError::Scorer(msg)) => assert_eq!(msg, "cannot score \"boom\""),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(classifier.classify_all(["fine", "boom", "fine"]).is_err());
    }

    #[test]
    fn labels_render_for_humans() {
        assert_eq!(Sentiment::Positive.to_string(), "positive");
        assert_eq!(Sentiment::Negative.label(), "negative");
    }
}
