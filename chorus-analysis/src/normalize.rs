use regex::Regex;
use std::sync::OnceLock;

static NOISE: OnceLock<Regex> = OnceLock::new();

// Alternation order matters: a mention wins over the bare `@`, and a URL is only
// reached when its first character is alphanumeric.
fn noise() -> &'static Regex {
    NOISE.get_or_init(|| {
        Regex::new(r"(@[A-Za-z0-9]+)|([^0-9A-Za-z \t])|(\w+://\S+)").expect("static noise pattern")
    })
}

/// Strip mentions, URLs and punctuation from tweet text, then collapse whitespace.
///
/// Every removed span is replaced by a space before collapsing, so
/// `"well,done"` becomes `"well done"` rather than `"welldone"`.
///
/// ```
/// use chorus_analysis::normalize::clean_tweet;
///
/// assert_eq!(clean_tweet("Great day! http://x.co @joe"), "Great day");
/// assert_eq!(clean_tweet("@a @b https://t.co/xyz"), "");
/// ```
pub fn clean_tweet(text: &str) -> String {
    let replaced = noise().replace_all(text, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
