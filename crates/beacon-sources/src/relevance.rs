//! Cheap pre-filter for general-purpose forums.
//!
//! Subreddit and tag feeds are mostly discussion, not requests for help.
//! Adapters for those platforms drop items that show no sign of someone
//! needing a developer before they ever reach the scorer.

const CRISIS_KEYWORDS: &[&str] = &[
    "help",
    "stuck",
    "error",
    "bug",
    "broken",
    "not working",
    "urgent",
    "asap",
    "deadline",
    "emergency",
    "critical",
    "freelance",
    "hire",
    "looking for",
    "need developer",
    "pay",
    "budget",
    "project",
    "production",
    "client",
];

const HIGH_VALUE_PHRASES: &[&str] = &[
    "looking for developer",
    "looking for a developer",
    "need help with",
    "hire freelancer",
    "urgent project",
    "willing to pay",
    "has budget",
];

/// At least two crisis keywords, or one high-value phrase.
#[must_use]
pub fn looks_like_request(text: &str) -> bool {
    let text = text.to_lowercase();
    if HIGH_VALUE_PHRASES.iter().any(|p| text.contains(p)) {
        return true;
    }
    CRISIS_KEYWORDS
        .iter()
        .filter(|k| text.contains(*k))
        .take(2)
        .count()
        >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_keywords_pass() {
        assert!(looks_like_request("Stuck on a bug in my checkout page"));
    }

    #[test]
    fn single_keyword_fails() {
        assert!(!looks_like_request("Show off your side project"));
    }

    #[test]
    fn high_value_phrase_alone_passes() {
        assert!(looks_like_request("Willing to pay for a quick review"));
    }

    #[test]
    fn plain_discussion_fails() {
        assert!(!looks_like_request("What is your favourite editor theme?"));
    }
}
