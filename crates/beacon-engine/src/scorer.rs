//! Urgency scoring and metadata extraction.
//!
//! [`score`] is a pure function of the item's title and body: a weighted
//! keyword table produces the urgency score, a fixed vocabulary yields the
//! technologies, and the first plausible currency amount becomes the budget.
//! Re-scoring the same text always yields the same result.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

use beacon_core::{Budget, IntermediateItem};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use thiserror::Error;

pub const MAX_SCORE: u8 = 100;

/// Largest amount accepted as a plausible budget.
const MAX_PLAUSIBLE_BUDGET: i64 = 1_000_000;

/// Urgency and payment cues with their weights. Multi-word entries and the
/// bracketed subreddit-style tags are matched as whole phrases.
const KEYWORD_WEIGHTS: &[(&str, i32)] = &[
    ("urgent", 5),
    ("[urgent]", 5),
    ("urgently", 5),
    ("asap", 5),
    ("emergency", 6),
    ("immediately", 5),
    ("right now", 4),
    ("critical", 4),
    ("deadline", 4),
    ("today", 3),
    ("tonight", 3),
    ("site down", 5),
    ("is down", 4),
    ("broken", 4),
    ("not working", 3),
    ("crash", 3),
    ("crashing", 3),
    ("stuck", 3),
    ("need help", 3),
    ("production", 3),
    ("will pay", 8),
    ("willing to pay", 8),
    ("has budget", 6),
    ("paid", 4),
    ("budget", 3),
    ("[hiring]", 6),
    ("hiring", 4),
    ("for hire", 2),
    ("looking for a developer", 4),
    ("need a developer", 4),
    ("ongoing project", -3),
    ("long term", -2),
    ("long-term", -2),
    ("unpaid", -8),
    ("for free", -5),
    ("volunteer", -5),
    ("equity only", -5),
];

/// Canonical technology name and the spellings that map to it.
const TECH_VOCABULARY: &[(&str, &[&str])] = &[
    ("react", &["react", "reactjs", "react.js"]),
    ("react-native", &["react native", "react-native"]),
    ("nextjs", &["next.js", "nextjs"]),
    ("vue", &["vue", "vuejs", "vue.js", "nuxt"]),
    ("angular", &["angular", "angularjs"]),
    ("svelte", &["svelte", "sveltekit"]),
    ("javascript", &["javascript", "js", "jquery"]),
    ("typescript", &["typescript"]),
    ("node", &["node", "node.js", "nodejs"]),
    ("python", &["python"]),
    ("django", &["django"]),
    ("flask", &["flask"]),
    ("fastapi", &["fastapi"]),
    ("php", &["php"]),
    ("laravel", &["laravel"]),
    ("wordpress", &["wordpress", "woocommerce"]),
    ("shopify", &["shopify"]),
    ("ruby", &["ruby"]),
    ("rails", &["rails", "ruby on rails"]),
    ("java", &["java", "spring boot", "springboot"]),
    ("kotlin", &["kotlin"]),
    ("swift", &["swift", "swiftui"]),
    ("flutter", &["flutter", "dart"]),
    ("go", &["golang"]),
    ("rust", &["rust"]),
    ("csharp", &["c#", ".net", "dotnet", "asp.net"]),
    ("sql", &["sql", "mysql", "postgres", "postgresql", "sqlite"]),
    ("mongodb", &["mongodb", "mongo"]),
    ("graphql", &["graphql"]),
    ("aws", &["aws", "lambda", "ec2"]),
    ("docker", &["docker", "kubernetes", "k8s"]),
    ("html-css", &["html", "css", "tailwind"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("item has neither title nor body text")]
    EmptyItem,
}

/// Everything the scorer extracts from one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreResult {
    pub urgency_score: u8,
    pub technologies: BTreeSet<String>,
    pub budget: Option<Budget>,
    /// Keyword-table entries that matched, lowercase.
    pub keywords: BTreeSet<String>,
}

/// Wraps `phrase` so it matches only between non-word characters.
///
/// `\b` cannot be used because several phrases start or end with
/// punctuation (`[urgent]`, `c#`, `.net`).
fn whole_phrase(phrase: &str) -> Regex {
    let pattern = format!(
        r"(?i)(?:^|[^\p{{L}}\p{{N}}_]){}(?:$|[^\p{{L}}\p{{N}}_])",
        regex::escape(phrase)
    );
    Regex::new(&pattern).expect("escaped phrase is a valid regex")
}

static KEYWORDS: LazyLock<Vec<(&'static str, i32, Regex)>> = LazyLock::new(|| {
    KEYWORD_WEIGHTS
        .iter()
        .map(|(phrase, weight)| (*phrase, *weight, whole_phrase(phrase)))
        .collect()
});

static TECHNOLOGIES: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    TECH_VOCABULARY
        .iter()
        .map(|(name, aliases)| (*name, aliases.iter().map(|a| whole_phrase(a)).collect()))
        .collect()
});

const HOURLY_SUFFIX: &str = r"(?P<hourly>\s*(?:/\s*(?:hr|hour|h)\b|per\s+hour\b|an\s+hour\b|hourly\b))?";

static DOLLAR_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\$\s?(?P<amount>\d{{1,3}}(?:,\d{{3}})+|\d+)(?:\.(?P<cents>\d{{1,2}}))?(?P<thousands>k\b)?{HOURLY_SUFFIX}"
    ))
    .expect("valid dollar regex")
});

static WORD_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<amount>\d{{1,3}}(?:,\d{{3}})+|\d+)(?:\.(?P<cents>\d{{1,2}}))?(?P<thousands>k)?\s*(?:usd|dollars)\b{HOURLY_SUFFIX}"
    ))
    .expect("valid currency-word regex")
});

/// Score one item.
///
/// An empty body scores from the title alone; no matches score 0.
///
/// # Errors
///
/// Returns [`ScoringError::EmptyItem`] when both title and body are blank.
pub fn score(item: &IntermediateItem) -> Result<ScoreResult, ScoringError> {
    let text = item.scoring_text();
    if text.is_empty() {
        return Err(ScoringError::EmptyItem);
    }

    let mut total: i32 = 0;
    let mut keywords = BTreeSet::new();
    for (phrase, weight, re) in KEYWORDS.iter() {
        if re.is_match(&text) {
            total += weight;
            keywords.insert((*phrase).to_string());
        }
    }

    Ok(ScoreResult {
        urgency_score: clamp_score(total),
        technologies: extract_technologies(&text),
        budget: extract_budget(&text),
        keywords,
    })
}

fn clamp_score(total: i32) -> u8 {
    u8::try_from(total.clamp(0, i32::from(MAX_SCORE))).unwrap_or(MAX_SCORE)
}

/// Canonical names of every vocabulary technology mentioned in `text`.
#[must_use]
pub fn extract_technologies(text: &str) -> BTreeSet<String> {
    TECHNOLOGIES
        .iter()
        .filter(|(_, aliases)| aliases.iter().any(|re| re.is_match(text)))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// The first plausible currency amount in `text`, in reading order.
#[must_use]
pub fn extract_budget(text: &str) -> Option<Budget> {
    let mut candidates: Vec<(usize, Budget)> = DOLLAR_AMOUNT
        .captures_iter(text)
        .chain(WORD_AMOUNT.captures_iter(text))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            budget_from_captures(&caps).map(|b| (start, b))
        })
        .collect();
    candidates.sort_by_key(|(start, _)| *start);
    candidates.into_iter().map(|(_, budget)| budget).next()
}

fn budget_from_captures(caps: &Captures<'_>) -> Option<Budget> {
    let whole = caps.name("amount")?.as_str().replace(',', "");
    let literal = match caps.name("cents") {
        Some(cents) => format!("{whole}.{}", cents.as_str()),
        None => whole,
    };
    let mut amount = Decimal::from_str(&literal).ok()?;
    if caps.name("thousands").is_some() {
        amount = amount.checked_mul(Decimal::from(1000))?;
    }
    if amount <= Decimal::ZERO || amount > Decimal::from(MAX_PLAUSIBLE_BUDGET) {
        return None;
    }
    Some(if caps.name("hourly").is_some() {
        Budget::hourly(amount)
    } else {
        Budget::fixed(amount)
    })
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
