use beacon_core::BudgetCadence;

use super::*;

fn item(title: &str, body: &str) -> IntermediateItem {
    IntermediateItem::new("reddit", Some("abc123".to_string()), title, "https://x").with_body(body)
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

#[test]
fn urgent_react_request_with_budget() {
    let result = score(&item("URGENT need React dev ASAP will pay $500", "")).unwrap();
    assert!(result.urgency_score >= 13, "score {}", result.urgency_score);
    assert_eq!(result.urgency_score, 18);
    assert_eq!(result.technologies, set(&["react"]));
    assert_eq!(result.budget, Some(Budget::fixed(Decimal::new(500, 0))));
    assert_eq!(
        result.keywords,
        set(&["asap", "urgent", "will pay"]),
        "matched keywords are reported"
    );
}

#[test]
fn scoring_is_deterministic() {
    let subject = item(
        "Emergency: Shopify checkout broken",
        "Client deadline today, $1,200 budget, Node.js + React",
    );
    let first = score(&subject).unwrap();
    for _ in 0..5 {
        assert_eq!(score(&subject).unwrap(), first);
    }
}

#[test]
fn no_cues_scores_zero_without_error() {
    let result = score(&item("Thoughts on tabs versus spaces", "")).unwrap();
    assert_eq!(result.urgency_score, 0);
    assert!(result.technologies.is_empty());
    assert!(result.budget.is_none());
    assert!(result.keywords.is_empty());
}

#[test]
fn empty_body_scores_from_title() {
    let with_body = score(&item("urgent fix needed", "")).unwrap();
    assert_eq!(with_body.urgency_score, 5);
}

#[test]
fn blank_item_is_an_error() {
    assert_eq!(score(&item("  ", "\n")), Err(ScoringError::EmptyItem));
}

#[test]
fn negative_cues_reduce_but_never_below_zero() {
    let result = score(&item("Ongoing project, unpaid volunteer role", "")).unwrap();
    assert_eq!(result.urgency_score, 0);
    let mixed = score(&item("Urgent bug in an ongoing project", "will pay")).unwrap();
    assert_eq!(mixed.urgency_score, 5 + 8 - 3);
}

#[test]
fn score_clamps_at_one_hundred() {
    let text = KEYWORD_WEIGHTS
        .iter()
        .filter(|(_, w)| *w > 0)
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(" ");
    let result = score(&item(&text, &text)).unwrap();
    assert_eq!(result.urgency_score, MAX_SCORE);
}

#[test]
fn keywords_match_whole_words_only() {
    // "pasap" and "urgentness" must not count.
    let result = score(&item("pasap urgentness", "")).unwrap();
    assert_eq!(result.urgency_score, 0);
}

#[test]
fn each_keyword_counts_once() {
    let result = score(&item("urgent urgent URGENT", "urgent")).unwrap();
    assert_eq!(result.urgency_score, 5);
}

#[test]
fn bracketed_tags_boost_score() {
    let plain = score(&item("urgent: fix my site", "")).unwrap();
    let tagged = score(&item("[URGENT] fix my site", "")).unwrap();
    assert!(tagged.urgency_score > plain.urgency_score);
}

#[test]
fn technologies_use_aliases_and_word_boundaries() {
    assert_eq!(
        extract_technologies("Need a NextJS + Postgres expert"),
        set(&["nextjs", "sql"])
    );
    assert_eq!(extract_technologies("Our C# API on .NET"), set(&["csharp"]));
    assert!(extract_technologies("I trust the reaction").is_empty());
}

#[test]
fn budget_parses_thousands_separators_and_cents() {
    assert_eq!(
        extract_budget("budget is $1,250.50 total"),
        Some(Budget::fixed(Decimal::new(125_050, 2)))
    );
}

#[test]
fn budget_marks_hourly_rates() {
    for text in ["$45/hr", "$45 per hour", "$45 / hour", "paying $45 an hour"] {
        let budget = extract_budget(text).unwrap();
        assert_eq!(budget.cadence, BudgetCadence::Hourly, "{text}");
        assert_eq!(budget.amount, Decimal::new(45, 0), "{text}");
    }
}

#[test]
fn budget_understands_k_suffix_and_currency_words() {
    assert_eq!(
        extract_budget("up to $5k"),
        Some(Budget::fixed(Decimal::new(5000, 0)))
    );
    assert_eq!(
        extract_budget("will pay 300 USD"),
        Some(Budget::fixed(Decimal::new(300, 0)))
    );
}

#[test]
fn budget_takes_first_plausible_amount() {
    assert_eq!(
        extract_budget("Paid $0 so far, offering $750 now, $900 max"),
        Some(Budget::fixed(Decimal::new(750, 0)))
    );
}

#[test]
fn no_currency_means_no_budget() {
    assert_eq!(extract_budget("we have 3 pages and 2 forms"), None);
}
