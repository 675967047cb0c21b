//! Offline tests for beacon-db pool configuration and row conversion.
//! These tests do not require a live database connection.

use std::collections::HashMap;
use std::env::VarError;

use beacon_core::{build_app_config, AdapterHealth, BudgetCadence, PlatformState, Signal, SignalStatus};
use beacon_db::{DbError, PlatformStatusRow, PoolConfig, SignalRow};
use chrono::Utc;
use rust_decimal::Decimal;

fn signal_row() -> SignalRow {
    let now = Utc::now();
    SignalRow {
        fingerprint: "fp".to_string(),
        platform: "reddit".to_string(),
        source_id: Some("abc123".to_string()),
        title: "URGENT need React dev".to_string(),
        body: String::new(),
        author: "founder".to_string(),
        url: "https://reddit.com/r/webdev/comments/abc123/".to_string(),
        observed_at: now,
        urgency_score: 18,
        technologies: vec!["react".to_string()],
        keywords: vec!["asap".to_string(), "urgent".to_string()],
        budget_amount: Some(Decimal::new(500, 0)),
        budget_cadence: Some("fixed".to_string()),
        status: "won".to_string(),
        first_seen: now,
        last_seen: now,
        revenue: Some(Decimal::new(450, 0)),
        contacted_at: None,
        won_at: Some(now),
        delivered_at: None,
        closed_at: Some(now),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("BEACON_DB_MAX_CONNECTIONS", "42"),
        ("BEACON_DB_MIN_CONNECTIONS", "7"),
        ("BEACON_DB_ACQUIRE_TIMEOUT_SECS", "9"),
    ]);
    let app_config = build_app_config(|key| {
        env.get(key)
            .map(ToString::to_string)
            .ok_or(VarError::NotPresent)
    })
    .unwrap();

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn signal_row_converts_to_domain_signal() {
    let signal = Signal::try_from(signal_row()).unwrap();
    assert_eq!(signal.urgency_score, 18);
    assert_eq!(signal.status, SignalStatus::Won);
    let budget = signal.budget.unwrap();
    assert_eq!(budget.amount, Decimal::new(500, 0));
    assert_eq!(budget.cadence, BudgetCadence::Fixed);
    assert!(signal.technologies.contains("react"));
    assert_eq!(signal.keywords.len(), 2);
}

#[test]
fn unknown_status_is_a_decode_error() {
    let row = SignalRow {
        status: "archived".to_string(),
        ..signal_row()
    };
    assert!(matches!(Signal::try_from(row), Err(DbError::Decode(_))));
}

#[test]
fn partial_budget_is_a_decode_error() {
    let row = SignalRow {
        budget_cadence: None,
        ..signal_row()
    };
    assert!(matches!(Signal::try_from(row), Err(DbError::Decode(_))));
}

#[test]
fn out_of_range_score_is_a_decode_error() {
    let row = SignalRow {
        urgency_score: -1,
        ..signal_row()
    };
    assert!(matches!(Signal::try_from(row), Err(DbError::Decode(_))));
}

#[test]
fn platform_status_row_converts_to_state() {
    let row = PlatformStatusRow {
        platform: "twitter".to_string(),
        health: "disabled".to_string(),
        consecutive_failures: 0,
        last_success_at: None,
        next_allowed_at: None,
        last_error: Some("configuration error: missing bearer token".to_string()),
        updated_at: Utc::now(),
    };
    let state = PlatformState::try_from(row).unwrap();
    assert_eq!(state.health, AdapterHealth::Disabled);
    assert!(state.is_disabled());
    assert_eq!(state.platform, "twitter");
}
