use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use beacon_core::{Budget, FunnelSummary, PersistenceError, SignalFilter};
use chrono::{Duration, TimeZone};
use tokio::sync::Notify;

use super::*;
use crate::memory_store::MemoryStore;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn item(id: &str, title: &str) -> IntermediateItem {
    IntermediateItem::new("reddit", Some(id.to_string()), title, "https://reddit.com/x")
        .with_author("poster")
        .with_observed_at(t0() - Duration::minutes(5))
}

fn scored(score: u8, techs: &[&str], budget: Option<Budget>) -> ScoreResult {
    ScoreResult {
        urgency_score: score,
        technologies: techs.iter().map(ToString::to_string).collect(),
        budget,
        keywords: BTreeSet::new(),
    }
}

fn gate() -> (SignalGate, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (SignalGate::new(store.clone()), store)
}

async fn only_signal(store: &MemoryStore) -> Signal {
    let rows = store.list(&SignalFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    rows.into_iter().next().unwrap()
}

#[test]
fn fingerprint_prefers_source_id() {
    let a = fingerprint("reddit", Some("abc123"), "Title one");
    let b = fingerprint("reddit", Some("abc123"), "Completely different");
    assert_eq!(a, b);
    assert_ne!(a, fingerprint("hackernews", Some("abc123"), "Title one"));
    assert_eq!(a.len(), 64);
}

#[test]
fn fingerprint_falls_back_to_normalised_title() {
    let a = fingerprint("upwork", None, "Fix  my   WordPress site");
    let b = fingerprint("upwork", Some("  "), "fix my wordpress site");
    assert_eq!(a, b);
    assert_ne!(a, fingerprint("upwork", None, "fix my wordpress site today"));
}

#[tokio::test]
async fn first_admission_creates_new_signal() {
    let (gate, store) = gate();
    let admission = gate
        .admit_at("reddit", &item("abc123", "URGENT"), &scored(18, &["react"], None), t0())
        .await
        .unwrap();
    assert_eq!(admission, Admission::Created);

    let signal = only_signal(&store).await;
    assert_eq!(signal.status, SignalStatus::New);
    assert_eq!(signal.urgency_score, 18);
    assert_eq!(signal.first_seen, t0());
    assert_eq!(signal.last_seen, t0());
    assert_eq!(signal.author, "poster");
    assert_eq!(signal.observed_at, t0() - Duration::minutes(5));
}

#[tokio::test]
async fn repeated_admission_keeps_one_row() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    for n in 0..5 {
        let admission = gate
            .admit_at("reddit", &subject, &scored(10, &[], None), t0() + Duration::minutes(n))
            .await
            .unwrap();
        let expected = if n == 0 { Admission::Created } else { Admission::Updated };
        assert_eq!(admission, expected);
    }
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn lower_score_leaves_stored_score_but_advances_last_seen() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    gate.admit_at("reddit", &subject, &scored(20, &[], None), t0())
        .await
        .unwrap();
    let later = t0() + Duration::minutes(10);
    gate.admit_at("reddit", &subject, &scored(5, &[], None), later)
        .await
        .unwrap();

    let signal = only_signal(&store).await;
    assert_eq!(signal.urgency_score, 20);
    assert_eq!(signal.last_seen, later);
    assert_eq!(signal.first_seen, t0());
}

#[tokio::test]
async fn higher_score_replaces_stored_score() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    gate.admit_at("reddit", &subject, &scored(5, &[], None), t0())
        .await
        .unwrap();
    let later = t0() + Duration::minutes(10);
    gate.admit_at("reddit", &subject, &scored(30, &[], None), later)
        .await
        .unwrap();

    let signal = only_signal(&store).await;
    assert_eq!(signal.urgency_score, 30);
    assert_eq!(signal.last_seen, later);
    assert_eq!(signal.first_seen, t0());
}

#[tokio::test]
async fn out_of_order_observation_never_moves_last_seen_back() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    gate.admit_at("reddit", &subject, &scored(5, &[], None), t0())
        .await
        .unwrap();
    gate.admit_at("reddit", &subject, &scored(5, &[], None), t0() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(only_signal(&store).await.last_seen, t0());
}

#[tokio::test]
async fn metadata_is_unioned_and_budget_never_replaced() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    let first_budget = Budget::fixed(Decimal::new(500, 0));
    gate.admit_at("reddit", &subject, &scored(5, &["react"], None), t0())
        .await
        .unwrap();
    gate.admit_at("reddit", &subject, &scored(5, &["node"], Some(first_budget)), t0())
        .await
        .unwrap();
    gate.admit_at(
        "reddit",
        &subject,
        &scored(5, &[], Some(Budget::hourly(Decimal::new(40, 0)))),
        t0(),
    )
    .await
    .unwrap();

    let signal = only_signal(&store).await;
    let expected: BTreeSet<String> = ["node", "react"].iter().map(ToString::to_string).collect();
    assert_eq!(signal.technologies, expected);
    assert_eq!(signal.budget, Some(first_budget));
}

#[tokio::test]
async fn terminal_signal_is_rejected_and_untouched() {
    let (gate, store) = gate();
    let subject = item("abc123", "URGENT");
    gate.admit_at("reddit", &subject, &scored(5, &[], None), t0())
        .await
        .unwrap();
    let fp = fingerprint("reddit", Some("abc123"), "URGENT");
    gate.request_status_transition_at(&fp, SignalStatus::Lost, None, t0())
        .await
        .unwrap();
    let before = only_signal(&store).await;

    let admission = gate
        .admit_at("reddit", &subject, &scored(90, &["rust"], None), t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(admission, Admission::Rejected);
    assert_eq!(only_signal(&store).await, before);
}

#[tokio::test]
async fn concurrent_admissions_of_same_item_create_one_row() {
    let (gate, store) = gate();
    let gate = Arc::new(gate);
    let handles: Vec<_> = (0..16)
        .map(|n| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                gate.admit("reddit", &item("abc123", "URGENT"), &scored(n, &[], None))
                    .await
                    .unwrap()
            })
        })
        .collect();
    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() == Admission::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.len(), 1);
    assert_eq!(only_signal(&store).await.urgency_score, 15);
}

async fn admitted(gate: &SignalGate) -> String {
    gate.admit_at("reddit", &item("abc123", "URGENT"), &scored(5, &[], None), t0())
        .await
        .unwrap();
    fingerprint("reddit", Some("abc123"), "URGENT")
}

#[tokio::test]
async fn new_to_won_succeeds_with_revenue() {
    let (gate, _store) = gate();
    let fp = admitted(&gate).await;
    let at = t0() + Duration::days(1);
    let signal = gate
        .request_status_transition_at(&fp, SignalStatus::Won, Some(Decimal::new(750, 0)), at)
        .await
        .unwrap();
    assert_eq!(signal.status, SignalStatus::Won);
    assert_eq!(signal.revenue, Some(Decimal::new(750, 0)));
    assert_eq!(signal.won_at, Some(at));
    assert_eq!(signal.closed_at, Some(at));
}

#[tokio::test]
async fn new_to_delivered_is_invalid() {
    let (gate, store) = gate();
    let fp = admitted(&gate).await;
    let err = gate
        .request_status_transition(&fp, SignalStatus::Delivered, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::InvalidTransition(e) if e.from == SignalStatus::New && e.to == SignalStatus::Delivered
    ));
    assert_eq!(only_signal(&store).await.status, SignalStatus::New);
}

#[tokio::test]
async fn won_to_lost_is_invalid() {
    let (gate, _store) = gate();
    let fp = admitted(&gate).await;
    gate.request_status_transition(&fp, SignalStatus::Won, None)
        .await
        .unwrap();
    let err = gate
        .request_status_transition(&fp, SignalStatus::Lost, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::InvalidTransition(_)));
}

#[tokio::test]
async fn delivered_keeps_won_revenue_when_none_given() {
    let (gate, _store) = gate();
    let fp = admitted(&gate).await;
    gate.request_status_transition_at(&fp, SignalStatus::Contacted, None, t0())
        .await
        .unwrap();
    gate.request_status_transition_at(&fp, SignalStatus::Won, Some(Decimal::new(500, 0)), t0())
        .await
        .unwrap();
    let delivered = gate
        .request_status_transition_at(&fp, SignalStatus::Delivered, None, t0())
        .await
        .unwrap();
    assert_eq!(delivered.revenue, Some(Decimal::new(500, 0)));
    assert_eq!(delivered.contacted_at, Some(t0()));
    assert_eq!(delivered.delivered_at, Some(t0()));
}

#[tokio::test]
async fn revenue_rules_are_enforced() {
    let (gate, _store) = gate();
    let fp = admitted(&gate).await;
    assert!(matches!(
        gate.request_status_transition(&fp, SignalStatus::Contacted, Some(Decimal::ONE))
            .await,
        Err(GateError::RevenueNotAllowed(SignalStatus::Contacted))
    ));
    assert!(matches!(
        gate.request_status_transition(&fp, SignalStatus::Won, Some(Decimal::NEGATIVE_ONE))
            .await,
        Err(GateError::NegativeRevenue)
    ));
}

#[tokio::test]
async fn unknown_fingerprint_is_not_found() {
    let (gate, _store) = gate();
    let err = gate
        .request_status_transition("deadbeef", SignalStatus::Contacted, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound(fp) if fp == "deadbeef"));
}

/// Store whose next read returns, then parks until released, so a second
/// gate (another process in production) can act between read and write.
#[derive(Default)]
struct PausingStore {
    inner: MemoryStore,
    armed: AtomicBool,
    read_done: Notify,
    release: Notify,
}

impl PausingStore {
    fn pause_next_read(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalStore for PausingStore {
    async fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Signal>, PersistenceError> {
        let row = self.inner.get_by_fingerprint(fingerprint).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        row
    }

    async fn insert(&self, signal: &Signal) -> Result<(), PersistenceError> {
        self.inner.insert(signal).await
    }

    async fn record_observation(&self, signal: &Signal) -> Result<bool, PersistenceError> {
        self.inner.record_observation(signal).await
    }

    async fn update_status(
        &self,
        signal: &Signal,
        expected: SignalStatus,
    ) -> Result<bool, PersistenceError> {
        self.inner.update_status(signal, expected).await
    }

    async fn list(&self, filter: &SignalFilter) -> Result<Vec<Signal>, PersistenceError> {
        self.inner.list(filter).await
    }

    async fn funnel_summary(&self) -> Result<FunnelSummary, PersistenceError> {
        self.inner.funnel_summary().await
    }
}

/// Two gates over one store, with the item already admitted as `new`.
async fn two_gates() -> (Arc<SignalGate>, SignalGate, Arc<PausingStore>, String) {
    let store = Arc::new(PausingStore::default());
    let first = Arc::new(SignalGate::new(store.clone()));
    let second = SignalGate::new(store.clone());
    let fp = admitted(&first).await;
    (first, second, store, fp)
}

#[tokio::test]
async fn stale_observation_does_not_undo_transition_from_another_gate() {
    let (poller, dashboard, store, fp) = two_gates().await;

    store.pause_next_read();
    let poll = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move {
            poller
                .admit_at(
                    "reddit",
                    &item("abc123", "URGENT"),
                    &scored(40, &["rust"], None),
                    t0() + Duration::hours(1),
                )
                .await
        })
    };
    store.read_done.notified().await;

    let won_at = t0() + Duration::minutes(30);
    dashboard
        .request_status_transition_at(&fp, SignalStatus::Won, Some(Decimal::new(500, 0)), won_at)
        .await
        .unwrap();
    store.release.notify_one();

    assert_eq!(poll.await.unwrap().unwrap(), Admission::Rejected);
    let stored = store.inner.get_by_fingerprint(&fp).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Won);
    assert_eq!(stored.revenue, Some(Decimal::new(500, 0)));
    assert_eq!(stored.won_at, Some(won_at));
    assert_eq!(stored.urgency_score, 5);
    assert!(stored.technologies.is_empty());
}

#[tokio::test]
async fn transition_rechecks_status_changed_by_another_gate() {
    let (first, second, store, fp) = two_gates().await;

    store.pause_next_read();
    let pending = {
        let first = Arc::clone(&first);
        let fp = fp.clone();
        tokio::spawn(async move {
            first
                .request_status_transition_at(&fp, SignalStatus::Won, Some(Decimal::ONE), t0())
                .await
        })
    };
    store.read_done.notified().await;
    second
        .request_status_transition_at(&fp, SignalStatus::Lost, None, t0())
        .await
        .unwrap();
    store.release.notify_one();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        GateError::InvalidTransition(e) if e.from == SignalStatus::Lost && e.to == SignalStatus::Won
    ));
    let stored = store.inner.get_by_fingerprint(&fp).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Lost);
    assert_eq!(stored.revenue, None);
}

#[tokio::test]
async fn transition_applies_on_top_of_a_compatible_concurrent_move() {
    let (first, second, store, fp) = two_gates().await;

    store.pause_next_read();
    let pending = {
        let first = Arc::clone(&first);
        let fp = fp.clone();
        tokio::spawn(async move {
            first
                .request_status_transition_at(
                    &fp,
                    SignalStatus::Won,
                    Some(Decimal::new(900, 0)),
                    t0() + Duration::hours(2),
                )
                .await
        })
    };
    store.read_done.notified().await;
    second
        .request_status_transition_at(&fp, SignalStatus::Contacted, None, t0() + Duration::hours(1))
        .await
        .unwrap();
    store.release.notify_one();

    let signal = pending.await.unwrap().unwrap();
    assert_eq!(signal.status, SignalStatus::Won);
    assert_eq!(signal.contacted_at, Some(t0() + Duration::hours(1)));
    assert_eq!(signal.won_at, Some(t0() + Duration::hours(2)));
    assert_eq!(signal.revenue, Some(Decimal::new(900, 0)));
}
