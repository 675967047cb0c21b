use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a signal in the manual sales funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    New,
    Contacted,
    Won,
    Lost,
    Delivered,
}

impl SignalStatus {
    pub const ALL: [SignalStatus; 5] = [
        SignalStatus::New,
        SignalStatus::Contacted,
        SignalStatus::Won,
        SignalStatus::Lost,
        SignalStatus::Delivered,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalStatus::New => "new",
            SignalStatus::Contacted => "contacted",
            SignalStatus::Won => "won",
            SignalStatus::Lost => "lost",
            SignalStatus::Delivered => "delivered",
        }
    }

    /// Terminal statuses receive no further automatic mutation from polling.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SignalStatus::Won | SignalStatus::Lost | SignalStatus::Delivered
        )
    }

    /// Whether realised revenue may be recorded alongside this status.
    #[must_use]
    pub fn accepts_revenue(self) -> bool {
        matches!(self, SignalStatus::Won | SignalStatus::Delivered)
    }

    #[must_use]
    pub fn can_transition_to(self, next: SignalStatus) -> bool {
        use SignalStatus::{Contacted, Delivered, Lost, New, Won};
        matches!(
            (self, next),
            (New, Contacted | Won | Lost) | (Contacted, Won | Lost) | (Won, Delivered)
        )
    }

    /// Validate a funnel move.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] when `next` is not reachable from `self`.
    pub fn transition(self, next: SignalStatus) -> Result<SignalStatus, InvalidTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(SignalStatus::New),
            "contacted" => Ok(SignalStatus::Contacted),
            "won" => Ok(SignalStatus::Won),
            "lost" => Ok(SignalStatus::Lost),
            "delivered" => Ok(SignalStatus::Delivered),
            other => Err(format!("unknown signal status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransitionError {
    pub from: SignalStatus,
    pub to: SignalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCadence {
    Fixed,
    Hourly,
}

impl BudgetCadence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetCadence::Fixed => "fixed",
            BudgetCadence::Hourly => "hourly",
        }
    }
}

impl FromStr for BudgetCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(BudgetCadence::Fixed),
            "hourly" => Ok(BudgetCadence::Hourly),
            other => Err(format!("unknown budget cadence '{other}'")),
        }
    }
}

/// A currency amount mentioned in the item text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub amount: Decimal,
    pub cadence: BudgetCadence,
}

impl Budget {
    #[must_use]
    pub fn fixed(amount: Decimal) -> Self {
        Self {
            amount,
            cadence: BudgetCadence::Fixed,
        }
    }

    #[must_use]
    pub fn hourly(amount: Decimal) -> Self {
        Self {
            amount,
            cadence: BudgetCadence::Hourly,
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cadence {
            BudgetCadence::Fixed => write!(f, "${}", self.amount),
            BudgetCadence::Hourly => write!(f, "${}/hr", self.amount),
        }
    }
}

/// Durable, deduplicated record of a detected opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique key; see the gate's fingerprint derivation.
    pub fingerprint: String,
    pub platform: String,
    pub source_id: Option<String>,
    pub title: String,
    pub body: String,
    pub author: String,
    pub url: String,
    /// Timestamp reported by the platform on first observation.
    pub observed_at: DateTime<Utc>,
    /// 0..=100. Only ever increases after creation.
    pub urgency_score: u8,
    pub technologies: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    pub budget: Option<Budget>,
    pub status: SignalStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub revenue: Option<Decimal>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub won_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Fold a later observation of the same item into this record.
    ///
    /// `last_seen` and the urgency score only move up, technologies and
    /// keywords are unioned, and a budget is taken only when none is stored.
    /// Status, revenue and the content snapshot are left alone.
    pub fn absorb_observation(&mut self, observed: &Signal) {
        self.last_seen = self.last_seen.max(observed.last_seen);
        self.urgency_score = self.urgency_score.max(observed.urgency_score);
        self.technologies
            .extend(observed.technologies.iter().cloned());
        self.keywords.extend(observed.keywords.iter().cloned());
        if self.budget.is_none() {
            self.budget = observed.budget;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_can_move_to_contacted_won_or_lost() {
        assert!(SignalStatus::New.can_transition_to(SignalStatus::Contacted));
        assert!(SignalStatus::New.can_transition_to(SignalStatus::Won));
        assert!(SignalStatus::New.can_transition_to(SignalStatus::Lost));
    }

    #[test]
    fn new_cannot_skip_to_delivered() {
        let err = SignalStatus::New
            .transition(SignalStatus::Delivered)
            .unwrap_err();
        assert_eq!(err.from, SignalStatus::New);
        assert_eq!(err.to, SignalStatus::Delivered);
    }

    #[test]
    fn won_only_moves_to_delivered() {
        assert!(SignalStatus::Won.can_transition_to(SignalStatus::Delivered));
        assert!(!SignalStatus::Won.can_transition_to(SignalStatus::Lost));
        assert!(!SignalStatus::Won.can_transition_to(SignalStatus::Contacted));
    }

    #[test]
    fn lost_and_delivered_are_dead_ends() {
        for next in SignalStatus::ALL {
            assert!(!SignalStatus::Lost.can_transition_to(next));
            assert!(!SignalStatus::Delivered.can_transition_to(next));
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in SignalStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in SignalStatus::ALL {
            assert_eq!(status.as_str().parse::<SignalStatus>(), Ok(status));
        }
        assert!("archived".parse::<SignalStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SignalStatus::New.is_terminal());
        assert!(!SignalStatus::Contacted.is_terminal());
        assert!(SignalStatus::Won.is_terminal());
        assert!(SignalStatus::Lost.is_terminal());
        assert!(SignalStatus::Delivered.is_terminal());
    }

    #[test]
    fn budget_display_marks_hourly_rates() {
        assert_eq!(Budget::fixed(Decimal::new(500, 0)).to_string(), "$500");
        assert_eq!(Budget::hourly(Decimal::new(45, 0)).to_string(), "$45/hr");
    }

    fn observed(score: u8, seen: DateTime<Utc>, tech: &str) -> Signal {
        Signal {
            fingerprint: "fp".to_string(),
            platform: "reddit".to_string(),
            source_id: None,
            title: "Need help".to_string(),
            body: String::new(),
            author: "poster".to_string(),
            url: "https://example.com/fp".to_string(),
            observed_at: seen,
            urgency_score: score,
            technologies: BTreeSet::from([tech.to_string()]),
            keywords: BTreeSet::new(),
            budget: None,
            status: SignalStatus::New,
            first_seen: seen,
            last_seen: seen,
            revenue: None,
            contacted_at: None,
            won_at: None,
            delivered_at: None,
            closed_at: None,
        }
    }

    #[test]
    fn absorb_observation_merges_without_touching_status() {
        let earlier = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_700_003_600, 0).unwrap();
        let mut stored = observed(40, later, "react");
        stored.status = SignalStatus::Contacted;
        stored.contacted_at = Some(later);

        let mut stale = observed(25, earlier, "python");
        stale.budget = Some(Budget::fixed(Decimal::new(300, 0)));
        stored.absorb_observation(&stale);

        assert_eq!(stored.urgency_score, 40);
        assert_eq!(stored.last_seen, later);
        assert_eq!(
            stored.technologies,
            BTreeSet::from(["python".to_string(), "react".to_string()])
        );
        assert_eq!(stored.budget, Some(Budget::fixed(Decimal::new(300, 0))));
        assert_eq!(stored.status, SignalStatus::Contacted);
        assert_eq!(stored.contacted_at, Some(later));
    }
}
