//! Database operations for the `signals` table.

use std::collections::BTreeMap;

use async_trait::async_trait;
use beacon_core::{
    Budget, BudgetCadence, FunnelSummary, PersistenceError, Signal, SignalFilter, SignalStatus,
    SignalStore,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const SIGNAL_COLUMNS: &str = "fingerprint, platform, source_id, title, body, author, url, \
     observed_at, urgency_score, technologies, keywords, budget_amount, budget_cadence, \
     status, first_seen, last_seen, revenue, contacted_at, won_at, delivered_at, closed_at";

/// A row from the `signals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SignalRow {
    pub fingerprint: String,
    pub platform: String,
    pub source_id: Option<String>,
    pub title: String,
    pub body: String,
    pub author: String,
    pub url: String,
    pub observed_at: DateTime<Utc>,
    /// `SMALLINT` with a 0..=100 check constraint.
    pub urgency_score: i16,
    pub technologies: Vec<String>,
    pub keywords: Vec<String>,
    pub budget_amount: Option<Decimal>,
    pub budget_cadence: Option<String>,
    pub status: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub revenue: Option<Decimal>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub won_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = DbError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let urgency_score = u8::try_from(row.urgency_score)
            .map_err(|_| DbError::Decode(format!("urgency_score {}", row.urgency_score)))?;
        let status = row.status.parse::<SignalStatus>().map_err(DbError::Decode)?;
        let budget = match (row.budget_amount, row.budget_cadence.as_deref()) {
            (Some(amount), Some(cadence)) => Some(Budget {
                amount,
                cadence: cadence.parse::<BudgetCadence>().map_err(DbError::Decode)?,
            }),
            (None, None) => None,
            _ => {
                return Err(DbError::Decode(format!(
                    "signal {} has a partial budget",
                    row.fingerprint
                )))
            }
        };

        Ok(Signal {
            fingerprint: row.fingerprint,
            platform: row.platform,
            source_id: row.source_id,
            title: row.title,
            body: row.body,
            author: row.author,
            url: row.url,
            observed_at: row.observed_at,
            urgency_score,
            technologies: row.technologies.into_iter().collect(),
            keywords: row.keywords.into_iter().collect(),
            budget,
            status,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            revenue: row.revenue,
            contacted_at: row.contacted_at,
            won_at: row.won_at,
            delivered_at: row.delivered_at,
            closed_at: row.closed_at,
        })
    }
}

fn budget_columns(signal: &Signal) -> (Option<Decimal>, Option<&'static str>) {
    signal
        .budget
        .map_or((None, None), |b| (Some(b.amount), Some(b.cadence.as_str())))
}

fn string_vec(set: &std::collections::BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

/// Fetch one signal by fingerprint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if
/// the stored row holds a value the domain types reject.
pub async fn get_signal_by_fingerprint(
    pool: &PgPool,
    fingerprint: &str,
) -> Result<Option<Signal>, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(&format!(
        "SELECT {SIGNAL_COLUMNS} FROM signals WHERE fingerprint = $1"
    ))
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    row.map(Signal::try_from).transpose()
}

/// Insert a new signal. A duplicate fingerprint violates the unique
/// constraint and surfaces as [`DbError::Sqlx`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_signal(pool: &PgPool, signal: &Signal) -> Result<(), DbError> {
    let (budget_amount, budget_cadence) = budget_columns(signal);
    sqlx::query(&format!(
        "INSERT INTO signals ({SIGNAL_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
                 $14, $15, $16, $17, $18, $19, $20, $21)"
    ))
    .bind(&signal.fingerprint)
    .bind(&signal.platform)
    .bind(signal.source_id.as_deref())
    .bind(&signal.title)
    .bind(&signal.body)
    .bind(&signal.author)
    .bind(&signal.url)
    .bind(signal.observed_at)
    .bind(i16::from(signal.urgency_score))
    .bind(string_vec(&signal.technologies))
    .bind(string_vec(&signal.keywords))
    .bind(budget_amount)
    .bind(budget_cadence)
    .bind(signal.status.as_str())
    .bind(signal.first_seen)
    .bind(signal.last_seen)
    .bind(signal.revenue)
    .bind(signal.contacted_at)
    .bind(signal.won_at)
    .bind(signal.delivered_at)
    .bind(signal.closed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Merge a re-observation into a `new` or `contacted` row in one statement.
///
/// The score and `last_seen` only rise, technology and keyword arrays are
/// unioned, and the budget is filled only when empty. Status, revenue and the
/// content snapshot are not touched. Returns `false` when no open row matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_observation(pool: &PgPool, signal: &Signal) -> Result<bool, DbError> {
    let (budget_amount, budget_cadence) = budget_columns(signal);
    let result = sqlx::query(
        "UPDATE signals \
         SET urgency_score = GREATEST(urgency_score, $2), \
             technologies = ARRAY(SELECT DISTINCT t FROM unnest(technologies || $3::TEXT[]) AS t ORDER BY t), \
             keywords = ARRAY(SELECT DISTINCT k FROM unnest(keywords || $4::TEXT[]) AS k ORDER BY k), \
             budget_amount = COALESCE(budget_amount, $5), \
             budget_cadence = CASE WHEN budget_amount IS NULL THEN $6 ELSE budget_cadence END, \
             last_seen = GREATEST(last_seen, $7), \
             updated_at = NOW() \
         WHERE fingerprint = $1 AND status IN ('new', 'contacted')",
    )
    .bind(&signal.fingerprint)
    .bind(i16::from(signal.urgency_score))
    .bind(string_vec(&signal.technologies))
    .bind(string_vec(&signal.keywords))
    .bind(budget_amount)
    .bind(budget_cadence)
    .bind(signal.last_seen)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Write status, revenue and status timestamps, guarded by the status the
/// caller read: nothing is written unless the row is still `expected`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_signal_status(
    pool: &PgPool,
    signal: &Signal,
    expected: SignalStatus,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE signals \
         SET status = $2, revenue = $3, contacted_at = $4, won_at = $5, \
             delivered_at = $6, closed_at = $7, updated_at = NOW() \
         WHERE fingerprint = $1 AND status = $8",
    )
    .bind(&signal.fingerprint)
    .bind(signal.status.as_str())
    .bind(signal.revenue)
    .bind(signal.contacted_at)
    .bind(signal.won_at)
    .bind(signal.delivered_at)
    .bind(signal.closed_at)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Dashboard read: newest `last_seen` first, optionally filtered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] for
/// an undecodable row.
pub async fn list_signals(pool: &PgPool, filter: &SignalFilter) -> Result<Vec<Signal>, DbError> {
    let rows = sqlx::query_as::<_, SignalRow>(&format!(
        "SELECT {SIGNAL_COLUMNS} FROM signals \
         WHERE ($1::TEXT IS NULL OR status = $1) \
           AND ($2::TEXT IS NULL OR platform = $2) \
           AND ($3::SMALLINT IS NULL OR urgency_score >= $3) \
         ORDER BY last_seen DESC, id DESC \
         LIMIT $4"
    ))
    .bind(filter.status.map(SignalStatus::as_str))
    .bind(filter.platform.as_deref())
    .bind(filter.min_score.map(i16::from))
    .bind(filter.limit.map(i64::from))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Signal::try_from).collect()
}

/// Per-status counts and the revenue realised on `won`/`delivered` signals.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails, or [`DbError::Decode`] for an
/// unknown status value.
pub async fn funnel_summary(pool: &PgPool) -> Result<FunnelSummary, DbError> {
    let counts = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM signals GROUP BY status",
    )
    .fetch_all(pool)
    .await?;

    let revenue_total = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(revenue), 0) FROM signals WHERE status IN ('won', 'delivered')",
    )
    .fetch_one(pool)
    .await?;

    let mut by_status = BTreeMap::new();
    for (status, count) in counts {
        let status = status.parse::<SignalStatus>().map_err(DbError::Decode)?;
        let count = u64::try_from(count).map_err(|_| DbError::Decode(format!("count {count}")))?;
        by_status.insert(status, count);
    }

    Ok(FunnelSummary {
        counts: by_status,
        revenue_total,
    })
}

/// [`SignalStore`] backed by the `signals` table.
///
/// Each call is a single statement, so every write is all-or-nothing and
/// conditional writes are checked against the row as it is at write time.
#[derive(Debug, Clone)]
pub struct PgSignalStore {
    pool: PgPool,
}

impl PgSignalStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SignalStore for PgSignalStore {
    async fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Signal>, PersistenceError> {
        Ok(get_signal_by_fingerprint(&self.pool, fingerprint).await?)
    }

    async fn insert(&self, signal: &Signal) -> Result<(), PersistenceError> {
        Ok(insert_signal(&self.pool, signal).await?)
    }

    async fn record_observation(&self, signal: &Signal) -> Result<bool, PersistenceError> {
        Ok(record_observation(&self.pool, signal).await?)
    }

    async fn update_status(
        &self,
        signal: &Signal,
        expected: SignalStatus,
    ) -> Result<bool, PersistenceError> {
        Ok(update_signal_status(&self.pool, signal, expected).await?)
    }

    async fn list(&self, filter: &SignalFilter) -> Result<Vec<Signal>, PersistenceError> {
        Ok(list_signals(&self.pool, filter).await?)
    }

    async fn funnel_summary(&self) -> Result<FunnelSummary, PersistenceError> {
        Ok(funnel_summary(&self.pool).await?)
    }
}
