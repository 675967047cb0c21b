//! Dashboard-boundary commands: the read API and the funnel entry point.

use std::sync::Arc;

use anyhow::Context;
use beacon_core::{AppConfig, Signal, SignalFilter, SignalStatus, SignalStore};
use beacon_db::PgSignalStore;
use beacon_engine::SignalGate;
use rust_decimal::Decimal;

const TITLE_WIDTH: usize = 60;

async fn connect_store(config: &AppConfig) -> anyhow::Result<PgSignalStore> {
    let pool = beacon_db::connect_from_config(config)
        .await
        .context("failed to connect to database")?;
    Ok(PgSignalStore::new(pool))
}

fn short_title(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let mut short: String = title.chars().take(TITLE_WIDTH - 1).collect();
    short.push('…');
    short
}

fn format_signal(signal: &Signal) -> String {
    let budget = signal
        .budget
        .map_or_else(|| "-".to_string(), |b| b.to_string());
    let technologies = signal
        .technologies
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{:>3}  {:<10} {:<13} {:<12} {:<12} {}  {}",
        signal.urgency_score,
        signal.status,
        signal.platform,
        budget,
        if technologies.is_empty() { "-" } else { technologies.as_str() },
        short_title(&signal.title),
        &signal.fingerprint[..signal.fingerprint.len().min(12)],
    )
}

pub(crate) async fn run_signals(config: &AppConfig, filter: &SignalFilter) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let signals = store.list(filter).await?;

    if signals.is_empty() {
        println!("no signals match");
        return Ok(());
    }
    for signal in &signals {
        println!("{}", format_signal(signal));
    }
    Ok(())
}

pub(crate) async fn run_transition(
    config: &AppConfig,
    fingerprint: &str,
    status: SignalStatus,
    revenue: Option<Decimal>,
) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let gate = SignalGate::new(Arc::new(store));
    let signal = gate
        .request_status_transition(fingerprint, status, revenue)
        .await?;

    tracing::info!(
        fingerprint = %signal.fingerprint,
        status = %signal.status,
        "cli: status transition applied"
    );
    println!("{}", format_signal(&signal));
    if let Some(revenue) = signal.revenue {
        println!("revenue: {revenue}");
    }
    Ok(())
}

pub(crate) async fn run_funnel(config: &AppConfig) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let summary = store.funnel_summary().await?;

    for status in SignalStatus::ALL {
        println!("{:<10} {:>6}", status.as_str(), summary.count(status));
    }
    println!("{:<10} {:>6}", "total", summary.total());
    println!("revenue    {}", summary.revenue_total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_titles_are_shortened_on_char_boundaries() {
        let title = "é".repeat(100);
        let short = short_title(&title);
        assert_eq!(short.chars().count(), TITLE_WIDTH);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn short_titles_are_untouched() {
        assert_eq!(short_title("Need help ASAP"), "Need help ASAP");
    }
}
