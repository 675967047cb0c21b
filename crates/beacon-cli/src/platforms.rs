use anyhow::Context;
use beacon_core::{load_sources, AppConfig};
use beacon_db::PlatformStatusRow;
use beacon_sources::{AdapterContext, Discovery, Registry};

/// Load the sources file and run discovery against the built-in registry.
pub(crate) fn discover(config: &AppConfig) -> anyhow::Result<Discovery> {
    let sources = load_sources(&config.sources_path)?;
    let ctx = AdapterContext::from_config(config, sources)?;
    Ok(Registry::builtin().discover(&ctx))
}

pub(crate) async fn run_platforms(config: &AppConfig) -> anyhow::Result<()> {
    let discovery = discover(config)?;

    println!(
        "{:<16} {:>10} {:>6} {:<8}",
        "PLATFORM", "INTERVAL", "AUTH", "COLOR"
    );
    for adapter in &discovery.adapters {
        println!(
            "{:<16} {:>9}s {:>6} {:<8}",
            adapter.platform_name(),
            adapter.scan_interval().as_secs(),
            if adapter.requires_auth() { "yes" } else { "no" },
            adapter.display_color(),
        );
    }

    if !discovery.excluded.is_empty() {
        println!();
        println!("excluded:");
        for exclusion in &discovery.excluded {
            println!("  {:<14} {}", exclusion.key, exclusion.reason);
        }
    }

    println!();
    if config.database_url.is_none() {
        println!("health: DATABASE_URL not set, no recorded status");
        return Ok(());
    }
    // Best effort: a database error is printed, not returned.
    match load_health(config).await {
        Ok(rows) => {
            println!("health:");
            for adapter in &discovery.adapters {
                let row = rows.iter().find(|r| r.platform == adapter.platform_name());
                println!("  {}", format_health(adapter.platform_name(), row));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "platforms: could not read platform status");
            println!("health: unavailable ({e:#})");
        }
    }

    Ok(())
}

async fn load_health(config: &AppConfig) -> anyhow::Result<Vec<PlatformStatusRow>> {
    let pool = beacon_db::connect_from_config(config)
        .await
        .context("failed to connect to database")?;
    beacon_db::ping(&pool)
        .await
        .context("database did not answer")?;
    Ok(beacon_db::list_platform_status(&pool).await?)
}

fn format_health(platform: &str, row: Option<&PlatformStatusRow>) -> String {
    let Some(row) = row else {
        return format!("{platform:<14} not yet recorded");
    };
    let last_success = row.last_success_at.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    let mut line = format!(
        "{platform:<14} {:<9} failures={:<3} last_success={last_success}",
        row.health, row.consecutive_failures
    );
    if let Some(error) = &row.last_error {
        line.push_str(&format!(" last_error={error}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn row(health: &str, failures: i32, last_error: Option<&str>) -> PlatformStatusRow {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        PlatformStatusRow {
            platform: "reddit".to_string(),
            health: health.to_string(),
            consecutive_failures: failures,
            last_success_at: Some(at),
            next_allowed_at: Some(at),
            last_error: last_error.map(str::to_string),
            updated_at: at,
        }
    }

    #[test]
    fn healthy_row_shows_last_success() {
        let line = format_health("reddit", Some(&row("healthy", 0, None)));
        assert!(line.starts_with("reddit"));
        assert!(line.contains("healthy"));
        assert!(line.contains("failures=0"));
        assert!(line.contains("last_success=2026-10-19 09:30 UTC"));
        assert!(!line.contains("last_error"));
    }

    #[test]
    fn degraded_row_includes_last_error() {
        let line = format_health("reddit", Some(&row("degraded", 4, Some("HTTP 503"))));
        assert!(line.contains("degraded"));
        assert!(line.contains("failures=4"));
        assert!(line.ends_with("last_error=HTTP 503"));
    }

    #[test]
    fn missing_row_is_reported() {
        assert_eq!(
            format_health("github", None),
            format!("{:<14} not yet recorded", "github")
        );
    }
}
