use async_trait::async_trait;
use beacon_core::IntermediateItem;

use super::*;

struct StubAdapter {
    name: &'static str,
    interval: Duration,
}

#[async_trait]
impl PlatformAdapter for StubAdapter {
    fn platform_name(&self) -> &str {
        self.name
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn scan_interval(&self) -> Duration {
        self.interval
    }

    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError> {
        Ok(Vec::new())
    }
}

fn stub(name: &'static str, secs: u64) -> Arc<dyn PlatformAdapter> {
    Arc::new(StubAdapter {
        name,
        interval: Duration::from_secs(secs),
    })
}

fn context(sources: SourcesFile) -> AdapterContext {
    AdapterContext {
        client: Client::new(),
        credentials: Credentials::default(),
        sources,
    }
}

#[test]
fn builtin_registry_discovers_every_shipped_platform() {
    let discovery = Registry::builtin().discover(&context(SourcesFile::default()));
    let mut names: Vec<&str> = discovery
        .adapters
        .iter()
        .map(|a| a.platform_name())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "github",
            "hackernews",
            "producthunt",
            "reddit",
            "stackoverflow",
            "twitter",
            "upwork"
        ]
    );
    assert!(discovery.excluded.is_empty());
}

#[test]
fn missing_credentials_do_not_exclude_adapters() {
    let discovery = Registry::builtin().discover(&context(SourcesFile::default()));
    let reddit = discovery
        .adapters
        .iter()
        .find(|a| a.platform_name() == "reddit")
        .expect("reddit discovered");
    assert!(reddit.requires_auth());
}

#[test]
fn disabled_section_is_excluded_with_reason() {
    let mut sources = SourcesFile::default();
    sources.twitter.enabled = false;
    let discovery = Registry::builtin().discover(&context(sources));
    assert_eq!(discovery.adapters.len(), 6);
    assert_eq!(
        discovery.excluded,
        vec![Exclusion {
            key: "twitter".to_string(),
            reason: ExclusionReason::Disabled,
        }]
    );
}

#[test]
fn invalid_metadata_excludes_only_the_offender() {
    let mut registry = Registry::new();
    registry.register("good", |_| stub("good", 60));
    registry.register("nameless", |_| stub("  ", 60));
    registry.register("eager", |_| stub("eager", 0));
    registry.register("copycat", |_| stub("good", 120));

    let discovery = registry.discover(&context(SourcesFile::default()));

    assert_eq!(discovery.adapters.len(), 1);
    assert_eq!(discovery.adapters[0].platform_name(), "good");
    let reasons: Vec<_> = discovery
        .excluded
        .iter()
        .map(|e| (e.key.as_str(), e.reason.clone()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("nameless", ExclusionReason::MissingPlatformName),
            ("eager", ExclusionReason::MissingScanInterval),
            (
                "copycat",
                ExclusionReason::DuplicatePlatform("good".to_string())
            ),
        ]
    );
}

#[test]
fn builtin_intervals_match_platform_minimums() {
    let discovery = Registry::builtin().discover(&context(SourcesFile::default()));
    let interval = |name: &str| {
        discovery
            .adapters
            .iter()
            .find(|a| a.platform_name() == name)
            .map(|a| a.scan_interval().as_secs())
    };
    assert_eq!(interval("reddit"), Some(300));
    assert_eq!(interval("hackernews"), Some(900));
    assert_eq!(interval("upwork"), Some(600));
    assert_eq!(interval("stackoverflow"), Some(600));
    assert_eq!(interval("twitter"), Some(21_600));
    assert_eq!(interval("producthunt"), Some(1800));
    assert_eq!(interval("github"), Some(600));
}

#[test]
fn keys_follow_registration_order() {
    let registry = Registry::builtin();
    let keys: Vec<&str> = registry.keys().collect();
    assert_eq!(
        keys,
        vec![
            "reddit",
            "hackernews",
            "upwork",
            "stackoverflow",
            "twitter",
            "producthunt",
            "github"
        ]
    );
}
