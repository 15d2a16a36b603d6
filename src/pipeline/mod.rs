//! Batched rule evaluation
//!
//! Rules are queued with [`Depkeeper::rule`] and evaluated together by
//! [`Depkeeper::check_rules`]. One drain resolves the union of every queued
//! pattern once: one project inspection, then one installed-version lookup
//! and one registry fetch per distinct dependency. The unified records are
//! then split back per rule and filtered by each rule's own policy.
//!
//! # Modules
//!
//! - [`record`]: dependency records and outdated projections
//! - [`rule`]: rules and the batching queue

pub mod record;
pub mod rule;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info};

use crate::config::FETCH_TIMEOUT_MS;
use crate::error::EngineError;
use crate::pipeline::record::{Dependency, Outdated};
use crate::pipeline::rule::{Rule, RuleQueue};
use crate::project::patterns::Patterns;
use crate::project::{NodeProject, ProjectInspector};
use crate::version::registries::NpmRegistry;
use crate::version::registry::Registry;
use crate::version::threshold::Policy;

/// Options for [`Depkeeper::new`]
#[derive(Debug, Clone)]
pub struct DepkeeperOptions {
    /// Project root holding `package.json` and `node_modules`
    pub cwd: PathBuf,
    /// Registry used for every package instead of npmrc discovery
    pub registry_url: Option<String>,
    /// Timeout of each registry fetch
    pub timeout: Duration,
}

impl Default for DepkeeperOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            registry_url: None,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }
}

impl DepkeeperOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    pub fn with_registry_url(mut self, registry_url: impl Into<String>) -> Self {
        self.registry_url = Some(registry_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Dependency freshness engine for one project
pub struct Depkeeper {
    inspector: Arc<dyn ProjectInspector>,
    registry: Arc<dyn Registry>,
    queue: RuleQueue,
}

impl Depkeeper {
    pub fn new(options: DepkeeperOptions) -> Self {
        let mut registry = NpmRegistry::new(&options.cwd).with_timeout(options.timeout);
        if let Some(url) = options.registry_url {
            registry = registry.with_registry_url(url);
        }

        Self::with_components(
            Arc::new(NodeProject::new(options.cwd)),
            Arc::new(registry),
        )
    }

    pub fn with_components(
        inspector: Arc<dyn ProjectInspector>,
        registry: Arc<dyn Registry>,
    ) -> Self {
        Self {
            inspector,
            registry,
            queue: RuleQueue::new(),
        }
    }

    /// Queue a rule for the next [`check_rules`](Self::check_rules). No I/O.
    pub fn rule(&self, patterns: impl Into<Patterns>, policy: impl Into<Policy>) -> &Self {
        self.queue.push(Rule::new(patterns, policy));
        self
    }

    /// Evaluate the batch of rules being collected.
    ///
    /// Returns one list of outdated dependencies per rule of the batch, in
    /// enqueue order. Every caller whose rules joined the batch gets the same
    /// result. Rules queued after the drain begins wait for the next call.
    pub async fn check_rules(&self) -> Result<Vec<Vec<Outdated>>, EngineError> {
        let batch = self.queue.batch();
        // Let rules queued in the same scheduling turn join this batch.
        tokio::task::yield_now().await;

        let current = &batch;
        batch
            .result(move || async move {
                let rules = self.queue.drain(current);
                let result = self.evaluate(&rules).await;
                self.queue.finish(current);
                result
            })
            .await
    }

    /// Evaluate one rule immediately, leaving the queue untouched
    pub async fn check(
        &self,
        patterns: impl Into<Patterns>,
        policy: impl Into<Policy>,
    ) -> Result<Vec<Outdated>, EngineError> {
        let rule = Rule::new(patterns, policy);
        rule.policy.validate()?;

        let records = self.resolve(&rule.patterns).await?;
        select_outdated(&rule, &records)
    }

    /// Every declared dependency matching `patterns`, with its local and
    /// remote state
    pub async fn dependencies(
        &self,
        patterns: impl Into<Patterns>,
    ) -> Result<Vec<Dependency>, EngineError> {
        self.resolve(&patterns.into()).await
    }

    async fn evaluate(&self, rules: &[Rule]) -> Result<Vec<Vec<Outdated>>, EngineError> {
        if rules.is_empty() {
            debug!("No rules queued");
            return Ok(Vec::new());
        }

        for rule in rules {
            rule.policy.validate()?;
        }

        let union = Patterns::union(rules.iter().map(|rule| &rule.patterns));
        info!("Evaluating {} rules as one batch", rules.len());

        let records = self.resolve(&union).await?;
        rules
            .iter()
            .map(|rule| select_outdated(rule, &records))
            .collect()
    }

    /// Records for the declared dependencies matching `patterns`, in
    /// declaration order
    async fn resolve(&self, patterns: &Patterns) -> Result<Vec<Dependency>, EngineError> {
        let names = self.inspector.declared_dependencies(patterns).await?;
        info!("Resolving {} dependencies", names.len());

        let futures = names.into_iter().map(|name| async move {
            let Some(version) = self.inspector.installed_version(&name).await else {
                debug!("{} is not installed, skipping registry", name);
                return Dependency::not_installed(name);
            };

            let response = self.registry.get_versions(&name).await;
            debug!(
                "{}: installed {}, latest {:?}, {} versions",
                name,
                version,
                response.latest,
                response.versions.len()
            );
            Dependency::from_response(name, version, response)
        });

        Ok(join_all(futures).await)
    }
}

fn select_outdated(rule: &Rule, records: &[Dependency]) -> Result<Vec<Outdated>, EngineError> {
    let matcher = rule.patterns.compile()?;
    let mut outdated = Vec::new();

    for record in records.iter().filter(|r| matcher.is_match(&r.name)) {
        if let Some(projection) = record.outdated(&rule.policy)? {
            outdated.push(projection);
        }
    }

    Ok(outdated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::MockProjectInspector;
    use crate::version::error::PolicyError;
    use crate::version::registry::MockRegistry;
    use crate::version::threshold::{Strategy, Thresholds};
    use crate::version::types::RegistryResponse;
    use semver::Version;

    fn response(versions: &[&str]) -> RegistryResponse {
        RegistryResponse {
            ok: true,
            status: Some(200),
            status_text: Some("OK".to_string()),
            latest: versions.last().map(|v| v.to_string()),
            versions: versions.iter().map(|v| Version::parse(v).unwrap()).collect(),
        }
    }

    fn outdated(name: &str, version: &str, minimal: Option<&str>, latest: &str) -> Outdated {
        Outdated {
            name: name.to_string(),
            version: version.to_string(),
            minimal: minimal.map(str::to_string),
            latest: Some(latest.to_string()),
        }
    }

    /// Inspector declaring `dep`, `ped` and `edp`, all installed
    fn inspector(times: usize) -> MockProjectInspector {
        let mut inspector = MockProjectInspector::new();
        inspector
            .expect_declared_dependencies()
            .times(times)
            .returning(|patterns| {
                let declared = ["dep", "ped", "edp"].map(str::to_string);
                Ok(patterns.compile()?.select(&declared))
            });
        inspector
            .expect_installed_version()
            .returning(|name| match name {
                "dep" => Some("1.0.0".to_string()),
                "ped" => Some("2.0.0".to_string()),
                "edp" => Some("3.0.0".to_string()),
                _ => None,
            });
        inspector
    }

    fn registry_once_per(names: &[&'static str]) -> MockRegistry {
        let mut registry = MockRegistry::new();
        for &name in names {
            registry
                .expect_get_versions()
                .withf(move |n| n == name)
                .times(1)
                .returning(|name| match name {
                    "dep" => response(&["1.0.0", "1.0.1", "1.0.2"]),
                    "ped" => response(&["2.0.0", "2.0.1"]),
                    _ => response(&["3.0.0", "3.0.1"]),
                });
        }
        registry
    }

    #[tokio::test]
    async fn check_rules_coalesces_queued_rules_into_one_fetch() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(1)),
            Arc::new(registry_once_per(&["dep", "ped"])),
        );

        let result = depkeeper
            .rule("d*", Thresholds::new().with_patch(1))
            .rule("ped", Policy::default())
            .rule("dep", Policy::default())
            .check_rules()
            .await
            .unwrap();

        assert_eq!(
            result,
            vec![
                vec![outdated("dep", "1.0.0", Some("1.0.1"), "1.0.2")],
                vec![outdated("ped", "2.0.0", None, "2.0.1")],
                vec![outdated("dep", "1.0.0", None, "1.0.2")],
            ]
        );
    }

    #[tokio::test]
    async fn check_rules_does_not_replay_drained_rules() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(1)),
            Arc::new(registry_once_per(&["dep"])),
        );

        let first = depkeeper.rule("dep", Policy::default()).check_rules().await.unwrap();
        let second = depkeeper.check_rules().await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn not_installed_dependency_skips_registry() {
        let mut inspector = MockProjectInspector::new();
        inspector
            .expect_declared_dependencies()
            .returning(|_| Ok(vec!["dep".to_string()]));
        inspector.expect_installed_version().returning(|_| None);
        let mut registry = MockRegistry::new();
        registry.expect_get_versions().times(0);

        let depkeeper = Depkeeper::with_components(Arc::new(inspector), Arc::new(registry));

        let records = depkeeper.dependencies(Patterns::all()).await.unwrap();

        assert_eq!(records, vec![Dependency::not_installed("dep")]);
    }

    #[tokio::test]
    async fn unreachable_registry_is_excluded_from_outdated() {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_versions()
            .returning(|name| match name {
                "dep" => RegistryResponse::failed("system: ENOTFOUND"),
                "ped" => response(&["2.0.0", "2.0.1"]),
                _ => response(&["3.0.0"]),
            });

        let depkeeper = Depkeeper::with_components(Arc::new(inspector(1)), Arc::new(registry));

        let result = depkeeper.check("*", Policy::default()).await.unwrap();

        assert_eq!(result, vec![outdated("ped", "2.0.0", None, "2.0.1")]);
    }

    #[tokio::test]
    async fn records_keep_declaration_order() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(1)),
            Arc::new(registry_once_per(&["dep", "ped", "edp"])),
        );

        let records = depkeeper.dependencies(Patterns::all()).await.unwrap();

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["dep", "ped", "edp"]);
    }

    #[tokio::test]
    async fn check_leaves_queue_untouched() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(2)),
            Arc::new({
                let mut registry = MockRegistry::new();
                registry
                    .expect_get_versions()
                    .returning(|_| response(&["1.0.0", "1.0.1", "1.0.2"]));
                registry
            }),
        );
        depkeeper.rule("dep", Thresholds::new().with_patch(1));

        let immediate = depkeeper.check("dep", Policy::default()).await.unwrap();
        let queued = depkeeper.check_rules().await.unwrap();

        assert_eq!(immediate, vec![outdated("dep", "1.0.0", None, "1.0.2")]);
        assert_eq!(
            queued,
            vec![vec![outdated("dep", "1.0.0", Some("1.0.1"), "1.0.2")]]
        );
    }

    fn malformed_policy() -> Policy {
        Policy::new(
            Thresholds::new().with_major(1).with_patch(1),
            Strategy::Numeral,
        )
    }

    #[tokio::test]
    async fn malformed_policy_fails_before_any_io() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(0)),
            Arc::new(registry_once_per(&[])),
        );

        let result = depkeeper
            .rule("dep", Policy::default())
            .rule("dep", malformed_policy())
            .check_rules()
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Policy(PolicyError::TooManyThresholds { count: 2 }))
        ));
        assert!(depkeeper.check_rules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_policy_fails_when_dependency_is_not_installed() {
        let mut inspector = MockProjectInspector::new();
        inspector
            .expect_declared_dependencies()
            .returning(|_| Ok(vec!["dep".to_string()]));
        inspector.expect_installed_version().returning(|_| None);

        let depkeeper =
            Depkeeper::with_components(Arc::new(inspector), Arc::new(MockRegistry::new()));

        let queued = depkeeper.rule("dep", malformed_policy()).check_rules().await;
        let immediate = depkeeper.check("dep", malformed_policy()).await;

        assert!(matches!(queued, Err(EngineError::Policy(_))));
        assert!(matches!(immediate, Err(EngineError::Policy(_))));
    }

    #[tokio::test]
    async fn malformed_policy_fails_when_pattern_matches_nothing() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(0)),
            Arc::new(registry_once_per(&[])),
        );

        let result = depkeeper.check("nomatch", malformed_policy()).await;

        assert!(matches!(
            result,
            Err(EngineError::Policy(PolicyError::TooManyThresholds { count: 2 }))
        ));
    }

    #[tokio::test]
    async fn concurrent_callers_share_the_batch_result() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(1)),
            Arc::new(registry_once_per(&["dep", "ped"])),
        );

        let (first, second) = tokio::join!(
            depkeeper
                .rule("dep", Thresholds::new().with_patch(1))
                .check_rules(),
            depkeeper.rule("ped", Policy::default()).check_rules(),
        );

        let expected = vec![
            vec![outdated("dep", "1.0.0", Some("1.0.1"), "1.0.2")],
            vec![outdated("ped", "2.0.0", None, "2.0.1")],
        ];
        assert_eq!(first.unwrap(), expected);
        assert_eq!(second.unwrap(), expected);
    }

    #[tokio::test]
    async fn rules_queued_after_drain_start_the_next_batch() {
        let depkeeper = Depkeeper::with_components(
            Arc::new(inspector(2)),
            Arc::new({
                let mut registry = MockRegistry::new();
                registry
                    .expect_get_versions()
                    .times(2)
                    .returning(|_| response(&["1.0.0", "1.0.1", "1.0.2"]));
                registry
            }),
        );

        let first = depkeeper.rule("dep", Policy::default()).check_rules().await;
        let second = depkeeper
            .rule("dep", Thresholds::new().with_patch(1))
            .check_rules()
            .await;

        assert_eq!(
            first.unwrap(),
            vec![vec![outdated("dep", "1.0.0", None, "1.0.2")]]
        );
        assert_eq!(
            second.unwrap(),
            vec![vec![outdated("dep", "1.0.0", Some("1.0.1"), "1.0.2")]]
        );
    }
}
