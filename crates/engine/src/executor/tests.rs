use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Result, anyhow};
use pipecheck_types::{CaseFailure, CaseScope, Definition, Environment, ProcessorTargets};
use serde_json::json;

use super::*;
use crate::provider::{CachedProvider, ProcessorResolver, ProcessorsProvider, ProviderError, ResolvedProcessors};

const BROKEN_TARGET: &str = "broken";

#[derive(Debug, Clone)]
enum Behaviour {
    Report(Vec<&'static str>),
    Fatal(&'static str),
    Panic,
}

#[derive(Debug, Clone)]
struct MarkerCase {
    id: usize,
    targets: ProcessorTargets,
    environment: Environment,
    delay: Duration,
    behaviour: Behaviour,
}

impl MarkerCase {
    fn reporting(id: usize, markers: &[&'static str]) -> Self {
        Self {
            id,
            targets: ProcessorTargets::from_iter([format!("/pipeline/processors/{}", id % 2)]),
            environment: Environment::default(),
            delay: Duration::ZERO,
            behaviour: Behaviour::Report(markers.to_vec()),
        }
    }

    fn fatal(id: usize, message: &'static str) -> Self {
        Self {
            behaviour: Behaviour::Fatal(message),
            ..Self::reporting(id, &[])
        }
    }

    fn panicking(id: usize) -> Self {
        Self {
            behaviour: Behaviour::Panic,
            ..Self::reporting(id, &[])
        }
    }

    fn targeting(mut self, target: &str) -> Self {
        self.targets = ProcessorTargets::from_iter([target]);
        self
    }

    fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

impl CaseScope for MarkerCase {
    fn target_processors(&self) -> &ProcessorTargets {
        &self.targets
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }
}

#[derive(Default)]
struct RecordingRunner {
    executed: Mutex<Vec<usize>>,
}

impl RecordingRunner {
    fn executed(&self) -> Vec<usize> {
        self.executed.lock().unwrap().clone()
    }
}

impl CaseRunner<MarkerCase> for RecordingRunner {
    fn run(&self, case: &MarkerCase, provider: &dyn ProcessorsProvider) -> Result<Vec<CaseFailure>> {
        self.executed.lock().unwrap().push(case.id);
        provider.resolve(&case.targets, &case.environment)?;
        thread::sleep(case.delay);
        match &case.behaviour {
            Behaviour::Report(markers) => Ok(markers
                .iter()
                .map(|marker| CaseFailure::new(format!("case {}", case.id), *marker))
                .collect()),
            Behaviour::Fatal(message) => Err(anyhow!(*message)),
            Behaviour::Panic => panic!("evaluator exploded"),
        }
    }
}

struct InMemoryResolver {
    calls: AtomicUsize,
}

impl ProcessorResolver for InMemoryResolver {
    fn resolve_uncached(&self, targets: &ProcessorTargets, _environment: &Environment) -> Result<ResolvedProcessors, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if targets.iter().any(|target| target == BROKEN_TARGET) {
            return Err(ProviderError::TargetNotFound {
                target: BROKEN_TARGET.to_string(),
                path: "memory".to_string(),
            });
        }
        Ok(ResolvedProcessors::new(vec![json!({ "mapping": targets.to_string() })]))
    }
}

struct SharedFactory {
    provider: Arc<CachedProvider<InMemoryResolver>>,
}

impl ProvidersFactory for SharedFactory {
    fn create(&self, _target: &Path) -> Result<Arc<dyn ProcessorsProvider>, ProviderError> {
        Ok(self.provider.clone())
    }
}

struct FailingFactory;

impl ProvidersFactory for FailingFactory {
    fn create(&self, target: &Path) -> Result<Arc<dyn ProcessorsProvider>, ProviderError> {
        Err(ProviderError::TargetNotFound {
            target: "config".to_string(),
            path: target.display().to_string(),
        })
    }
}

struct Harness {
    provider: Arc<CachedProvider<InMemoryResolver>>,
    runner: Arc<RecordingRunner>,
    executor: DefinitionExecutor<MarkerCase>,
}

impl Harness {
    fn new() -> Self {
        let provider = Arc::new(CachedProvider::new(InMemoryResolver {
            calls: AtomicUsize::new(0),
        }));
        let runner = Arc::new(RecordingRunner::default());
        let factory = Arc::new(SharedFactory {
            provider: Arc::clone(&provider),
        });
        let executor = DefinitionExecutor::new(factory, runner.clone());
        Self {
            provider,
            runner,
            executor,
        }
    }

    async fn run(&self, parallel: bool, cases: Vec<MarkerCase>) -> Result<Vec<CaseFailure>, ExecutionError> {
        let definition = Definition::new(parallel, cases);
        self.executor.execute(&definition, Path::new("config.yaml")).await
    }

    fn resolver_calls(&self) -> usize {
        self.provider.resolver().calls.load(Ordering::SeqCst)
    }
}

fn reasons(failures: &[CaseFailure]) -> Vec<&str> {
    failures.iter().map(|failure| failure.reason.as_str()).collect()
}

#[tokio::test]
async fn parallel_and_sequential_agree_on_order_despite_completion_skew() {
    // Earlier cases sleep longer so they finish last in parallel mode.
    let cases: Vec<MarkerCase> = (0..6)
        .map(|id| MarkerCase::reporting(id, &[["m0", "m1", "m2", "m3", "m4", "m5"][id]]).delayed((6 - id as u64) * 15))
        .collect();

    let parallel = Harness::new().run(true, cases.clone()).await.unwrap();
    let sequential = Harness::new().run(false, cases).await.unwrap();

    assert_eq!(reasons(&parallel), vec!["m0", "m1", "m2", "m3", "m4", "m5"]);
    assert_eq!(parallel, sequential);
}

#[tokio::test]
async fn failures_within_a_case_keep_their_order() {
    let cases = vec![MarkerCase::reporting(0, &["x", "y", "z"]), MarkerCase::reporting(1, &["w"])];

    let failures = Harness::new().run(true, cases).await.unwrap();

    assert_eq!(reasons(&failures), vec!["x", "y", "z", "w"]);
    assert_eq!(failures[3].case, "case 1");
}

#[tokio::test]
async fn sequential_fatal_error_stops_later_cases() {
    let harness = Harness::new();
    let cases = vec![
        MarkerCase::reporting(0, &["A"]),
        MarkerCase::fatal(1, "pipeline crashed"),
        MarkerCase::reporting(2, &["C"]),
        MarkerCase::reporting(3, &["D"]),
    ];

    let error = harness.run(false, cases).await.unwrap_err();

    assert!(matches!(error, ExecutionError::CaseFatal { index: 1, .. }));
    assert_eq!(error.to_string(), "test case 1 failed: pipeline crashed");
    assert_eq!(harness.runner.executed(), vec![0, 1]);
}

#[tokio::test]
async fn parallel_fatal_error_is_attributed_and_drops_results() {
    let harness = Harness::new();
    let cases = vec![
        MarkerCase::reporting(0, &["A"]),
        MarkerCase::reporting(1, &["B"]).delayed(20),
        MarkerCase::fatal(2, "malformed target"),
    ];

    let error = harness.run(true, cases).await.unwrap_err();

    assert_eq!(error.index(), Some(2));
    assert!(error.to_string().contains("malformed target"));
}

#[tokio::test]
async fn parallel_multiple_fatal_errors_report_one_of_them() {
    let cases = vec![
        MarkerCase::fatal(0, "first"),
        MarkerCase::reporting(1, &["B"]),
        MarkerCase::fatal(2, "second"),
    ];

    let error = Harness::new().run(true, cases).await.unwrap_err();

    assert!(matches!(error, ExecutionError::CaseFatal { .. }));
    assert!(matches!(error.index(), Some(0) | Some(2)));
}

#[tokio::test]
async fn launched_tasks_are_drained_before_returning() {
    let harness = Harness::new();
    let cases = vec![MarkerCase::reporting(0, &["slow"]).delayed(50), MarkerCase::fatal(1, "boom").delayed(5)];

    let error = harness.run(true, cases).await.unwrap_err();

    assert_eq!(error.index(), Some(1));
    let mut executed = harness.runner.executed();
    executed.sort_unstable();
    assert_eq!(executed, vec![0, 1]);
}

#[tokio::test]
async fn empty_suite_passes_in_both_modes() {
    for parallel in [true, false] {
        let harness = Harness::new();
        let failures = harness.run(parallel, Vec::new()).await.unwrap();
        assert!(failures.is_empty());
        assert!(harness.runner.executed().is_empty());
    }
}

#[tokio::test]
async fn warm_up_failure_runs_no_cases() {
    let harness = Harness::new();
    let cases = vec![
        MarkerCase::reporting(0, &["A"]),
        MarkerCase::reporting(1, &[]).targeting(BROKEN_TARGET),
        MarkerCase::reporting(2, &["C"]),
    ];

    let error = harness.run(true, cases).await.unwrap_err();

    assert!(matches!(
        error,
        ExecutionError::CacheResolution {
            index: 1,
            source: ProviderError::TargetNotFound { .. }
        }
    ));
    assert!(harness.runner.executed().is_empty());
    // Warm-up stops at the failing case.
    assert_eq!(harness.resolver_calls(), 2);
}

#[tokio::test]
async fn sequential_mode_skips_warm_up() {
    let harness = Harness::new();
    let cases = vec![
        MarkerCase::reporting(0, &["A"]),
        MarkerCase::reporting(1, &[]).targeting(BROKEN_TARGET),
    ];

    let error = harness.run(false, cases).await.unwrap_err();

    // Resolution happens inside the case, so the error is the case's own.
    assert!(matches!(error, ExecutionError::CaseFatal { index: 1, .. }));
    assert_eq!(harness.runner.executed(), vec![0, 1]);
}

#[tokio::test]
async fn parallel_cases_only_read_the_warmed_cache() {
    let harness = Harness::new();
    // Four cases share two distinct keys.
    let cases: Vec<MarkerCase> = (0..4).map(|id| MarkerCase::reporting(id, &[])).collect();

    harness.run(true, cases).await.unwrap();

    let stats = harness.provider.stats();
    assert_eq!(stats.resolutions, 2);
    assert_eq!(harness.resolver_calls(), 2);
    // Two warm-up hits plus one hit per case during fan-out.
    assert_eq!(stats.hits, 6);
}

#[tokio::test]
async fn modes_agree_on_three_case_scenario() {
    let cases = vec![
        MarkerCase::reporting(0, &["A"]),
        MarkerCase::reporting(1, &[]),
        MarkerCase::reporting(2, &["C"]),
    ];

    for parallel in [false, true] {
        let failures = Harness::new().run(parallel, cases.clone()).await.unwrap();
        assert_eq!(reasons(&failures), vec!["A", "C"], "parallel = {parallel}");
    }
}

#[tokio::test]
async fn panicking_case_is_reported_as_aborted() {
    for parallel in [false, true] {
        let cases = vec![MarkerCase::reporting(0, &["A"]), MarkerCase::panicking(1)];

        let error = Harness::new().run(parallel, cases).await.unwrap_err();

        match error {
            ExecutionError::CaseAborted { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("evaluator exploded"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn parallel_override_forces_sequential_execution() {
    let harness = Harness::new();
    let executor = DefinitionExecutor::new(
        Arc::new(SharedFactory {
            provider: Arc::clone(&harness.provider),
        }),
        harness.runner.clone(),
    )
    .parallel_override(Some(false));
    let definition = Definition::new(true, vec![MarkerCase::reporting(0, &[]).targeting(BROKEN_TARGET)]);

    assert_eq!(executor.mode_for(&definition), ExecutionMode::Sequential);
    let error = executor.execute(&definition, Path::new("config.yaml")).await.unwrap_err();
    assert!(matches!(error, ExecutionError::CaseFatal { index: 0, .. }));
}

#[tokio::test]
async fn provider_setup_failure_is_not_attributed_to_a_case() {
    let runner = Arc::new(RecordingRunner::default());
    let executor = DefinitionExecutor::new(Arc::new(FailingFactory), runner.clone());
    let definition = Definition::new(true, vec![MarkerCase::reporting(0, &["A"])]);

    let error = executor.execute(&definition, Path::new("missing.yaml")).await.unwrap_err();

    assert!(matches!(error, ExecutionError::ProviderSetup(_)));
    assert_eq!(error.index(), None);
    assert!(runner.executed().is_empty());
}

#[tokio::test]
async fn missing_target_config_is_attributed_to_the_first_case() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("absent.yaml");

    for parallel in [true, false] {
        let runner = Arc::new(RecordingRunner::default());
        let executor: DefinitionExecutor<MarkerCase> = DefinitionExecutor::with_target_configs(runner.clone());

        let empty = Definition::new(parallel, Vec::<MarkerCase>::new());
        assert!(executor.execute(&empty, &missing).await.unwrap().is_empty(), "parallel = {parallel}");

        let definition = Definition::new(parallel, vec![MarkerCase::reporting(0, &["A"]), MarkerCase::reporting(1, &["B"])]);
        let error = executor.execute(&definition, &missing).await.unwrap_err();
        assert_eq!(error.index(), Some(0), "parallel = {parallel}");
        if parallel {
            assert!(matches!(
                error,
                ExecutionError::CacheResolution {
                    source: ProviderError::Io { .. },
                    ..
                }
            ));
            assert!(runner.executed().is_empty());
        } else {
            assert!(matches!(error, ExecutionError::CaseFatal { .. }));
            assert_eq!(runner.executed(), vec![0]);
        }
    }
}

#[tokio::test]
async fn resolve_only_runner_passes_resolvable_cases() {
    let harness = Harness::new();
    let executor: DefinitionExecutor<MarkerCase> = DefinitionExecutor::new(
        Arc::new(SharedFactory {
            provider: Arc::clone(&harness.provider),
        }),
        Arc::new(ResolveOnlyRunner),
    );
    let definition = Definition::new(true, vec![MarkerCase::reporting(0, &["ignored"]), MarkerCase::reporting(1, &[])]);

    let failures = executor.execute(&definition, Path::new("config.yaml")).await.unwrap();

    assert!(failures.is_empty());
    assert_eq!(Verdict::from_failures(failures), Verdict::Passed);
}

#[test]
fn verdict_distinguishes_pass_and_fail() {
    assert!(Verdict::from_failures(Vec::new()).is_passed());
    let failed = Verdict::from_failures(vec![CaseFailure::new("a", "b")]);
    assert!(!failed.is_passed());
    assert_eq!(failed.failures().len(), 1);
}
