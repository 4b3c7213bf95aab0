//! End-to-end orchestration tests against stub collaborators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;

use kiln_orchestrator::{
    JobId, JobProgress, JobRequest, JobResult, JobState, Orchestrator, OrchestratorConfig,
    ProgressObserver, RegenerationClient, RegenerationRequest,
};
use kiln_sandbox::{
    CompilerRuntime, FileType, Invocation, LibraryCache, LibraryFetcher, RuntimeFactory,
    RuntimeFault, RuntimeOutput, SandboxConfig, SandboxEngine,
};
use kiln_script::Script;

/// Runtime that always succeeds and writes a small artifact
struct WritingRuntime {
    invocations: Arc<AtomicUsize>,
}

impl CompilerRuntime for WritingRuntime {
    fn invoke(&self, invocation: &Invocation) -> Result<RuntimeOutput, RuntimeFault> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        std::fs::write(&invocation.output_path, b"artifact-bytes").unwrap();
        Ok(RuntimeOutput {
            exit_code: 0,
            stdout: "render complete".to_string(),
            stderr: String::new(),
        })
    }
}

struct CountingFactory {
    created: Arc<AtomicUsize>,
    invocations: Arc<AtomicUsize>,
}

impl CountingFactory {
    fn new() -> Self {
        Self {
            created: Arc::new(AtomicUsize::new(0)),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RuntimeFactory for CountingFactory {
    fn create(&self) -> Result<Box<dyn CompilerRuntime>, RuntimeFault> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(WritingRuntime {
            invocations: Arc::clone(&self.invocations),
        }))
    }
}

/// No script in these tests references a library.
struct NoFetch;

#[async_trait::async_trait]
impl LibraryFetcher for NoFetch {
    async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("unexpected library fetch: {name}")
    }
}

/// Regeneration stub driven by a fixed list of responses
struct ScriptedRegen {
    responses: Mutex<Vec<Option<Script>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RegenerationRequest>>,
}

impl ScriptedRegen {
    fn new(responses: Vec<Option<Script>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always returns the same response, forever
    fn repeating(response: Option<Script>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(vec![response]),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl RegenerationClient for ScriptedRegen {
    async fn regenerate(&self, request: RegenerationRequest) -> anyhow::Result<Option<Script>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        let mut responses = self.responses.lock();
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            Ok(responses.first().cloned().flatten())
        }
    }
}

#[derive(Default)]
struct CollectingObserver {
    events: Mutex<Vec<(JobId, JobProgress)>>,
}

impl ProgressObserver for CollectingObserver {
    fn on_progress(&self, job_id: JobId, progress: &JobProgress) {
        self.events.lock().push((job_id, progress.clone()));
    }
}

fn engine_with(factory: Arc<CountingFactory>) -> SandboxEngine {
    // Subscriber init is best-effort; later tests reuse the first one.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let config = SandboxConfig::default().with_compile_timeout(Duration::from_secs(5));
    SandboxEngine::new(config, factory, LibraryCache::new(Arc::new(NoFetch)))
}

fn invalid_script() -> Script {
    Script::new("scale([1, 1, a/b]) cube(1);")
}

#[tokio::test]
async fn always_invalid_regeneration_terminates_in_exactly_max_attempts() {
    let factory = Arc::new(CountingFactory::new());
    let invocations = Arc::clone(&factory.invocations);
    let regen = ScriptedRegen::repeating(Some(invalid_script()));
    let observer = Arc::new(CollectingObserver::default());

    let orchestrator = Orchestrator::new(
        engine_with(Arc::clone(&factory)),
        Arc::clone(&regen) as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    )
    .with_observer(Arc::clone(&observer) as Arc<dyn ProgressObserver>);

    let request = JobRequest::new(invalid_script(), FileType::Stl, "a simple box");
    let (_, result) = orchestrator.submit(request).await;

    assert!(matches!(result, JobResult::TemplateFallback { .. }));

    // Three validate cycles, a regeneration after the first two only.
    let events = observer.events.lock();
    let validate_cycles = events
        .iter()
        .filter(|(_, p)| p.state == JobState::Validating)
        .count();
    assert_eq!(validate_cycles, 3);
    assert_eq!(regen.calls.load(Ordering::SeqCst), 2);

    // The failing script never reached the sandbox; only the template did.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn declined_regeneration_counts_as_an_attempt() {
    let factory = Arc::new(CountingFactory::new());
    let regen = ScriptedRegen::repeating(None);

    let orchestrator = Orchestrator::new(
        engine_with(Arc::clone(&factory)),
        Arc::clone(&regen) as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    );

    let request = JobRequest::new(invalid_script(), FileType::Stl, "a cylinder");
    let (_, result) = orchestrator.submit(request).await;

    assert!(matches!(result, JobResult::TemplateFallback { .. }));
    // One validate cycle plus two declined regenerations = budget of three.
    assert_eq!(regen.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn division_in_scale_is_fixed_by_regeneration_then_compiles() {
    let factory = Arc::new(CountingFactory::new());
    let invocations = Arc::clone(&factory.invocations);

    let submitted = Script::new(
        "radius = 10;\nheight = 40;\nscale([1,1,height/radius]) sphere(r=radius);",
    );
    let fixed = Script::new("radius = 10;\nscale([1,1,1.2]) sphere(r=radius);");
    let regen = ScriptedRegen::new(vec![Some(fixed), None]);

    let orchestrator = Orchestrator::new(
        engine_with(Arc::clone(&factory)),
        Arc::clone(&regen) as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    );

    let request = JobRequest::new(submitted.clone(), FileType::Stl, "a squashed sphere");
    let (_, result) = orchestrator.submit(request).await;

    match result {
        JobResult::Success { artifact, log } => {
            assert_eq!(artifact, b"artifact-bytes");
            assert!(log.contains("render complete"));
        }
        other => panic!("expected success, got {other:?}"),
    }

    // The invalid script was rejected before any compile; only the fixed
    // script was compiled, in a fresh instance.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(regen.calls.load(Ordering::SeqCst), 1);

    // The regeneration request carried the original script and a
    // scale-ratio diagnostic.
    let requests = regen.requests.lock();
    assert_eq!(requests[0].original_script, submitted);
    assert!(requests[0].error_message.contains("scale-ratio"));
}

#[tokio::test]
async fn regeneration_always_receives_the_original_script() {
    let factory = Arc::new(CountingFactory::new());

    let original = invalid_script();
    // Each "fix" is itself invalid, so every request should still carry the
    // original, not the prior fix.
    let regen = ScriptedRegen::repeating(Some(Script::new("scale([1, 1, x/y]) cube(2);")));

    let orchestrator = Orchestrator::new(
        engine_with(Arc::clone(&factory)),
        Arc::clone(&regen) as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    );

    let request = JobRequest::new(original.clone(), FileType::Stl, "a bracket");
    orchestrator.submit(request).await;

    let requests = regen.requests.lock();
    assert_eq!(requests.len(), 2);
    for request in requests.iter() {
        assert_eq!(request.original_script, original);
    }
}

#[tokio::test]
async fn progress_resets_at_each_attempt_and_finishes_at_100() {
    let factory = Arc::new(CountingFactory::new());
    let regen = ScriptedRegen::new(vec![
        Some(Script::new("sphere(r=5);")),
        None,
    ]);
    let observer = Arc::new(CollectingObserver::default());

    let orchestrator = Orchestrator::new(
        engine_with(Arc::clone(&factory)),
        Arc::clone(&regen) as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    )
    .with_observer(Arc::clone(&observer) as Arc<dyn ProgressObserver>);

    let request = JobRequest::new(invalid_script(), FileType::Stl, "a sphere");
    let (id, result) = orchestrator.submit(request).await;
    assert!(matches!(result, JobResult::Success { .. }));

    let events = observer.events.lock();
    assert!(events.iter().all(|(event_id, _)| *event_id == id));

    // Two attempts, each starting from zero: progress is not monotonic.
    let zeroes = events
        .iter()
        .filter(|(_, p)| p.state == JobState::Validating && p.percent == 0)
        .count();
    assert_eq!(zeroes, 2);

    let (_, last) = events.last().unwrap();
    assert_eq!(last.state, JobState::Succeeded);
    assert_eq!(last.percent, 100);
}

#[tokio::test]
async fn bound_parameters_reach_the_compiler_for_the_submitted_script() {
    struct DefineAsserting {
        invocations: Arc<AtomicUsize>,
    }

    impl CompilerRuntime for DefineAsserting {
        fn invoke(&self, invocation: &Invocation) -> Result<RuntimeOutput, RuntimeFault> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            assert_eq!(invocation.defines, vec![("radius".to_string(), 12.0)]);
            std::fs::write(&invocation.output_path, b"ok").unwrap();
            Ok(RuntimeOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    struct Factory {
        invocations: Arc<AtomicUsize>,
    }

    impl RuntimeFactory for Factory {
        fn create(&self) -> Result<Box<dyn CompilerRuntime>, RuntimeFault> {
            Ok(Box::new(DefineAsserting {
                invocations: Arc::clone(&self.invocations),
            }))
        }
    }

    let invocations = Arc::new(AtomicUsize::new(0));
    let engine = SandboxEngine::new(
        SandboxConfig::default(),
        Arc::new(Factory {
            invocations: Arc::clone(&invocations),
        }),
        LibraryCache::new(Arc::new(NoFetch)),
    );
    let regen = ScriptedRegen::repeating(None);
    let orchestrator = Orchestrator::new(
        engine,
        regen as Arc<dyn RegenerationClient>,
        OrchestratorConfig::default(),
    );

    let mut parameters = IndexMap::new();
    parameters.insert("radius".to_string(), 12.0);
    let request = JobRequest::new(Script::new("sphere(r=radius);"), FileType::Stl, "a sphere")
        .with_parameters(parameters);

    let (_, result) = orchestrator.submit(request).await;
    assert!(matches!(result, JobResult::Success { .. }));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}
