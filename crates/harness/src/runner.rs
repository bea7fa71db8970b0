//! Suite runner that drives each invocation through the driver lifecycle

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::artifact::{
    ArtifactCollector, PageSourceArtifact, PageSourceCapture, ScreenshotArtifact,
    ScreenshotCapture,
};
use crate::config::HarnessConfig;
use crate::context::InvocationContext;
use crate::error::{HarnessError, HarnessResult};
use crate::lifecycle::{DriverManager, TestInstance};
use crate::method::MethodDescriptor;
use crate::platform::PlatformFilter;
use crate::registry::SuiteRegistry;

/// Body of a test or setup method.
pub type TestBody = Box<dyn Fn(&mut InvocationContext) -> anyhow::Result<()> + Send + Sync>;

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub invocation_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub artifacts: Vec<PathBuf>,
    pub error: Option<String>,
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

struct TestCase {
    method: Arc<MethodDescriptor>,
    instance: Arc<dyn TestInstance>,
    body: TestBody,
}

struct SetupStep {
    method: Arc<MethodDescriptor>,
    body: TestBody,
}

pub struct SuiteRunner {
    manager: DriverManager,
    filter: PlatformFilter,
    page_source: PageSourceCapture,
    screenshots: ScreenshotCapture,
    setups: HashMap<String, Vec<SetupStep>>,
    cases: Vec<TestCase>,
    output_dir: PathBuf,
}

impl SuiteRunner {
    pub fn new(config: Arc<HarnessConfig>, registry: Arc<SuiteRegistry>) -> Self {
        let filter = PlatformFilter::new(config.context_platform.clone());
        let page_source = ArtifactCollector::from_config(PageSourceArtifact, &config);
        let screenshots = ArtifactCollector::from_config(ScreenshotArtifact, &config);
        let output_dir = config
            .artifacts
            .output_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            manager: DriverManager::new(config, registry),
            filter,
            page_source,
            screenshots,
            setups: HashMap::new(),
            cases: Vec::new(),
            output_dir,
        }
    }

    pub fn with_filter(mut self, filter: PlatformFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn manager(&self) -> &DriverManager {
        &self.manager
    }

    /// Register the body of a test method known to the registry.
    pub fn test<F>(
        mut self,
        qualified_name: &str,
        instance: Arc<dyn TestInstance>,
        body: F,
    ) -> HarnessResult<Self>
    where
        F: Fn(&mut InvocationContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let method = self.lookup(qualified_name)?;
        if !method.kind.is_test() {
            return Err(HarnessError::InvalidConfig(format!(
                "{qualified_name} is not a test method"
            )));
        }
        self.cases.push(TestCase {
            method,
            instance,
            body: Box::new(body),
        });
        Ok(self)
    }

    /// Register a setup method run before every test of its class, inside
    /// the test's invocation.
    pub fn setup<F>(mut self, qualified_name: &str, body: F) -> HarnessResult<Self>
    where
        F: Fn(&mut InvocationContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let method = self.lookup(qualified_name)?;
        if !method.kind.is_setup() {
            return Err(HarnessError::InvalidConfig(format!(
                "{qualified_name} is not a setup method"
            )));
        }
        self.setups
            .entry(method.class_name.clone())
            .or_default()
            .push(SetupStep {
                method,
                body: Box::new(body),
            });
        Ok(self)
    }

    fn lookup(&self, qualified_name: &str) -> HarnessResult<Arc<MethodDescriptor>> {
        self.manager
            .registry()
            .method(qualified_name)
            .cloned()
            .ok_or_else(|| HarnessError::NotRegistered {
                kind: "method",
                name: qualified_name.to_string(),
            })
    }

    /// Run every registered test in registration order.
    pub fn run_all(&self) -> TestSuiteResult {
        let start = Instant::now();
        info!("Running {} test(s)...", self.cases.len());
        let results = self.cases.iter().map(|case| self.run_case(case)).collect();
        self.summarize(results, start)
    }

    /// Run tests on `workers` threads. Each invocation keeps its own context
    /// and driver; results are reported in registration order.
    pub fn run_parallel(&self, workers: usize) -> TestSuiteResult {
        let start = Instant::now();
        let workers = workers.max(1);
        info!("Running {} test(s) on {} worker(s)...", self.cases.len(), workers);

        let next = &AtomicUsize::new(0);
        let mut indexed: Vec<(usize, TestResult)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(move |_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(case) = self.cases.get(i) else {
                                break;
                            };
                            done.push((i, self.run_case(case)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(_) => {
                        error!("Test worker panicked");
                        Vec::new()
                    }
                })
                .collect()
        });

        indexed.sort_by_key(|(i, _)| *i);
        let results = indexed.into_iter().map(|(_, result)| result).collect();
        self.summarize(results, start)
    }

    fn summarize(&self, results: Vec<TestResult>, start: Instant) -> TestSuiteResult {
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - passed - skipped;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    fn run_case(&self, case: &TestCase) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let name = case.method.qualified_name();

        if !self.filter.should_run(&case.method) {
            info!("- {} (skipped: platform)", name);
            return TestResult {
                name,
                success: true,
                skipped: true,
                duration_ms: 0,
                started_at,
                invocation_id: None,
                session_id: None,
                artifacts: Vec::new(),
                error: None,
            };
        }

        let mut ctx = InvocationContext::new(name.clone());
        debug!(test = %name, invocation = %ctx.id(), "Starting invocation");

        // a panicking body fails its own invocation only; capture and
        // teardown below still run
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.invoke(case, &mut ctx)))
            .unwrap_or_else(|payload| Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))));
        let mut artifacts = Vec::new();
        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                let message = format!("{e:#}");
                ctx.record_failure(message.clone());
                artifacts.extend(self.screenshots.capture_artifact(&ctx));
                artifacts.extend(self.page_source.capture_artifact(&ctx));
                Some(message)
            }
        };

        let session_id = DriverManager::get_driver(&ctx).map(|h| h.session_id().to_string());
        self.manager.after_invocation(&case.method, &mut ctx);
        DriverManager::close_driver(&mut ctx);

        let duration_ms = start.elapsed().as_millis() as u64;
        match &error {
            None => info!("✓ {} ({} ms)", name, duration_ms),
            Some(e) => error!("✗ {} - {}", name, e),
        }

        TestResult {
            name,
            success: error.is_none(),
            skipped: false,
            duration_ms,
            started_at,
            invocation_id: Some(ctx.id()),
            session_id,
            artifacts,
            error,
        }
    }

    fn invoke(&self, case: &TestCase, ctx: &mut InvocationContext) -> anyhow::Result<()> {
        let instance = case.instance.as_ref();
        if let Some(steps) = self.setups.get(&case.method.class_name) {
            for step in steps {
                self.manager.before_invocation(&step.method, instance, ctx)?;
                (step.body)(ctx)?;
                self.manager.after_invocation(&step.method, ctx);
            }
        }
        self.manager.before_invocation(&case.method, instance, ctx)?;
        (case.body)(ctx)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
