//! Concurrent dependency builds.
//!
//! Every dependency runs its stages on a blocking worker. Dependencies never
//! share an output path, so workers do not coordinate beyond a shared
//! cancellation token.

use super::report::RunReport;
use super::runner::{start_event, summary_event, Pipeline, SharedRun};
use crate::cancellation::CancellationToken;
use crate::config::BuildContext;
use crate::core::{validate_disjoint_outputs, DependencySpec};
use crate::errors::BuildError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// How a concurrent run reacts to a failed dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Cancel the remaining dependencies at their next stage boundary.
    #[default]
    FailFast,
    /// Let every dependency run to completion and collect all errors.
    BestEffort,
}

/// Runs independent dependencies in parallel.
#[derive(Debug, Clone)]
pub struct ConcurrentPipeline {
    pipeline: Arc<Pipeline>,
    mode: FailureMode,
}

impl ConcurrentPipeline {
    /// Wraps a pipeline; stages, tools and events come from it.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            mode: FailureMode::default(),
        }
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the failure mode.
    #[must_use]
    pub fn failure_mode(&self) -> FailureMode {
        self.mode
    }

    /// Builds every dependency concurrently.
    ///
    /// Dependency reports keep the order of `specs`. Genuine failures are
    /// listed before the cancellations they caused.
    pub async fn run(&self, specs: Vec<DependencySpec>, ctx: Arc<BuildContext>) -> RunReport {
        let mut report = RunReport::start();
        let sink = Arc::clone(&self.pipeline.sink);
        sink.emit(start_event(&report, &specs)).await;

        let checked = Pipeline::preconditions(&specs, &ctx)
            .and_then(|()| validate_disjoint_outputs(&specs).map_err(BuildError::from));
        if let Err(err) = checked {
            report.errors.push(err);
            report.finish();
            sink.emit(summary_event(&report)).await;
            return report;
        }

        info!(count = specs.len(), mode = ?self.mode, "Building dependencies concurrently");
        let run_token = Arc::new(CancellationToken::new());
        let tasks = specs.into_iter().map(|spec| {
            let pipeline = Arc::clone(&self.pipeline);
            let ctx = Arc::clone(&ctx);
            let token = Arc::clone(&run_token);
            let fail_fast = self.mode == FailureMode::FailFast;
            let name = spec.name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let shared = SharedRun {
                    token: &token,
                    fail_fast,
                };
                pipeline.process(&spec, &ctx, Some(shared))
            });
            async move { (name, handle.await) }
        });

        let mut failures = Vec::new();
        let mut cancellations = Vec::new();
        for (name, joined) in join_all(tasks).await {
            match joined {
                Ok((dependency, result)) => {
                    report.dependencies.push(dependency);
                    match result {
                        Ok(()) => {}
                        Err(err) if err.is_cancellation() => cancellations.push(err),
                        Err(err) => failures.push(err),
                    }
                }
                Err(join_err) => {
                    warn!(dependency = %name, error = %join_err, "Dependency worker panicked");
                    failures.push(BuildError::Internal(format!(
                        "worker for {name} did not complete: {join_err}"
                    )));
                }
            }
        }
        report.errors.extend(failures);
        report.errors.extend(cancellations);

        report.finish();
        sink.emit(summary_event(&report)).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        default_dependencies, DependencyState, StageStatus, ARMADILLO, KTHOHR, LAPACK,
    };
    use crate::events::{BuildEvent, CollectingEventSink, EventKind, EventSink};
    use crate::testing::{seed_work_dir, FakeToolRunner};
    use crate::toolchain::{ToolInvocation, ToolOutcome, ToolRunner};
    use parking_lot::{Condvar, Mutex};
    use std::time::Duration;

    /// A latch that holds tool calls until it is opened.
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        opened: Condvar,
    }

    impl Gate {
        fn open(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }

        fn wait(&self) {
            let mut open = self.open.lock();
            while !*open {
                if self.opened.wait_for(&mut open, Duration::from_secs(5)).timed_out() {
                    break;
                }
            }
        }
    }

    /// Holds every tool call at the gate, then runs it through the fake.
    struct GatedTools {
        gate: Arc<Gate>,
        inner: FakeToolRunner,
    }

    impl ToolRunner for GatedTools {
        fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutcome> {
            self.gate.wait();
            self.inner.run(invocation)
        }
    }

    /// Opens the gate once armadillo reports its abort.
    struct OpenOnAbort {
        gate: Arc<Gate>,
    }

    impl EventSink for OpenOnAbort {
        fn try_emit(&self, event: BuildEvent) {
            if event.kind == EventKind::DependencyAborted
                && event.dependency.as_deref() == Some(ARMADILLO)
            {
                self.gate.open();
            }
        }
    }

    fn context(root: &std::path::Path) -> BuildContext {
        BuildContext::new(root.join("work"), "../include", "../lib/debug", "../lib/release")
    }

    #[tokio::test]
    async fn test_all_dependencies_installed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let specs = default_dependencies();
        seed_work_dir(&ctx, &specs, &[]).unwrap();
        let tools = Arc::new(FakeToolRunner::for_catalog(&ctx.toolchain));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = ConcurrentPipeline::new(Pipeline::new(tools).with_event_sink(sink.clone()));

        let report = pipeline.run(specs, Arc::new(ctx.clone())).await;

        assert!(report.is_success(), "{:?}", report.errors);
        let names: Vec<_> = report.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["armadillo", "lapack", "kthohr"]);
        assert!(report.dependencies.iter().all(|d| d.is_installed()));
        assert!(ctx.include_dir().join("kthohr/mcmc.hpp").is_file());
        assert_eq!(sink.kinds().last(), Some(&EventKind::PipelineCompleted));
        assert_eq!(sink.of_kind(EventKind::DependencyInstalled).len(), 3);
    }

    #[tokio::test]
    async fn test_best_effort_collects_every_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let specs = default_dependencies();
        seed_work_dir(&ctx, &specs, &["armadillo", "kthohr"]).unwrap();
        let tools = Arc::new(FakeToolRunner::for_catalog(&ctx.toolchain));
        let pipeline = ConcurrentPipeline::new(Pipeline::new(tools))
            .with_failure_mode(FailureMode::BestEffort);

        let report = pipeline.run(specs, Arc::new(ctx.clone())).await;

        let failed: Vec<_> = report.errors.iter().filter_map(BuildError::dependency).collect();
        assert_eq!(failed, vec!["armadillo", "kthohr"]);
        assert!(report.errors.iter().all(|e| matches!(e, BuildError::MissingArchive { .. })));
        assert_eq!(report.dependency(LAPACK).map(|d| &d.state), Some(&DependencyState::Installed));
        assert!(ctx.debug_lib_dir().join("liblapack.a").is_file());
    }

    #[tokio::test]
    async fn test_fail_fast_reports_root_cause_first() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let specs = default_dependencies();
        seed_work_dir(&ctx, &specs, &["armadillo"]).unwrap();
        let tools = Arc::new(FakeToolRunner::for_catalog(&ctx.toolchain));
        let pipeline = ConcurrentPipeline::new(Pipeline::new(tools));
        assert_eq!(pipeline.failure_mode(), FailureMode::FailFast);

        let report = pipeline.run(specs, Arc::new(ctx)).await;

        assert!(matches!(
            report.first_error(),
            Some(BuildError::MissingArchive { name, .. }) if name == "armadillo"
        ));
        assert!(report.errors[1..].iter().all(BuildError::is_cancellation));
        assert_eq!(report.dependencies.len(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_siblings_released_by_the_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let specs = default_dependencies();
        seed_work_dir(&ctx, &specs, &[ARMADILLO]).unwrap();
        let gate = Arc::new(Gate::default());
        let tools = Arc::new(GatedTools {
            gate: Arc::clone(&gate),
            inner: FakeToolRunner::for_catalog(&ctx.toolchain),
        });
        let sink = Arc::new(OpenOnAbort { gate });
        let pipeline = ConcurrentPipeline::new(Pipeline::new(tools).with_event_sink(sink))
            .with_failure_mode(FailureMode::FailFast);

        let report = pipeline.run(specs, Arc::new(ctx.clone())).await;

        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
        assert!(matches!(
            &report.errors[0],
            BuildError::MissingArchive { name, .. } if name == ARMADILLO
        ));
        assert!(report.errors[1..].iter().all(BuildError::is_cancellation));
        for name in [LAPACK, KTHOHR] {
            let dependency = report.dependency(name).unwrap();
            assert_eq!(
                dependency.state,
                DependencyState::Aborted("armadillo failed".to_string())
            );
            assert_eq!(
                dependency.stages.last().map(|stage| stage.status),
                Some(StageStatus::Cancel)
            );
        }
        for lib_dir in ctx.lib_dirs() {
            assert!(!lib_dir.join("liblapack.a").exists());
            assert!(!lib_dir.join("libkthohr.a").exists());
        }
    }

    #[tokio::test]
    async fn test_overlapping_outputs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let specs = default_dependencies();
        let mut clash = specs[2].clone();
        clash.name = "kthohr-copy".to_string();
        clash.archive_stem = "kthohr-copy".to_string();
        std::fs::create_dir_all(&ctx.work_dir).unwrap();
        let tools = Arc::new(FakeToolRunner::new("make"));
        let pipeline = ConcurrentPipeline::new(Pipeline::new(tools.clone()));

        let report = pipeline.run(vec![specs[2].clone(), clash], Arc::new(ctx)).await;

        assert!(matches!(report.first_error(), Some(BuildError::Config(_))));
        assert!(report.dependencies.is_empty());
        assert!(tools.calls().is_empty());
    }
}
