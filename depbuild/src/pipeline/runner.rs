//! Sequential dependency build pipeline.

use super::report::{DependencyReport, RunReport};
use crate::cancellation::CancellationToken;
use crate::config::BuildContext;
use crate::core::{validate_specs, DependencySpec, DependencyState};
use crate::errors::BuildError;
use crate::events::{BuildEvent, EventKind, EventSink, NoOpEventSink};
use crate::stages::{stages_for, StageContext, StageResult};
use crate::toolchain::{SystemToolRunner, ToolRunner};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Cancellation shared by the dependencies of one concurrent run.
#[derive(Debug, Clone, Copy)]
pub(super) struct SharedRun<'a> {
    pub(super) token: &'a CancellationToken,
    /// Cancel the other dependencies as soon as one stage fails.
    pub(super) fail_fast: bool,
}

/// Runs dependencies one after another through clean, verify, extract,
/// build and install.
///
/// The run stops at the first error; later dependencies are not touched.
pub struct Pipeline {
    tools: Arc<dyn ToolRunner>,
    pub(super) sink: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline that runs tools through `tools`.
    #[must_use]
    pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
        Self {
            tools,
            sink: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancellationToken::new()),
        }
    }

    /// Creates a pipeline that spawns real processes.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemToolRunner::new()))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the cancellation token checked before every stage.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Processes every dependency in order.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the run, e.g. [`BuildError::MissingArchive`].
    pub fn run(&self, specs: &[DependencySpec], ctx: &BuildContext) -> Result<(), BuildError> {
        self.run_recorded(specs, ctx).into_result()
    }

    /// Processes every dependency in order and reports what happened.
    pub fn run_recorded(&self, specs: &[DependencySpec], ctx: &BuildContext) -> RunReport {
        let mut report = RunReport::start();
        self.sink.try_emit(start_event(&report, specs));

        if let Err(err) = Self::preconditions(specs, ctx) {
            report.errors.push(err);
        } else {
            for spec in specs {
                let (dependency, result) = self.process(spec, ctx, None);
                report.dependencies.push(dependency);
                if let Err(err) = result {
                    report.errors.push(err);
                    break;
                }
            }
        }

        report.finish();
        self.sink.try_emit(summary_event(&report));
        report
    }

    pub(super) fn preconditions(
        specs: &[DependencySpec],
        ctx: &BuildContext,
    ) -> Result<(), BuildError> {
        ctx.validate()?;
        validate_specs(specs)?;
        if !ctx.work_dir.is_dir() {
            return Err(BuildError::Config(crate::errors::ConfigError::Invalid(format!(
                "working directory {} does not exist",
                ctx.work_dir.display()
            ))));
        }
        Ok(())
    }

    fn cancellation_reason(&self, shared: Option<SharedRun<'_>>) -> Option<String> {
        std::iter::once(self.cancel.as_ref())
            .chain(shared.map(|run| run.token))
            .find(|token| token.is_cancelled())
            .map(|token| token.reason().unwrap_or_else(|| "cancelled".to_string()))
    }

    /// Runs the stage sequence of one dependency.
    ///
    /// The token in `shared` is checked alongside the pipeline's own token.
    /// In fail-fast mode a failed stage cancels it before any failure event
    /// is published.
    pub(super) fn process(
        &self,
        spec: &DependencySpec,
        ctx: &BuildContext,
        shared: Option<SharedRun<'_>>,
    ) -> (DependencyReport, Result<(), BuildError>) {
        info!(dependency = %spec.name, "Building sub-library {}", spec.name);
        self.sink
            .try_emit(BuildEvent::for_dependency(EventKind::DependencyStarted, &spec.name));

        let stage_ctx = StageContext::new(ctx, self.tools.as_ref());
        let mut report = DependencyReport::new(&spec.name);

        for stage in stages_for(spec) {
            let kind = stage.kind();

            if let Some(reason) = self.cancellation_reason(shared) {
                info!(
                    dependency = %spec.name,
                    stage = %kind,
                    reason = %reason,
                    "Skipping cancelled dependency"
                );
                report.stages.push(StageResult::cancelled(&spec.name, kind, reason.clone()));
                report.state = DependencyState::Aborted(reason.clone());
                self.sink.try_emit(
                    BuildEvent::for_dependency(EventKind::DependencyAborted, &spec.name)
                        .with_stage(kind)
                        .with_message(reason.clone()),
                );
                let err = BuildError::Cancelled {
                    name: spec.name.clone(),
                    reason,
                };
                return (report, Err(err));
            }

            let started = Utc::now();
            match stage.execute(spec, &stage_ctx) {
                Ok(output) => {
                    let result = StageResult::completed(&spec.name, kind, started, output);
                    self.sink.try_emit(
                        BuildEvent::for_dependency(EventKind::StageCompleted, &spec.name)
                            .with_stage(kind)
                            .with_duration_ms(result.duration_ms()),
                    );
                    report.stages.push(result);
                    report.state = DependencyState::after(kind);
                }
                Err(err) => {
                    if let Some(run) = shared.filter(|run| run.fail_fast) {
                        run.token.cancel(format!("{} failed", spec.name));
                    }
                    let message = err.to_string();
                    error!(
                        dependency = %spec.name,
                        stage = %kind,
                        error = %message,
                        "Stage failed"
                    );
                    report
                        .stages
                        .push(StageResult::failed(&spec.name, kind, started, message.clone()));
                    report.state = DependencyState::Aborted(message.clone());
                    self.sink.try_emit(
                        BuildEvent::for_dependency(EventKind::StageFailed, &spec.name)
                            .with_stage(kind)
                            .with_message(message.clone()),
                    );
                    self.sink.try_emit(
                        BuildEvent::for_dependency(EventKind::DependencyAborted, &spec.name)
                            .with_stage(kind)
                            .with_message(message),
                    );
                    return (report, Err(err));
                }
            }
        }

        let installed = report.installed().map(|file| file.path.clone()).collect();
        self.sink.try_emit(
            BuildEvent::for_dependency(EventKind::DependencyInstalled, &spec.name)
                .with_paths(installed),
        );
        (report, Ok(()))
    }
}

/// Opening event of a run; the message lists the dependencies in order.
pub(super) fn start_event(report: &RunReport, specs: &[DependencySpec]) -> BuildEvent {
    let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
    BuildEvent::new(EventKind::PipelineStarted)
        .with_run_id(report.run_id)
        .with_message(names.join(", "))
}

/// Closing event of a finished run.
pub(super) fn summary_event(report: &RunReport) -> BuildEvent {
    let kind = if report.is_success() {
        EventKind::PipelineCompleted
    } else {
        EventKind::PipelineFailed
    };
    let event = BuildEvent::new(kind)
        .with_run_id(report.run_id)
        .with_duration_ms((report.ended_at - report.started_at).num_milliseconds());
    match report.first_error() {
        Some(err) => event.with_message(err.to_string()),
        None => event,
    }
}
