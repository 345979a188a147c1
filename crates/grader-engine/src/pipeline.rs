//! The task pipeline: one invocation from catalog lookup to final result.
//!
//! Phases run in order: tree generation, files generation, parsing gate,
//! static evaluation, sandbox + runtime evaluation, final resolution. The
//! two generation calls are awaited sequentially because the files phase
//! needs the agreed tree. Every failure after catalog lookup is recovered
//! into a complete, well-typed [`TaskOutcome`]; only an unknown task id
//! propagates as an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use grader_core::{
    emit_generation_timed_out, emit_phase_completed, emit_task_finished, emit_task_started,
    BenchmarkAccumulator, FailureAnnotation, FinalResult, Result, RuleId, SandboxManifest,
    TaskSpan, TaskSpec,
};

use crate::collab::{ArtifactGenerator, GenerationPhase, GenerationRequest, TaskCatalog};
use crate::final_eval::resolve_final;
use crate::runtime_eval::evaluate_runtime;
use crate::sandbox::SandboxRunner;
use crate::static_eval::StaticEvaluator;

/// Pipeline-level configuration.
#[derive(Default)]
pub struct PipelineConfig {
    /// Optional cross-task accumulator. The pipeline records every final
    /// score into it; `None` disables roll-up tracking entirely.
    pub accumulator: Option<Arc<BenchmarkAccumulator>>,
}

/// Everything one invocation produced.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task identifier.
    pub task_id: String,

    /// Unique id for this invocation, also tagged on every log event.
    pub invocation_id: String,

    /// The resolved verdict.
    pub result: FinalResult,

    /// Merged static + runtime annotations, in emission order.
    pub annotations: Vec<FailureAnnotation>,

    /// Collaborator and sandbox log lines.
    pub logs: Vec<String>,

    /// Set when a generation call lost its deadline race.
    pub infrastructure_timeout: bool,

    /// Summed token usage across generation calls, when reported.
    pub token_usage: Option<u64>,

    /// Wall-clock time the invocation took, catalog lookup excluded.
    pub duration: Duration,
}

enum PhaseCall {
    Completed(crate::collab::GenerationResponse),
    TimedOut,
    Failed(String),
}

/// Drives one task at a time to completion. A single pipeline instance may
/// be invoked concurrently across independent tasks; the only shared state
/// is the optional accumulator.
pub struct TaskPipeline {
    generator: Arc<dyn ArtifactGenerator>,
    catalog: Arc<dyn TaskCatalog>,
    static_eval: StaticEvaluator,
    sandbox: SandboxRunner,
    config: PipelineConfig,
}

impl TaskPipeline {
    pub fn new(
        generator: Arc<dyn ArtifactGenerator>,
        catalog: Arc<dyn TaskCatalog>,
        static_eval: StaticEvaluator,
        sandbox: SandboxRunner,
    ) -> Self {
        Self {
            generator,
            catalog,
            static_eval,
            sandbox,
            config: PipelineConfig::default(),
        }
    }

    /// Override the pipeline configuration (builder pattern).
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Grade one task end to end.
    ///
    /// `Err` only for an unknown task id; every later failure degrades into
    /// the returned outcome.
    pub async fn grade(&self, task_id: &str) -> Result<TaskOutcome> {
        let spec = self.catalog.lookup(task_id)?;
        let invocation_id = Uuid::new_v4().to_string();
        let _span = TaskSpan::enter(task_id, &invocation_id);
        emit_task_started(task_id, &spec.tier.to_string());

        let started = Instant::now();
        let budget = spec.tier.time_budget();
        let mut logs = Vec::new();
        let mut token_usage: Option<u64> = None;

        // Tree phase.
        let phase_started = Instant::now();
        let tree_request = GenerationRequest {
            task_id: spec.id.clone(),
            tier: spec.tier,
            description: spec.description.clone(),
            expected_files: spec.required_files.clone(),
            phase: GenerationPhase::Tree,
        };
        let tree_response = match self.call_generator(&spec, tree_request, started, budget).await
        {
            PhaseCall::Completed(response) => response,
            PhaseCall::TimedOut => {
                return Ok(self.finish_degraded(
                    &spec,
                    &invocation_id,
                    RuleId::GenerationTimeout.annotate("tree generation lost the deadline race"),
                    "tree generation timed out",
                    logs,
                    true,
                    started,
                ));
            }
            PhaseCall::Failed(reason) => {
                return Ok(self.finish_degraded(
                    &spec,
                    &invocation_id,
                    RuleId::GenerationFailed.annotate(reason),
                    "tree generation failed",
                    logs,
                    false,
                    started,
                ));
            }
        };
        logs.extend(tree_response.log_lines.clone());
        merge_tokens(&mut token_usage, tree_response.token_usage);
        emit_phase_completed(
            task_id,
            "generation.tree",
            phase_started.elapsed().as_millis() as u64,
        );

        let tree = if tree_response.tree.is_empty() {
            spec.required_files.clone()
        } else {
            tree_response.tree.clone()
        };

        // Files phase, fed by the agreed tree.
        let phase_started = Instant::now();
        let files_request = GenerationRequest {
            task_id: spec.id.clone(),
            tier: spec.tier,
            description: spec.description.clone(),
            expected_files: tree.clone(),
            phase: GenerationPhase::Files,
        };
        let files_response = match self.call_generator(&spec, files_request, started, budget).await
        {
            PhaseCall::Completed(response) => response,
            PhaseCall::TimedOut => {
                logs.push(format!("tree phase had proposed {} files", tree.len()));
                return Ok(self.finish_degraded(
                    &spec,
                    &invocation_id,
                    RuleId::GenerationTimeout.annotate("files generation lost the deadline race"),
                    "files generation timed out",
                    logs,
                    true,
                    started,
                ));
            }
            PhaseCall::Failed(reason) => {
                logs.push(format!("tree phase had proposed {} files", tree.len()));
                return Ok(self.finish_degraded(
                    &spec,
                    &invocation_id,
                    RuleId::GenerationFailed.annotate(reason),
                    "files generation failed",
                    logs,
                    false,
                    started,
                ));
            }
        };
        logs.extend(files_response.log_lines.clone());
        merge_tokens(&mut token_usage, files_response.token_usage);
        emit_phase_completed(
            task_id,
            "generation.files",
            phase_started.elapsed().as_millis() as u64,
        );

        // Parsing gate. Rejection is terminal for the artifact but the tree
        // metadata already obtained stays in the outcome's log.
        let Some(bundle) = files_response.bundle else {
            logs.push(format!("tree phase had proposed {} files", tree.len()));
            return Ok(self.finish_degraded(
                &spec,
                &invocation_id,
                RuleId::GenerationFailed.annotate("files phase returned no artifact bundle"),
                "files phase returned no artifact bundle",
                logs,
                false,
                started,
            ));
        };
        if let Err(err) = bundle.validate() {
            logs.push(format!("tree phase had proposed {} files", tree.len()));
            return Ok(self.finish_degraded(
                &spec,
                &invocation_id,
                RuleId::BundleRejected.annotate(err.to_string()),
                "artifact bundle rejected by the parsing gate",
                logs,
                false,
                started,
            ));
        }

        // Static evaluation.
        let phase_started = Instant::now();
        let report = self.static_eval.evaluate(&spec, &bundle).await;
        let mut annotations = report.annotations;
        emit_phase_completed(
            task_id,
            "static_eval",
            phase_started.elapsed().as_millis() as u64,
        );

        // Sandbox + runtime evaluation, skipped for static-only tasks.
        let runtime_score = if spec.has_runtime() {
            let phase_started = Instant::now();
            let manifest = SandboxManifest::from_bundle(spec.runtime.entry.clone(), &bundle);
            let run = self.sandbox.run(&bundle, &spec.runtime).await;
            logs.extend(run.logs.clone());
            let evaluation = evaluate_runtime(&run, &manifest);
            annotations.extend(evaluation.annotations);
            emit_phase_completed(
                task_id,
                "sandbox",
                phase_started.elapsed().as_millis() as u64,
            );
            Some(evaluation.score)
        } else {
            None
        };

        let result = resolve_final(spec.tier, report.breakdown, runtime_score, &annotations);
        self.record(&spec, &result);
        emit_task_finished(
            task_id,
            result.score,
            result.dominant_layer.map(|l| l.to_string()).as_deref(),
        );

        Ok(TaskOutcome {
            task_id: spec.id,
            invocation_id,
            result,
            annotations,
            logs,
            infrastructure_timeout: false,
            token_usage,
            duration: started.elapsed(),
        })
    }

    /// One generation call, raced against the remaining budget slice at the
    /// heaviest tier only. The loser of the race is abandoned, not
    /// cancelled: the underlying call may still run to completion, but its
    /// result is discarded.
    async fn call_generator(
        &self,
        spec: &TaskSpec,
        request: GenerationRequest,
        started: Instant,
        budget: Duration,
    ) -> PhaseCall {
        let phase = request.phase;
        if !spec.tier.races_deadline() {
            return match self.generator.generate(request).await {
                Ok(response) => PhaseCall::Completed(response),
                Err(err) => PhaseCall::Failed(err.to_string()),
            };
        }

        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            emit_generation_timed_out(&spec.id, &phase.to_string(), 0);
            return PhaseCall::TimedOut;
        }
        match tokio::time::timeout(remaining, self.generator.generate(request)).await {
            Ok(Ok(response)) => PhaseCall::Completed(response),
            Ok(Err(err)) => PhaseCall::Failed(err.to_string()),
            Err(_) => {
                emit_generation_timed_out(
                    &spec.id,
                    &phase.to_string(),
                    remaining.as_millis() as u64,
                );
                PhaseCall::TimedOut
            }
        }
    }

    fn finish_degraded(
        &self,
        spec: &TaskSpec,
        invocation_id: &str,
        annotation: FailureAnnotation,
        note: &str,
        logs: Vec<String>,
        infrastructure_timeout: bool,
        started: Instant,
    ) -> TaskOutcome {
        let annotations = vec![annotation];
        let result = FinalResult::degraded(note, &annotations);
        self.record(spec, &result);
        emit_task_finished(
            &spec.id,
            result.score,
            result.dominant_layer.map(|l| l.to_string()).as_deref(),
        );
        TaskOutcome {
            task_id: spec.id.clone(),
            invocation_id: invocation_id.to_string(),
            result,
            annotations,
            logs,
            infrastructure_timeout,
            token_usage: None,
            duration: started.elapsed(),
        }
    }

    fn record(&self, spec: &TaskSpec, result: &FinalResult) {
        if let Some(accumulator) = &self.config.accumulator {
            accumulator.add(result.score, spec.tier.weight());
        }
    }
}

fn merge_tokens(total: &mut Option<u64>, reported: Option<u64>) {
    if let Some(count) = reported {
        *total = Some(total.unwrap_or(0) + count);
    }
}
