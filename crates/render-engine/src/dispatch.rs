//! Render dispatch: one pass per requested output format.

use std::time::Duration;

use chrono::{DateTime, Utc};
use clipforge_common::{AppConfig, ClipforgeError, ClipforgeResult, Stopwatch};
use clipforge_composition::{CompositionSpec, OutputFormat, PathResolver};
use serde::Serialize;

use crate::backend::{PassRequest, RenderBackend, RenderSink};
use crate::profile::{EncodingProfileDesc, RenderProfile, RestrictionCaps};
use crate::session::{PassOutcome, PassProgress};

/// A pass the dispatcher will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPass {
    /// Format tag as written in the composition.
    pub tag: String,
    pub format: OutputFormat,
    pub output: String,
    pub profile: EncodingProfileDesc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PassStatus {
    Rendered,
    Failed { message: String },
}

impl PassStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Rendered)
    }
}

/// Outcome and timing of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub tag: String,
    pub format: OutputFormat,
    pub output: String,
    pub status: PassStatus,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderSummary {
    pub passes: Vec<PassReport>,
}

impl RenderSummary {
    pub fn all_succeeded(&self) -> bool {
        self.passes.iter().all(|pass| pass.status.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PassReport> {
        self.passes.iter().filter(|pass| !pass.status.is_success())
    }
}

/// Hooks for surfacing pass progress to a user.
pub trait RenderObserver {
    fn pass_started(&mut self, _pass: &PlannedPass) {}
    fn progress(&mut self, _progress: &PassProgress) {}
    fn pass_finished(&mut self, _report: &PassReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl RenderObserver for SilentObserver {}

/// Plans and runs the render passes of a composition.
#[derive(Debug, Clone)]
pub struct RenderDispatcher {
    resolver: PathResolver,
    export_dir: String,
    poll_interval: Duration,
}

impl RenderDispatcher {
    pub fn new(resolver: PathResolver, export_dir: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            resolver,
            export_dir: export_dir.into(),
            poll_interval,
        }
    }

    pub fn from_config(resolver: PathResolver, config: &AppConfig) -> Self {
        Self::new(resolver, config.export_dir.clone(), config.progress_interval())
    }

    /// Output location for one format: the literal composition name in
    /// absolute-paths mode, otherwise `<media root>/<export dir>/<name>.<ext>`.
    pub fn output_location(&self, spec: &CompositionSpec, format: OutputFormat) -> String {
        if spec.absolute_paths {
            spec.name.clone()
        } else {
            self.resolver
                .export_location(&self.export_dir, &spec.name, format.extension())
        }
    }

    /// Passes for every requested format, in request order.
    pub fn plan(&self, spec: &CompositionSpec) -> Vec<PlannedPass> {
        spec.formats
            .iter()
            .map(|tag| {
                let profile = RenderProfile::for_tag(spec, tag);
                if !OutputFormat::is_known_tag(tag) {
                    tracing::debug!(
                        tag = %tag,
                        fallback = OutputFormat::DEFAULT.as_str(),
                        "Unknown format tag; using default profile"
                    );
                }
                PlannedPass {
                    tag: tag.clone(),
                    format: profile.format,
                    output: self.output_location(spec, profile.format),
                    profile: profile.encoding_profile(),
                }
            })
            .collect()
    }

    fn prepare(
        &self,
        backend: &mut dyn RenderBackend,
        spec: &CompositionSpec,
    ) -> ClipforgeResult<()> {
        let caps = RestrictionCaps::for_composition(spec);
        backend.apply_restriction(&caps)?;
        tracing::debug!(caps = %caps, "Video restriction applied");
        Ok(())
    }

    /// Render every planned pass sequentially.
    ///
    /// A failed pass is recorded and the next one still runs. Only setup
    /// failures before the first pass are returned as errors.
    pub fn run(
        &self,
        backend: &mut dyn RenderBackend,
        spec: &CompositionSpec,
        observer: &mut dyn RenderObserver,
    ) -> ClipforgeResult<RenderSummary> {
        self.prepare(backend, spec)?;
        if !spec.absolute_paths {
            std::fs::create_dir_all(self.resolver.export_root(&self.export_dir))?;
        }

        let mut summary = RenderSummary::default();
        for pass in self.plan(spec) {
            observer.pass_started(&pass);
            let request = PassRequest {
                sink: Some(RenderSink {
                    location: pass.output.clone(),
                    profile: pass.profile.clone(),
                }),
                poll_interval: self.poll_interval,
            };

            let watch = Stopwatch::start();
            let result = {
                let mut on_progress = |progress: PassProgress| observer.progress(&progress);
                backend.run_pass(&request, &mut on_progress)
            };
            let status = match result {
                Ok(_) => PassStatus::Rendered,
                Err(e) => PassStatus::Failed {
                    message: e.to_string(),
                },
            };

            let report = PassReport {
                tag: pass.tag,
                format: pass.format,
                output: pass.output,
                status,
                elapsed: watch.elapsed(),
                started_at: watch.started_at(),
            };
            match &report.status {
                PassStatus::Rendered => tracing::info!(
                    format = report.format.as_str(),
                    output = %report.output,
                    elapsed_secs = report.elapsed.as_secs_f64(),
                    "Render pass finished"
                ),
                PassStatus::Failed { message } => tracing::error!(
                    format = report.format.as_str(),
                    output = %report.output,
                    error = %message,
                    "Render pass failed"
                ),
            }
            observer.pass_finished(&report);
            summary.passes.push(report);
        }

        Ok(summary)
    }

    /// Play the timeline without encoding; stops after its duration.
    pub fn preview(
        &self,
        backend: &mut dyn RenderBackend,
        spec: &CompositionSpec,
        observer: &mut dyn RenderObserver,
    ) -> ClipforgeResult<PassOutcome> {
        if backend.duration() == 0 {
            return Err(ClipforgeError::render("timeline is empty; nothing to preview"));
        }
        self.prepare(backend, spec)?;
        let request = PassRequest {
            sink: None,
            poll_interval: self.poll_interval,
        };
        let mut on_progress = |progress: PassProgress| observer.progress(&progress);
        backend.run_pass(&request, &mut on_progress)
    }
}
