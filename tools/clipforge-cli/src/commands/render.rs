//! Compile a composition and render it.

use std::io::Write;
use std::path::{Path, PathBuf};

use clipforge_common::clock::native_to_secs;
use clipforge_common::AppConfig;
use clipforge_compiler::{compile_file, CompiledComposition};
use clipforge_composition::PathResolver;
use clipforge_render_engine::{
    PassProgress, PassReport, PassStatus, PlannedPass, RenderBackend, RenderDispatcher,
    RenderObserver,
};
use clipforge_timeline::{AssetCatalog, EditingBackend, MemoryTimeline};

pub fn run(input: PathBuf, dry_run: bool, preview: bool, config: &AppConfig) -> anyhow::Result<()> {
    let resolver = PathResolver::from_current_dir(&config.media_dir)
        .map_err(|e| anyhow::anyhow!("Failed to read current directory: {e}"))?;
    let dispatcher = RenderDispatcher::from_config(resolver.clone(), config);

    if dry_run {
        return plan_only(&input, &resolver, &dispatcher);
    }
    compile_and_render(&input, &resolver, &dispatcher, preview)
}

/// Compile phase failures stop the run before anything is saved or rendered.
fn compile<B: EditingBackend>(
    timeline: &mut B,
    input: &Path,
    resolver: &PathResolver,
) -> anyhow::Result<CompiledComposition> {
    compile_file(timeline, input, resolver).map_err(|e| {
        if e.is_compile_phase() {
            tracing::error!(input = %input.display(), error = %e, "Compilation aborted; nothing saved or rendered");
        }
        e.into()
    })
}

fn plan_only(
    input: &Path,
    resolver: &PathResolver,
    dispatcher: &RenderDispatcher,
) -> anyhow::Result<()> {
    let mut timeline = MemoryTimeline::new_audio_video(AssetCatalog::probing_files());
    let compiled = compile(&mut timeline, input, resolver)?;
    print_compiled(&compiled);

    println!();
    println!("Planned passes:");
    for pass in dispatcher.plan(&compiled.spec) {
        println!("  {:<6} {}", pass.tag, pass.output);
        println!(
            "         {} / {} / {}",
            pass.profile.container, pass.profile.video, pass.profile.audio
        );
    }
    Ok(())
}

#[cfg(feature = "ges")]
fn compile_and_render(
    input: &Path,
    resolver: &PathResolver,
    dispatcher: &RenderDispatcher,
    preview: bool,
) -> anyhow::Result<()> {
    use clipforge_render_engine::GesRenderBackend;
    use clipforge_timeline::GesTimeline;

    let mut timeline = GesTimeline::new_audio_video()?;
    let compiled = compile(&mut timeline, input, resolver)?;
    print_compiled(&compiled);

    let mut backend = GesRenderBackend::new(timeline.timeline());
    drive(&mut backend, &compiled, dispatcher, preview)
}

#[cfg(not(feature = "ges"))]
fn compile_and_render(
    input: &Path,
    resolver: &PathResolver,
    dispatcher: &RenderDispatcher,
    preview: bool,
) -> anyhow::Result<()> {
    use clipforge_render_engine::UnavailableBackend;

    let mut timeline = MemoryTimeline::new_audio_video(AssetCatalog::probing_files());
    let compiled = compile(&mut timeline, input, resolver)?;
    print_compiled(&compiled);

    tracing::warn!("Built without the `ges` feature; render passes cannot run");
    let mut backend = UnavailableBackend::new(
        "clipforge was built without the `ges` feature",
        compiled.duration,
    );
    drive(&mut backend, &compiled, dispatcher, preview)
}

fn drive(
    backend: &mut dyn RenderBackend,
    compiled: &CompiledComposition,
    dispatcher: &RenderDispatcher,
    preview: bool,
) -> anyhow::Result<()> {
    if !backend.is_available() {
        tracing::warn!(backend = backend.name(), "Render backend reports it is unavailable");
    }
    let mut observer = ConsoleObserver;

    if preview {
        let outcome = dispatcher.preview(backend, &compiled.spec, &mut observer)?;
        println!();
        println!("Preview finished ({outcome:?})");
        return Ok(());
    }

    let summary = dispatcher.run(backend, &compiled.spec, &mut observer)?;
    let failed: Vec<&str> = summary.failures().map(|pass| pass.tag.as_str()).collect();
    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} render pass(es) failed: {}",
            failed.len(),
            summary.passes.len(),
            failed.join(", ")
        )
    }
}

fn print_compiled(compiled: &CompiledComposition) {
    let spec = &compiled.spec;
    println!(
        "Compiled '{}': {} layer(s), {} clip(s), {:.2}s",
        spec.name,
        spec.layers.len(),
        spec.clip_count(),
        native_to_secs(compiled.duration)
    );
    println!("  Project: {}", compiled.project.display());
}

/// Prints the progress line and the per-pass timing banner.
struct ConsoleObserver;

impl RenderObserver for ConsoleObserver {
    fn pass_started(&mut self, pass: &PlannedPass) {
        println!("Rendering {} -> {}", pass.tag, pass.output);
    }

    fn progress(&mut self, progress: &PassProgress) {
        print!("\r{}", progress.status_line());
        let _ = std::io::stdout().flush();
    }

    fn pass_finished(&mut self, report: &PassReport) {
        let label = match &report.status {
            PassStatus::Rendered => "Rendering",
            PassStatus::Failed { .. } => "Error",
        };
        println!();
        println!("====");
        println!("{label} took {:.2}s", report.elapsed.as_secs_f64());
        println!("====");
        if let PassStatus::Failed { message } = &report.status {
            println!("  {message}");
        }
    }
}
