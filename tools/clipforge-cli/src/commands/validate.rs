//! Validate a composition document.

use std::path::PathBuf;

use clipforge_common::AppConfig;
use clipforge_compiler::load_composition;
use clipforge_composition::{OutputFormat, PathResolver, SourceKind};
use clipforge_render_engine::RenderDispatcher;

pub fn run(path: PathBuf, json: bool, config: &AppConfig) -> anyhow::Result<()> {
    let spec = load_composition(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
        return Ok(());
    }

    println!("Validating composition at: {}", path.display());
    println!("  Name: {}", spec.name);
    println!("  Resolution: {}x{} @ {}fps", spec.width, spec.height, spec.fps);
    println!("  Transparency: {}", spec.transparency);
    println!("  Absolute paths: {}", spec.absolute_paths);
    println!();

    println!("Layers:");
    for layer in &spec.layers {
        let auto = match layer.auto_transition {
            Some(flag) => flag.to_string(),
            None => "unset".to_string(),
        };
        println!(
            "  [{}] {} clip(s), auto-transition: {auto}",
            layer.priority,
            layer.clips.len()
        );
        for clip in &layer.clips {
            let kind = match &clip.source {
                SourceKind::SingleFile { .. } => "file",
                SourceKind::ImageSequence { .. } => "sequence",
                SourceKind::Title { .. } => "title",
                SourceKind::Generated { .. } => "pattern",
            };
            print!(
                "      {kind} {} @ {}s (in {}s, {}s)",
                clip.source.label(),
                clip.start,
                clip.inpoint,
                clip.duration
            );
            if let Some(effect) = clip.effect_name() {
                print!(" effect: {effect}");
            }
            if clip.has_overrides() {
                print!(" (overrides)");
            }
            println!();
        }
    }
    println!();

    let resolver = PathResolver::from_current_dir(&config.media_dir)
        .map_err(|e| anyhow::anyhow!("Failed to read current directory: {e}"))?;
    let dispatcher = RenderDispatcher::from_config(resolver, config);
    println!("Outputs:");
    for pass in dispatcher.plan(&spec) {
        if OutputFormat::is_known_tag(&pass.tag) {
            println!("  {} -> {}", pass.tag, pass.output);
        } else {
            println!(
                "  {} -> {} (unknown tag, rendered as {})",
                pass.tag,
                pass.output,
                pass.format.as_str()
            );
        }
    }

    println!("\nComposition is valid.");
    Ok(())
}
