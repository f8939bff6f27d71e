//! Summarize a saved project file.

use std::path::PathBuf;

use clipforge_common::clock::native_to_secs;
use clipforge_timeline::read_project_summary;

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let summary = read_project_summary(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Project: {}", path.display());
    println!(
        "  {} layer(s), {} clip(s)",
        summary.layers.len(),
        summary.clip_count()
    );
    for layer in &summary.layers {
        println!();
        println!("Layer {}:", layer.priority);
        for clip in &layer.clips {
            println!(
                "  {} @ {:.2}s (in {:.2}s, {:.2}s)",
                clip.asset_id,
                native_to_secs(clip.start),
                native_to_secs(clip.inpoint),
                native_to_secs(clip.duration)
            );
            for effect in &clip.effects {
                println!("    effect: {effect}");
            }
        }
    }
    Ok(())
}
