//! Check media backend availability.

use clipforge_common::AppConfig;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Clipforge System Check");
    println!("{}", "=".repeat(50));

    let config_path = AppConfig::path();
    match AppConfig::load_from(&config_path) {
        Ok(_) if config_path.exists() => println!("[OK] Config: {}", config_path.display()),
        Ok(_) => println!("[OK] Config: defaults ({} not found)", config_path.display()),
        Err(e) => println!("[!!] {e} (using defaults)"),
    }
    println!(
        "     media dir: {}, export dir: {}, progress every {}ms",
        config.media_dir,
        config.export_dir,
        config.progress_interval().as_millis()
    );
    println!();

    if media_backend_report() {
        println!("\nMedia backend is available. Clipforge can render.");
    } else {
        println!("\nRendering is unavailable. See above for details.");
    }
    Ok(())
}

/// Elements used by the render profiles: (factory, purpose, required).
#[cfg(feature = "ges")]
const ELEMENTS: &[(&str, &str, bool)] = &[
    ("encodebin", "encoding", true),
    ("multifilesrc", "image sequences", false),
    ("x264enc", "h264 video", false),
    ("vp8enc", "vp8 video", false),
    ("theoraenc", "theora video", false),
    ("vorbisenc", "vorbis audio", false),
    ("avenc_aac", "aac audio", false),
    ("qtmux", "mp4 container", false),
    ("webmmux", "webm container", false),
    ("oggmux", "ogg container", false),
    ("matroskamux", "mkv container", false),
];

#[cfg(feature = "ges")]
fn media_backend_report() -> bool {
    use clipforge_render_engine::{GesRenderBackend, RenderBackend};
    use clipforge_timeline::GesTimeline;
    use gstreamer as gst;

    let timeline = match GesTimeline::new_audio_video() {
        Ok(timeline) => timeline,
        Err(e) => {
            println!("[FAIL] {e}");
            return false;
        }
    };
    println!("[OK] {}", gst::version_string());

    let backend = GesRenderBackend::new(timeline.timeline());
    let available = backend.is_available();

    for (factory, purpose, required) in ELEMENTS {
        if gst::ElementFactory::find(factory).is_some() {
            println!("[OK] {factory} ({purpose})");
        } else if *required {
            println!("[FAIL] {factory} missing ({purpose})");
        } else {
            println!("[WARN] {factory} missing ({purpose})");
        }
    }
    available
}

#[cfg(not(feature = "ges"))]
fn media_backend_report() -> bool {
    println!("[WARN] Media backend: built without the `ges` feature");
    println!("     Rebuild with `--features ges` to render with GStreamer Editing Services.");
    false
}
