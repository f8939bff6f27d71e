//! Layer compilation.

use clipforge_common::ClipforgeResult;
use clipforge_composition::LayerSpec;
use clipforge_timeline::EditingBackend;

use crate::clip::{compile_clip, ClipContext};

/// Create the layer at its document priority and compile its clips in
/// order.
pub fn compile_layer<B: EditingBackend>(
    backend: &mut B,
    spec: &LayerSpec,
    ctx: &ClipContext<'_>,
) -> ClipforgeResult<B::Layer> {
    let layer = backend.append_layer(spec.priority, spec.auto_transition)?;
    for clip in &spec.clips {
        compile_clip(backend, &layer, clip, ctx)?;
    }
    tracing::debug!(
        layer = spec.priority,
        clips = spec.clips.len(),
        "Layer compiled"
    );
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_composition::{ClipSpec, PathResolver, SourceKind};
    use clipforge_timeline::{AssetCatalog, AssetInfo, MemoryTimeline};

    fn clip(src: &str, start: u64) -> ClipSpec {
        ClipSpec {
            source: SourceKind::SingleFile { src: src.into() },
            start,
            inpoint: 0,
            duration: 1,
            volume: None,
            x: None,
            y: None,
            alpha: None,
            size: None,
            effect: None,
        }
    }

    #[test]
    fn test_clips_compiled_in_order_onto_layer() {
        let resolver = PathResolver::new("/p", "data");
        let ctx = ClipContext {
            resolver: &resolver,
            absolute_paths: false,
        };
        let mut tl = MemoryTimeline::new_audio_video(
            AssetCatalog::new()
                .with("file:///p/data/a.png", AssetInfo::video(8, 8))
                .with("file:///p/data/b.png", AssetInfo::video(8, 8)),
        );
        let spec = LayerSpec {
            priority: 3,
            auto_transition: Some(true),
            clips: vec![clip("b.png", 0), clip("a.png", 1)],
        };
        compile_layer(&mut tl, &spec, &ctx).unwrap();

        assert_eq!(tl.layers()[0].priority, 3);
        assert!(tl.layers()[0].auto_transition);
        let ids: Vec<_> = tl.layer_clips(0).map(|c| c.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["file:///p/data/b.png", "file:///p/data/a.png"]);
    }

    #[test]
    fn test_unset_auto_transition_stays_off() {
        let resolver = PathResolver::new("/p", "data");
        let ctx = ClipContext {
            resolver: &resolver,
            absolute_paths: false,
        };
        let mut tl = MemoryTimeline::new_audio_video(AssetCatalog::new());
        let spec = LayerSpec {
            priority: 0,
            auto_transition: None,
            clips: Vec::new(),
        };
        compile_layer(&mut tl, &spec, &ctx).unwrap();
        assert!(!tl.layers()[0].auto_transition);
    }
}
